/// Unit tests for DiError and DiResult

use keyed_di::{DiError, DiResult, Lifetime};
use std::error::Error;

#[test]
fn test_error_display_not_registered() {
    let error = DiError::NotRegistered("TestService".to_string());
    assert_eq!(error.to_string(), "Service not registered: TestService");
}

#[test]
fn test_error_display_scoped_outside_scope() {
    let error = DiError::ScopedOutsideScope("RequestContext".to_string());
    let display_str = error.to_string();
    assert!(display_str.starts_with("Scoped service RequestContext"));
    assert!(display_str.contains("create a scope"));
}

#[test]
fn test_error_display_circular() {
    let path = vec!["ServiceA".to_string(), "ServiceB".to_string(), "ServiceA".to_string()];
    let error = DiError::Circular(path);
    assert_eq!(error.to_string(), "Circular dependency: ServiceA -> ServiceB -> ServiceA");
}

#[test]
fn test_error_display_registration_and_sealed() {
    assert_eq!(
        DiError::Registration("empty provides".to_string()).to_string(),
        "Invalid registration: empty provides"
    );
    assert_eq!(
        DiError::SealedCollection.to_string(),
        "Service collection is sealed and can no longer be modified"
    );
}

#[test]
fn test_error_display_unknown_lifetime() {
    let error = "Forever".parse::<Lifetime>().unwrap_err();
    assert_eq!(error, DiError::UnknownLifetime("Forever".to_string()));
    assert_eq!(error.to_string(), "Unknown lifetime: Forever");
}

#[test]
fn test_error_display_options_validation() {
    let error = DiError::OptionsValidation {
        options: "ServerOptions".to_string(),
        message: "port must be set".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "Options ServerOptions failed validation: port must be set"
    );
}

#[test]
fn test_error_display_misc() {
    assert_eq!(DiError::DepthExceeded(1024).to_string(), "Max depth 1024 exceeded");
    assert_eq!(
        DiError::TypeMismatch("u32".to_string()).to_string(),
        "Type mismatch for: u32"
    );
    assert_eq!(
        DiError::UndeclaredDependency("config").to_string(),
        "Dependency 'config' is not declared in the service metadata"
    );
    assert_eq!(
        DiError::Configuration("missing key 'port'".to_string()).to_string(),
        "Configuration error: missing key 'port'"
    );
}

#[test]
fn test_error_is_std_error() {
    let error: Box<dyn Error + Send + Sync> = Box::new(DiError::SealedCollection);
    assert!(error.source().is_none());
}

#[test]
fn test_di_result_propagates_with_question_mark() {
    fn inner() -> DiResult<u32> {
        Err(DiError::NotRegistered("Inner".to_string()))
    }

    fn outer() -> DiResult<u32> {
        let value = inner()?;
        Ok(value + 1)
    }

    assert_eq!(outer(), Err(DiError::NotRegistered("Inner".to_string())));
}
