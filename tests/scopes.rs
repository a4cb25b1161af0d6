use keyed_di::{
    Dependencies, DiError, DiResult, Injectable, Lifetime, Resolver, ServiceCollection, ServiceMetadata,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_scoped_lifetime() {
    #[derive(Debug)]
    struct RequestContext {
        id: String,
    }

    let counter = Arc::new(AtomicUsize::new(0));
    let next = counter.clone();

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<RequestContext, _>(move |_| RequestContext {
        id: format!("req-{}", next.fetch_add(1, Ordering::SeqCst) + 1),
    })
    .unwrap();

    let sp = sc.build();

    let scope1 = sp.create_scope();
    let scope2 = sp.create_scope();

    let ctx1a = scope1.get_required::<RequestContext>();
    let ctx1b = scope1.get_required::<RequestContext>();
    let ctx2a = scope2.get_required::<RequestContext>();
    let ctx2b = scope2.get_required::<RequestContext>();

    assert!(Arc::ptr_eq(&ctx1a, &ctx1b));
    assert!(Arc::ptr_eq(&ctx2a, &ctx2b));
    assert!(!Arc::ptr_eq(&ctx1a, &ctx2a));

    assert_eq!(ctx1a.id, "req-1");
    assert_eq!(ctx2a.id, "req-2");
}

#[test]
fn test_cannot_resolve_scoped_from_root() {
    struct ScopedService;

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<ScopedService, _>(|_| ScopedService).unwrap();

    let sp = sc.build();

    match sp.get::<ScopedService>() {
        Err(DiError::ScopedOutsideScope(name)) => assert!(name.ends_with("ScopedService")),
        _ => panic!("expected ScopedOutsideScope"),
    }
    // Still registered, just not resolvable here
    assert!(sp.has::<ScopedService>());
}

#[test]
fn test_scoped_dependency_of_transient_from_root_fails() {
    struct Session;
    struct Handler;

    impl Injectable for Handler {
        fn metadata() -> ServiceMetadata {
            ServiceMetadata::builder::<Self>()
                .provides_self()
                .inject::<Session>("session")
                .build()
        }

        fn construct(_deps: Dependencies) -> DiResult<Self> {
            Ok(Handler)
        }
    }

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Session, _>(|_| Session).unwrap();
    sc.add_provides::<Handler>().unwrap();

    let sp = sc.build();
    assert!(matches!(sp.get::<Handler>(), Err(DiError::ScopedOutsideScope(_))));
    assert!(sp.create_scope().get::<Handler>().is_ok());
}

struct UnitOfWork {
    id: usize,
}

struct Repository {
    work: Arc<UnitOfWork>,
}

impl Injectable for Repository {
    fn metadata() -> ServiceMetadata {
        ServiceMetadata::builder::<Self>()
            .provides_self()
            .inject::<UnitOfWork>("work")
            .lifetime(Lifetime::Transient)
            .build()
    }

    fn construct(deps: Dependencies) -> DiResult<Self> {
        Ok(Repository { work: deps.get("work")? })
    }
}

struct Service {
    left: Arc<Repository>,
    right: Arc<Repository>,
}

impl Injectable for Service {
    fn metadata() -> ServiceMetadata {
        ServiceMetadata::builder::<Self>()
            .provides_self()
            .inject::<Repository>("left")
            .inject::<Repository>("right")
            .lifetime(Lifetime::Scoped)
            .build()
    }

    fn construct(deps: Dependencies) -> DiResult<Self> {
        Ok(Service {
            left: deps.get("left")?,
            right: deps.get("right")?,
        })
    }
}

#[test]
fn test_nested_scoped_dependencies_share_the_scope() {
    let ids = Arc::new(AtomicUsize::new(0));
    let next = ids.clone();

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<UnitOfWork, _>(move |_| UnitOfWork {
        id: next.fetch_add(1, Ordering::SeqCst),
    })
    .unwrap();
    sc.add_provides::<Repository>().unwrap();
    sc.add_provides::<Service>().unwrap();

    let sp = sc.build();
    let scope_a = sp.create_scope();
    let scope_b = sp.create_scope();

    let service = scope_a.get_required::<Service>();
    assert!(!Arc::ptr_eq(&service.left, &service.right));
    assert!(Arc::ptr_eq(&service.left.work, &service.right.work));
    assert!(Arc::ptr_eq(&service, &scope_a.get_required::<Service>()));

    let other = scope_b.get_required::<Service>();
    assert_ne!(service.left.work.id, other.left.work.id);
}

#[test]
fn test_singleton_dependencies_come_from_root() {
    struct Pool;
    struct Cache {
        pool: Arc<Pool>,
    }

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Pool, _>(|_| Pool).unwrap();
    sc.add_scoped_factory::<Cache, _>(|r| Cache { pool: r.get_required::<Pool>() }).unwrap();

    let sp = sc.build();
    let root_pool = sp.get_required::<Pool>();
    let a = sp.create_scope().get_required::<Cache>();
    let b = sp.create_scope().get_required::<Cache>();

    assert!(Arc::ptr_eq(&a.pool, &root_pool));
    assert!(Arc::ptr_eq(&b.pool, &root_pool));
}

#[test]
fn test_singleton_cannot_capture_scoped_dependency() {
    struct Request;
    struct Registry;

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Request, _>(|_| Request).unwrap();
    sc.add_try_factory::<Registry, _>(Lifetime::Singleton, |r| {
        r.get::<Request>()?;
        Ok(Registry)
    })
    .unwrap();

    let sp = sc.build();
    let scope = sp.create_scope();
    assert!(matches!(scope.get::<Registry>(), Err(DiError::ScopedOutsideScope(_))));
}

#[test]
fn test_scope_has_matches_provider() {
    let mut sc = ServiceCollection::new();
    sc.add_singleton(5u8).unwrap();
    let sp = sc.build();
    let scope = sp.create_scope();

    assert_eq!(scope.has::<u8>(), sp.has::<u8>());
    assert_eq!(scope.has::<u16>(), sp.has::<u16>());
}
