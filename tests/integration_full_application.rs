/// Full application integration test
///
/// Wires a small order service the way an application would: configuration
/// and options, metadata-driven services, a validator collection, scoped
/// units of work and disposal on shutdown.

use keyed_di::{
    Configuration, Dependencies, DiResult, Dispose, Injectable, JsonSource, Lifetime, Options, Resolver,
    ServiceCollection, ServiceKey, ServiceMetadata, ServiceModule,
};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

// ===== Domain =====

#[derive(Debug, Clone)]
struct Order {
    id: u64,
    quantity: u32,
}

#[derive(Debug, Default, Deserialize)]
struct OrderOptions {
    #[serde(default)]
    max_quantity: u32,
    #[serde(default)]
    currency: String,
}

trait OrderRule: Send + Sync {
    fn check(&self, order: &Order) -> Result<(), String>;
}

struct PositiveQuantity;

impl OrderRule for PositiveQuantity {
    fn check(&self, order: &Order) -> Result<(), String> {
        if order.quantity == 0 {
            Err(format!("order {} has no items", order.id))
        } else {
            Ok(())
        }
    }
}

impl Injectable for PositiveQuantity {
    fn metadata() -> ServiceMetadata {
        ServiceMetadata::builder::<Self>()
            .provides::<dyn OrderRule>(|this| this as Arc<dyn OrderRule>)
            .build()
    }

    fn construct(_deps: Dependencies) -> DiResult<Self> {
        Ok(PositiveQuantity)
    }
}

struct QuantityLimit {
    max: u32,
}

impl OrderRule for QuantityLimit {
    fn check(&self, order: &Order) -> Result<(), String> {
        if order.quantity > self.max {
            Err(format!("order {} exceeds {} items", order.id, self.max))
        } else {
            Ok(())
        }
    }
}

impl Injectable for QuantityLimit {
    fn metadata() -> ServiceMetadata {
        ServiceMetadata::builder::<Self>()
            .provides::<dyn OrderRule>(|this| this as Arc<dyn OrderRule>)
            .inject::<Options<OrderOptions>>("options")
            .build()
    }

    fn construct(deps: Dependencies) -> DiResult<Self> {
        let options = deps.get::<Options<OrderOptions>>("options")?;
        Ok(QuantityLimit { max: options.max_quantity })
    }
}

/// Storage shared by the whole application.
struct Database {
    saved: Mutex<Vec<Order>>,
}

/// Closes the connection pool when the provider is disposed.
struct PoolGuard(Arc<AtomicBool>);

impl Dispose for PoolGuard {
    fn dispose(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Per-request unit of work.
struct UnitOfWork {
    db: Arc<Database>,
    pending: Mutex<Vec<Order>>,
}

impl UnitOfWork {
    fn commit(&self) -> usize {
        let mut pending = self.pending.lock().unwrap();
        let count = pending.len();
        self.db.saved.lock().unwrap().append(&mut pending);
        count
    }
}

struct OrderService {
    rules: Vec<Arc<dyn OrderRule>>,
    work: Arc<UnitOfWork>,
    ids: Arc<AtomicU64>,
}

impl OrderService {
    fn place(&self, quantity: u32) -> Result<u64, String> {
        let order = Order {
            id: self.ids.fetch_add(1, Ordering::SeqCst),
            quantity,
        };
        for rule in &self.rules {
            rule.check(&order)?;
        }
        let id = order.id;
        self.work.pending.lock().unwrap().push(order);
        Ok(id)
    }
}

impl Injectable for OrderService {
    fn metadata() -> ServiceMetadata {
        ServiceMetadata::builder::<Self>()
            .provides_self()
            .inject_all::<dyn OrderRule>("rules")
            .inject::<UnitOfWork>("work")
            .inject_key("ids", ServiceKey::named("order-ids"))
            .lifetime(Lifetime::Scoped)
            .build()
    }

    fn construct(deps: Dependencies) -> DiResult<Self> {
        Ok(OrderService {
            rules: deps.all_trait("rules")?,
            work: deps.get("work")?,
            ids: deps.get("ids")?,
        })
    }
}

// ===== Wiring =====

struct OrdersModule {
    closed: Arc<AtomicBool>,
}

impl ServiceModule for OrdersModule {
    fn register_services(self, services: &mut ServiceCollection) -> DiResult<()> {
        let rule = ServiceKey::of::<dyn OrderRule>();
        let closed = self.closed;

        services.add_options::<OrderOptions>().bind("orders").register()?;
        services.add_singleton_factory::<Database, _>(move |r| {
            r.register_disposer(Arc::new(PoolGuard(closed.clone())));
            Database {
                saved: Mutex::new(Vec::new()),
            }
        })?;
        services.add_named_singleton("order-ids", AtomicU64::new(1))?;
        services.add_scoped_factory::<UnitOfWork, _>(|r| UnitOfWork {
            db: r.get_required::<Database>(),
            pending: Mutex::new(Vec::new()),
        })?;
        services.add_implementation::<PositiveQuantity>(&rule, Lifetime::Singleton)?;
        services.add_implementation::<QuantityLimit>(&rule, Lifetime::Singleton)?;
        services.add_provides::<OrderService>()?;
        Ok(())
    }
}

const SETTINGS: &str = r#"{ "Orders": { "Max_Quantity": 10, "Currency": "EUR" } }"#;

fn build_services(closed: Arc<AtomicBool>) -> ServiceCollection {
    let configuration = Configuration::builder()
        .add_source(JsonSource::new(SETTINGS))
        .build()
        .unwrap();

    let mut services = ServiceCollection::new();
    services.add_singleton(configuration).unwrap();
    services.add_module(OrdersModule { closed }).unwrap();
    services
}

#[test]
fn test_order_flow_across_requests() {
    let closed = Arc::new(AtomicBool::new(false));
    let provider = build_services(closed.clone()).build();

    // First request
    {
        let scope = provider.create_scope();
        let orders = scope.get_required::<OrderService>();
        assert_eq!(orders.place(3), Ok(1));
        assert_eq!(orders.place(0), Err("order 2 has no items".to_string()));
        assert!(orders.place(11).unwrap_err().contains("exceeds"));
        assert_eq!(orders.place(10), Ok(4));
        assert_eq!(scope.get_required::<UnitOfWork>().commit(), 2);
    }

    // Second request gets a fresh unit of work but the same database
    let scope = provider.create_scope();
    let work = scope.get_required::<UnitOfWork>();
    assert!(work.pending.lock().unwrap().is_empty());
    assert_eq!(work.db.saved.lock().unwrap().len(), 2);
    drop(work);
    drop(scope);

    provider.dispose();
    assert!(closed.load(Ordering::SeqCst));
}

#[test]
fn test_options_keys_are_case_insensitive() {
    let provider = build_services(Arc::new(AtomicBool::new(false))).build();
    let options = provider.get_required::<Options<OrderOptions>>();

    assert_eq!(options.max_quantity, 10);
    assert_eq!(options.currency, "EUR");
}

#[test]
fn test_rules_are_resolvable_as_a_collection() {
    let provider = build_services(Arc::new(AtomicBool::new(false))).build();
    let rules = provider.get_all_trait::<dyn OrderRule>().unwrap();
    assert_eq!(rules.len(), 2);

    let again = provider.get_all_trait::<dyn OrderRule>().unwrap();
    assert!(Arc::ptr_eq(&rules[0], &again[0]));
}
