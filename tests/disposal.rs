use async_trait::async_trait;
use keyed_di::{AsyncDispose, Dispose, Resolver, ServiceCollection};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

struct Tracked {
    name: &'static str,
    log: Log,
}

impl Dispose for Tracked {
    fn dispose(&self) {
        self.log.lock().unwrap().push(format!("sync:{}", self.name));
    }
}

#[async_trait]
impl AsyncDispose for Tracked {
    async fn dispose(&self) {
        tokio::task::yield_now().await;
        self.log.lock().unwrap().push(format!("async:{}", self.name));
    }
}

struct First;
struct Second;
struct Third;

#[test]
fn test_sync_disposal_lifo_order() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut sc = ServiceCollection::new();
    let l = log.clone();
    sc.add_singleton_factory::<First, _>(move |r| {
        r.register_disposer(Arc::new(Tracked { name: "first", log: l.clone() }));
        First
    })
    .unwrap();
    let l = log.clone();
    sc.add_singleton_factory::<Second, _>(move |r| {
        r.register_disposer(Arc::new(Tracked { name: "second", log: l.clone() }));
        Second
    })
    .unwrap();
    let l = log.clone();
    sc.add_singleton_factory::<Third, _>(move |r| {
        r.register_disposer(Arc::new(Tracked { name: "third", log: l.clone() }));
        Third
    })
    .unwrap();

    let sp = sc.build();
    sp.get_required::<First>();
    sp.get_required::<Second>();
    sp.get_required::<Third>();

    sp.dispose();
    assert_eq!(*log.lock().unwrap(), ["sync:third", "sync:second", "sync:first"]);

    // Hooks run once
    sp.dispose();
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[test]
fn test_provider_dispose_clears_singletons() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<First, _>(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        First
    })
    .unwrap();

    let sp = sc.build();
    let before = sp.get_required::<First>();
    sp.dispose();
    let after = sp.get_required::<First>();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_async_hooks_run_before_sync_hooks() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut sc = ServiceCollection::new();
    let l = log.clone();
    sc.add_singleton_factory::<First, _>(move |r| {
        let tracked = Arc::new(Tracked { name: "first", log: l.clone() });
        r.register_disposer(tracked.clone());
        r.register_async_disposer(tracked);
        First
    })
    .unwrap();
    let l = log.clone();
    sc.add_singleton_factory::<Second, _>(move |r| {
        r.register_async_disposer(Arc::new(Tracked { name: "second", log: l.clone() }));
        Second
    })
    .unwrap();

    let sp = sc.build();
    sp.get_required::<First>();
    sp.get_required::<Second>();
    sp.dispose_all().await;

    assert_eq!(*log.lock().unwrap(), ["async:second", "async:first", "sync:first"]);
}

#[test]
fn test_scope_drop_runs_scoped_hooks() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut sc = ServiceCollection::new();
    let l = log.clone();
    sc.add_scoped_factory::<First, _>(move |r| {
        r.register_disposer(Arc::new(Tracked { name: "scoped", log: l.clone() }));
        First
    })
    .unwrap();
    let l = log.clone();
    sc.add_singleton_factory::<Second, _>(move |r| {
        r.register_disposer(Arc::new(Tracked { name: "singleton", log: l.clone() }));
        Second
    })
    .unwrap();

    let sp = sc.build();
    {
        let scope = sp.create_scope();
        scope.get_required::<First>();
        scope.get_required::<Second>();
    }

    // Singleton hooks belong to the root and outlive the scope
    assert_eq!(*log.lock().unwrap(), ["sync:scoped"]);

    sp.dispose();
    assert_eq!(*log.lock().unwrap(), ["sync:scoped", "sync:singleton"]);
}

#[test]
fn test_each_scope_disposes_its_own_instances() {
    let disposed = Arc::new(AtomicUsize::new(0));

    struct Connection(Arc<AtomicUsize>);
    impl Dispose for Connection {
        fn dispose(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let mut sc = ServiceCollection::new();
    let counter = disposed.clone();
    sc.add_scoped_factory::<First, _>(move |r| {
        r.register_disposer(Arc::new(Connection(counter.clone())));
        First
    })
    .unwrap();

    let sp = sc.build();
    let scope_a = sp.create_scope();
    let scope_b = sp.create_scope();
    scope_a.get_required::<First>();
    scope_a.get_required::<First>();
    scope_b.get_required::<First>();

    scope_a.dispose();
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
    drop(scope_b);
    assert_eq!(disposed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_scope_dispose_all() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    let mut sc = ServiceCollection::new();
    let l = log.clone();
    sc.add_scoped_factory::<First, _>(move |r| {
        let tracked = Arc::new(Tracked { name: "request", log: l.clone() });
        r.register_disposer(tracked.clone());
        r.register_async_disposer(tracked);
        First
    })
    .unwrap();

    let sp = sc.build();
    let scope = sp.create_scope();
    let before = scope.get_required::<First>();
    scope.dispose_all().await;
    assert_eq!(*log.lock().unwrap(), ["async:request", "sync:request"]);

    // The scoped cache was cleared
    let after = scope.get_required::<First>();
    assert!(!Arc::ptr_eq(&before, &after));
}
