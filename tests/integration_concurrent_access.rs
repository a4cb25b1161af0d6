/// Concurrent access integration tests
///
/// Singletons must be shared across threads, scopes must stay isolated, and
/// circular-dependency tracking must not leak between threads.

use keyed_di::{DiResult, Dispose, Lifetime, Resolver, ServiceCollection};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[derive(Debug)]
struct CounterService {
    count: AtomicU32,
}

impl CounterService {
    fn new() -> Self {
        Self { count: AtomicU32::new(0) }
    }

    fn increment(&self) -> u32 {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[test]
fn test_singleton_shared_across_threads() {
    const THREADS: usize = 8;

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<CounterService, _>(|_| CounterService::new()).unwrap();
    let provider = sc.build();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let provider = provider.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let counter = provider.get_required::<CounterService>();
                counter.increment();
                counter
            })
        })
        .collect();

    let counters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for counter in &counters[1..] {
        assert!(Arc::ptr_eq(&counters[0], counter));
    }
    assert_eq!(counters[0].count.load(Ordering::SeqCst), THREADS as u32);
}

struct ConnectionPool;

struct PoolCloser(Arc<AtomicU32>);

impl Dispose for PoolCloser {
    fn dispose(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_racing_threads_build_a_singleton_once() {
    let constructions = Arc::new(AtomicU32::new(0));
    let closes = Arc::new(AtomicU32::new(0));

    let mut sc = ServiceCollection::new();
    let built = constructions.clone();
    let closed = closes.clone();
    sc.add_singleton_factory::<ConnectionPool, _>(move |r| {
        built.fetch_add(1, Ordering::SeqCst);
        r.register_disposer(Arc::new(PoolCloser(closed.clone())));
        // Keep the factory running while the other thread arrives
        thread::sleep(Duration::from_millis(50));
        ConnectionPool
    })
    .unwrap();
    let provider = sc.build();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let provider = provider.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                provider.get_required::<ConnectionPool>()
            })
        })
        .collect();
    let pools: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(Arc::ptr_eq(&pools[0], &pools[1]));
    assert_eq!(constructions.load(Ordering::SeqCst), 1);

    provider.dispose();
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_scoped_instance_built_once_per_shared_scope() {
    struct Session;

    let constructions = Arc::new(AtomicU32::new(0));
    let built = constructions.clone();
    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<Session, _>(move |_| {
        built.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        Session
    })
    .unwrap();
    let provider = sc.build();
    let scope = provider.create_scope();

    let barrier = Barrier::new(4);
    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                barrier.wait();
                scope.get_required::<Session>();
            });
        }
    });

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
}

#[test]
fn test_scopes_on_scoped_threads() {
    struct RequestState {
        hits: AtomicU32,
    }

    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<RequestState, _>(|_| RequestState { hits: AtomicU32::new(0) }).unwrap();
    let provider = sc.build();

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|_| {
                let scope = provider.create_scope();
                for _ in 0..10 {
                    scope.get_required::<RequestState>().hits.fetch_add(1, Ordering::SeqCst);
                }
                assert_eq!(scope.get_required::<RequestState>().hits.load(Ordering::SeqCst), 10);
            });
        }
    })
    .unwrap();
}

#[test]
fn test_one_scope_shared_by_threads() {
    let mut sc = ServiceCollection::new();
    sc.add_scoped_factory::<CounterService, _>(|_| CounterService::new()).unwrap();
    let provider = sc.build();
    let scope = provider.create_scope();

    crossbeam_utils::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|_| {
                for _ in 0..25 {
                    scope.get_required::<CounterService>().increment();
                }
            });
        }
    })
    .unwrap();

    assert_eq!(scope.get_required::<CounterService>().count.load(Ordering::SeqCst), 100);
}

#[test]
fn test_nested_resolution_on_many_threads_is_not_circular() {
    struct Leaf;
    struct Branch;

    let mut sc = ServiceCollection::new();
    sc.add_singleton_factory::<Leaf, _>(|_| {
        thread::yield_now();
        Leaf
    })
    .unwrap();
    sc.add_try_factory::<Branch, _>(Lifetime::Transient, |r| -> DiResult<Branch> {
        r.get::<Leaf>()?;
        Ok(Branch)
    })
    .unwrap();
    let provider = sc.build();

    let barrier = Barrier::new(8);
    crossbeam_utils::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|_| {
                barrier.wait();
                for _ in 0..50 {
                    assert!(provider.get::<Branch>().is_ok());
                }
            });
        }
    })
    .unwrap();
}
