#![no_main]

use keyed_di::{DiError, Lifetime, Resolver, ServiceCollection, ServiceDescriptor, ServiceKey};
use libfuzzer_sys::fuzz_target;

const NODES: usize = 8;

fn node(i: usize) -> ServiceKey {
    ServiceKey::named(format!("node-{}", i))
}

// Each byte pair describes one node: its lifetime and which other nodes it
// depends on. Cycles and scoped dependencies of singletons are expected and
// must surface as errors.
fuzz_target!(|data: &[u8]| {
    let mut services = ServiceCollection::new();

    for (i, pair) in data.chunks_exact(2).take(NODES).enumerate() {
        let lifetime = match pair[0] % 3 {
            0 => Lifetime::Singleton,
            1 => Lifetime::Scoped,
            _ => Lifetime::Transient,
        };
        let edges: Vec<ServiceKey> = (0..NODES).filter(|j| pair[1] & (1u8 << *j) != 0).map(node).collect();

        let descriptor = ServiceDescriptor::from_factory(node(i), lifetime, move |r| {
            let mut total = i as u64;
            for edge in &edges {
                total += *r.get_by_key::<u64>(edge)?;
            }
            Ok(total)
        });
        if let Ok(descriptor) = descriptor {
            let _ = services.add(descriptor);
        }
    }

    let provider = services.build();
    let scope = provider.create_scope();

    for i in 0..NODES {
        for result in [provider.get_by_key::<u64>(&node(i)), scope.get_by_key::<u64>(&node(i))] {
            match result {
                Ok(_)
                | Err(DiError::Circular(_))
                | Err(DiError::NotRegistered(_))
                | Err(DiError::ScopedOutsideScope(_)) => {}
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
    }
});
