use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use shanraq_auth::auth::{Identity, ProviderRegistry};
use shanraq_auth::session::SessionManager;
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

fn identity() -> Identity {
    Identity {
        subject: "bench-user".into(),
        email: "bench@example.com".into(),
        provider: "demo".into(),
        ..Default::default()
    }
}

fn benchmark_session_operations(c: &mut Criterion) {
    c.bench_function("session_create", |b| {
        let manager = SessionManager::default();
        b.iter(|| {
            let created = manager.create(black_box(identity())).unwrap();
            black_box(created);
        });
    });

    c.bench_function("session_lookup", |b| {
        let manager = SessionManager::default();
        let (token, _) = manager.create(identity()).unwrap();
        b.iter(|| {
            let found = manager.identity(black_box(&token));
            black_box(found);
        });
    });

    c.bench_function("session_create_destroy", |b| {
        let manager = SessionManager::default();
        b.iter(|| {
            let (token, _) = manager.create(identity()).unwrap();
            black_box(manager.destroy(&token));
        });
    });

    c.bench_function("session_purge_10k_expired", |b| {
        b.iter_batched(
            || {
                let manager = SessionManager::new(Duration::from_nanos(1), "");
                for _ in 0..10_000 {
                    manager.create(identity()).unwrap();
                }
                manager
            },
            |manager| black_box(manager.purge_expired()),
            BatchSize::LargeInput,
        );
    });
}

fn benchmark_concurrent_lookups(c: &mut Criterion) {
    c.bench_function("concurrent_session_lookup", |b| {
        let manager = Arc::new(SessionManager::default());
        let tokens: Vec<String> = (0..64)
            .map(|_| manager.create(identity()).unwrap().0)
            .collect();
        let tokens = Arc::new(tokens);

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let manager = manager.clone();
                    let tokens = tokens.clone();
                    std::thread::spawn(move || {
                        for token in tokens.iter().skip(t).step_by(4) {
                            black_box(manager.identity(token));
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    });
}

fn benchmark_registry(c: &mut Criterion) {
    c.bench_function("registry_get", |b| {
        let registry = ProviderRegistry::with_placeholders(["google", "facebook", "demo"]);
        b.iter(|| {
            let provider = registry.get(black_box(" Google "));
            black_box(provider.is_ok());
        });
    });
}

criterion_group!(
    benches,
    benchmark_session_operations,
    benchmark_concurrent_lookups,
    benchmark_registry
);
criterion_main!(benches);
