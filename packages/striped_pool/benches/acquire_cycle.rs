#![expect(missing_docs, reason = "benchmarks")]

use std::hint::black_box;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use spin_on::spin_on;
use striped_pool::{ResourceManager, StripedPool};

struct Nothing;

impl ResourceManager for Nothing {
    type Resource = u64;
    type Error = std::convert::Infallible;

    fn create(&self) -> Result<u64, Self::Error> {
        Ok(0)
    }

    fn destroy(&self, _resource: u64) -> Result<(), Self::Error> {
        Ok(())
    }
}

fn entrypoint(c: &mut Criterion) {
    let mut g = c.benchmark_group("acquire_cycle");

    let pool = StripedPool::builder(Nothing)
        .max_resources(64)
        .stripes(1)
        .idle_timeout(Duration::from_secs(600))
        .build()
        .unwrap();

    // Warm the cache so the cycles below never hit `create`.
    let (resource, stripe) = spin_on(pool.acquire()).unwrap();
    stripe.put(resource);

    g.bench_function("acquire_put_cached", |b| {
        b.iter(|| {
            let (resource, stripe) = spin_on(pool.acquire()).unwrap();
            stripe.put(black_box(resource));
        });
    });

    g.bench_function("try_acquire_put_cached", |b| {
        b.iter(|| {
            let (resource, stripe) = pool.try_acquire().unwrap().unwrap();
            stripe.put(black_box(resource));
        });
    });

    g.finish();
}

criterion_group!(benches, entrypoint);
criterion_main!(benches);
