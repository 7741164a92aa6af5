use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use parallel_get::{BodySource, Dispatcher, RequestError, RequestSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

const BATCH_SIZES: &[usize] = &[1, 10, 100, 1000];

// Answers without touching the network, after a short simulated latency
struct MockSource {
    latency: Duration,
}

#[async_trait]
impl BodySource for MockSource {
    async fn fetch_text(&self, url: &str) -> Result<String, RequestError> {
        tokio::time::sleep(self.latency).await;
        Ok(url.to_string())
    }
}

fn urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://test{i}.example.com")).collect()
}

fn bench_dispatch(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("dispatch");

    group
        .sample_size(20)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(2));

    for &size in BATCH_SIZES {
        let specs = RequestSet::build(urls(size)).unwrap();
        let source = Arc::new(MockSource {
            latency: Duration::from_millis(5),
        });

        group.bench_with_input(BenchmarkId::new("batch", size), &specs, |b, specs| {
            b.to_async(&rt).iter(|| async {
                let bodies = Dispatcher::dispatch_with(Arc::clone(&source), specs)
                    .await
                    .unwrap();
                black_box(bodies)
            });
        });
    }

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let input: Vec<String> = urls(1000).into_iter().cycle().take(3000).collect();

    c.bench_function("request_set_build_with_duplicates", |b| {
        b.iter(|| RequestSet::build(black_box(input.iter().cloned())).unwrap())
    });
}

criterion_group!(benches, bench_dispatch, bench_build);
criterion_main!(benches);
