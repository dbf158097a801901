use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use supplier::{
    CallExecutor, CallOptions, MemoryCache, ScriptedSupplier, SupplierMethod, params,
};

fn bench_cache_set_get(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = MemoryCache::new();

    c.bench_function("cache/set_then_get", |b| {
        b.iter(|| {
            rt.block_on(async {
                cache
                    .set(
                        "getStock:{\"kioskToken\":\"K1\"}",
                        json!({ "stock": 3 }),
                        Duration::from_secs(60),
                    )
                    .await;
                cache.get("getStock:{\"kioskToken\":\"K1\"}").await.unwrap();
            });
        });
    });
}

fn bench_cache_miss(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache: MemoryCache<serde_json::Value> = MemoryCache::new();

    c.bench_function("cache/miss", |b| {
        b.iter(|| rt.block_on(async { cache.get("absent").await }));
    });
}

fn bench_executor_cache_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let supplier = ScriptedSupplier::new();
    rt.block_on(supplier.set_default_ok(SupplierMethod::GetStock, json!({ "stock": 3 })));
    let executor = CallExecutor::new(supplier);
    let call_params = params([("kioskToken", json!("K1"))]);

    rt.block_on(async {
        executor
            .execute(SupplierMethod::GetStock, call_params.clone(), CallOptions::new())
            .await
            .unwrap();
    });

    c.bench_function("executor/cache_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                executor
                    .execute(SupplierMethod::GetStock, call_params.clone(), CallOptions::new())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_cache_key(c: &mut Criterion) {
    let call_params = params([
        ("kioskToken", json!("K1")),
        ("forceRefresh", json!(false)),
        ("includePrice", json!(true)),
        ("debugMock", json!(true)),
    ]);

    c.bench_function("executor/cache_key", |b| {
        b.iter(|| {
            CallExecutor::<ScriptedSupplier>::cache_key(
                SupplierMethod::GetStockWithCache,
                &call_params,
            )
        });
    });
}

criterion_group!(
    benches,
    bench_cache_set_get,
    bench_cache_miss,
    bench_executor_cache_hit,
    bench_cache_key
);
criterion_main!(benches);
