use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;

use catalog::{parse_price, parse_stock_quantity};

fn bench_stock_from_field(c: &mut Criterion) {
    let body = json!({ "success": "true", "name": "Netflix", "stock": "1,200" });
    c.bench_function("parse/stock_from_field", |b| {
        b.iter(|| parse_stock_quantity(&body))
    });
}

fn bench_stock_from_message(c: &mut Criterion) {
    let body = json!({ "success": "true", "name": "Netflix", "message": "Stock: 7 remaining" });
    c.bench_function("parse/stock_from_message", |b| {
        b.iter(|| parse_stock_quantity(&body))
    });
}

fn bench_price(c: &mut Criterion) {
    let body = json!({ "price": "1.234,5" });
    c.bench_function("parse/price_localized", |b| b.iter(|| parse_price(&body)));
}

criterion_group!(
    benches,
    bench_stock_from_field,
    bench_stock_from_message,
    bench_price
);
criterion_main!(benches);
