//! Benchmarks for order book view operations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use std::str::FromStr;
use swapstream_core::orderbook::OrderBookView;
use swapstream_core::parser::{DepthFrame, RawLevel};

fn create_frame(levels: usize) -> DepthFrame {
    let bids: Vec<RawLevel> = (0..levels)
        .map(|i| RawLevel {
            price: Decimal::from(50000 - i as i64),
            size: Decimal::from_str("1.5").unwrap(),
        })
        .collect();

    let asks: Vec<RawLevel> = (0..levels)
        .map(|i| RawLevel {
            price: Decimal::from(50001 + i as i64),
            size: Decimal::from_str("1.5").unwrap(),
        })
        .collect();

    DepthFrame {
        event_type: "depthUpdate".to_string(),
        event_time: 1672531200000,
        symbol: "BTCUSDT".to_string(),
        bids,
        asks,
    }
}

fn benchmark_update(c: &mut Criterion) {
    let view = OrderBookView::new(5);
    let frame = create_frame(100);

    c.bench_function("update_100_levels_top5", |b| {
        b.iter(|| {
            view.update(black_box(&frame));
        })
    });
}

fn benchmark_snapshot(c: &mut Criterion) {
    let view = OrderBookView::new(5);
    view.update(&create_frame(100));

    c.bench_function("snapshot_read", |b| {
        b.iter(|| {
            black_box(view.snapshot("BTCUSDT"));
        })
    });
}

criterion_group!(benches, benchmark_update, benchmark_snapshot);
criterion_main!(benches);
