//! Order book hot-path benchmarks
//!
//! Measures submit throughput for resting inserts and for taker orders
//! sweeping a populated book.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use ferrox_matching::{Order, OrderBook, OrderRequest};
use ferrox_sdk::{Price, Side};

fn populated_book(levels: u64, orders_per_level: u64) -> (OrderBook, u64) {
	let mut book = OrderBook::new("BENCH".to_string());
	let mut next_id = 1;
	for level in 0..levels {
		let price = Price::from_units(100 + level);
		for _ in 0..orders_per_level {
			let order = Order::from_request(
				OrderRequest::limit("bench", "BENCH", Side::Sell, price, 10),
				next_id,
				next_id,
			);
			book.submit(order, next_id);
			next_id += 1;
		}
	}
	(book, next_id)
}

fn bench_rest_orders(c: &mut Criterion) {
	c.bench_function("rest_1000_orders", |b| {
		b.iter(|| {
			let (book, _) = populated_book(10, 100);
			black_box(book.order_count())
		})
	});
}

fn bench_sweep_top_levels(c: &mut Criterion) {
	c.bench_function("sweep_5_levels", |b| {
		b.iter_batched(
			|| populated_book(10, 10),
			|(mut book, next_id)| {
				let taker = Order::from_request(
					OrderRequest::limit("bench", "BENCH", Side::Buy, Price::from_units(104), 500),
					next_id,
					next_id,
				);
				black_box(book.submit(taker, next_id));
			},
			BatchSize::SmallInput,
		)
	});
}

fn bench_cancel(c: &mut Criterion) {
	c.bench_function("cancel_from_1000", |b| {
		b.iter_batched(
			|| populated_book(10, 100),
			|(mut book, _)| {
				black_box(book.cancel(500));
			},
			BatchSize::SmallInput,
		)
	});
}

criterion_group!(benches, bench_rest_orders, bench_sweep_top_levels, bench_cancel);
criterion_main!(benches);
