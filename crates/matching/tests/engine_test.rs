//! Integration tests for the matching engine
//!
//! These drive the public engine API: admission, risk checks, matching
//! scenarios, cancel/modify, callbacks, statistics, and the asynchronous
//! command-queue path.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ferrox_matching::{
	EngineConfig, EngineError, ExecutionReport, MatchingEngine, MatchingMode, OrderRequest,
};
use ferrox_sdk::{OrderStatus, Price, Side, TimeInForce};

fn px(units: u64) -> Price {
	Price::from_units(units)
}

fn engine() -> MatchingEngine {
	MatchingEngine::start(EngineConfig::default()).expect("engine should start")
}

fn sell(symbol: &str, price: u64, quantity: u64) -> OrderRequest {
	OrderRequest::limit("SELLER", symbol, Side::Sell, px(price), quantity)
}

fn buy(symbol: &str, price: u64, quantity: u64) -> OrderRequest {
	OrderRequest::limit("BUYER", symbol, Side::Buy, px(price), quantity)
}

/// Poll until `predicate` holds or the timeout elapses.
fn wait_until(predicate: impl Fn() -> bool, timeout: Duration) -> bool {
	let deadline = Instant::now() + timeout;
	while Instant::now() < deadline {
		if predicate() {
			return true;
		}
		std::thread::sleep(Duration::from_millis(5));
	}
	predicate()
}

#[test]
fn test_simple_cross() {
	let engine = engine();

	let resting = engine.submit_order_sync(sell("AAPL", 100, 10)).unwrap();
	assert_eq!(resting.status, OrderStatus::New);
	let sell_id = resting.order_id;

	let taker = engine.submit_order_sync(buy("AAPL", 100, 8)).unwrap();
	assert_eq!(taker.status, OrderStatus::Filled);
	assert_eq!(taker.remaining, 0);
	assert_eq!(taker.last_price, Some(px(100)));
	assert_eq!(taker.last_quantity, Some(8));

	let maker = engine.find_order(sell_id).expect("maker still resting");
	assert_eq!(maker.status, OrderStatus::PartiallyFilled);
	assert_eq!(maker.remaining, 2);

	let md = engine.get_market_data("AAPL").unwrap();
	assert_eq!(md.best_ask, Some(px(100)));
	assert_eq!(md.ask_quantity, 2);
	assert_eq!(md.best_bid, None);
	assert_eq!(md.last_trade_price, Some(px(100)));
	assert_eq!(md.last_trade_quantity, 8);
}

#[test]
fn test_market_order_walks_the_book() {
	let engine = engine();
	let first = engine.submit_order_sync(sell("AAPL", 100, 5)).unwrap();
	let second = engine.submit_order_sync(sell("AAPL", 101, 10)).unwrap();

	let taker = engine
		.submit_order_sync(OrderRequest::market("BUYER", "AAPL", Side::Buy, 12))
		.unwrap();
	assert_eq!(taker.status, OrderStatus::Filled);
	// Final fill came from the 101 level
	assert_eq!(taker.last_price, Some(px(101)));
	assert_eq!(taker.last_quantity, Some(7));

	assert!(engine.find_order(first.order_id).is_none());
	let remaining = engine.find_order(second.order_id).unwrap();
	assert_eq!(remaining.status, OrderStatus::PartiallyFilled);
	assert_eq!(remaining.remaining, 3);
}

#[test]
fn test_market_order_with_insufficient_liquidity() {
	let engine = engine();
	engine.submit_order_sync(sell("AAPL", 100, 5)).unwrap();

	let taker = engine
		.submit_order_sync(OrderRequest::market("BUYER", "AAPL", Side::Buy, 20))
		.unwrap();
	assert_eq!(taker.status, OrderStatus::Rejected);
	assert_eq!(taker.remaining, 15);
	assert!(taker.reason.as_deref().unwrap().contains("liquidity"));
	// Not rested
	assert!(engine.find_order(taker.order_id).is_none());
	assert_eq!(engine.get_market_data("AAPL").unwrap().best_ask, None);
}

#[test]
fn test_fifo_within_price_level() {
	let engine = engine();
	let first = engine.submit_order_sync(sell("AAPL", 100, 5)).unwrap();
	let second = engine.submit_order_sync(sell("AAPL", 100, 5)).unwrap();

	let taker = engine.submit_order_sync(buy("AAPL", 100, 7)).unwrap();
	assert_eq!(taker.status, OrderStatus::Filled);

	assert!(engine.find_order(first.order_id).is_none());
	let survivor = engine.find_order(second.order_id).unwrap();
	assert_eq!(survivor.remaining, 3);
}

#[test]
fn test_reports_arrive_in_causal_order() {
	let engine = engine();
	let collected: Arc<Mutex<Vec<ExecutionReport>>> = Arc::new(Mutex::new(Vec::new()));
	let sink = collected.clone();
	engine.set_execution_callback(Arc::new(move |report| {
		sink.lock().unwrap().push(report);
	}));

	let maker = engine.submit_order_sync(sell("AAPL", 100, 5)).unwrap();
	let taker = engine.submit_order_sync(buy("AAPL", 100, 5)).unwrap();

	let reports = collected.lock().unwrap();
	// New (maker rested), then one fill report per side
	assert_eq!(reports.len(), 3);
	assert_eq!(reports[0].order_id, maker.order_id);
	assert_eq!(reports[0].status, OrderStatus::New);
	assert_eq!(reports[1].order_id, maker.order_id);
	assert_eq!(reports[1].status, OrderStatus::Filled);
	assert_eq!(reports[2].order_id, taker.order_id);
	assert_eq!(reports[2].status, OrderStatus::Filled);
	assert_eq!(reports[2].last_quantity, Some(5));
}

#[test]
fn test_risk_rejection_carries_id_and_reason() {
	let engine = engine();
	let report = engine
		.submit_order_sync(OrderRequest::limit("C", "AAPL", Side::Buy, px(100), 0))
		.unwrap();
	assert!(report.order_id > 0);
	assert_eq!(report.status, OrderStatus::Rejected);
	assert_eq!(report.reason.as_deref(), Some("zero quantity"));

	let report = engine
		.submit_order_sync(OrderRequest::limit("C", "AAPL", Side::Buy, px(20_000), 1))
		.unwrap();
	assert!(report.reason.as_deref().unwrap().contains("above limit"));

	// Nothing reached the book
	assert!(engine.get_market_data("AAPL").is_none() || {
		let md = engine.get_market_data("AAPL").unwrap();
		md.best_bid.is_none() && md.best_ask.is_none()
	});
}

#[test]
fn test_risk_check_can_be_disabled() {
	let config = EngineConfig {
		enable_risk_check: false,
		..EngineConfig::default()
	};
	let engine = MatchingEngine::start(config).unwrap();
	// Over the price limit, but limits are off; structure still applies
	let report = engine
		.submit_order_sync(OrderRequest::limit("C", "AAPL", Side::Buy, px(20_000), 1))
		.unwrap();
	assert_eq!(report.status, OrderStatus::New);

	let report = engine
		.submit_order_sync(OrderRequest::limit("C", "AAPL", Side::Buy, Price::ZERO, 1))
		.unwrap();
	assert_eq!(report.status, OrderStatus::Rejected);
}

#[test]
fn test_ioc_and_fok_via_engine() {
	let engine = engine();
	engine.submit_order_sync(sell("AAPL", 100, 5)).unwrap();

	let ioc = engine
		.submit_order_sync(buy("AAPL", 100, 8).with_time_in_force(TimeInForce::Ioc))
		.unwrap();
	assert_eq!(ioc.status, OrderStatus::Cancelled);
	assert_eq!(ioc.remaining, 3);

	engine.submit_order_sync(sell("AAPL", 100, 5)).unwrap();
	let fok = engine
		.submit_order_sync(buy("AAPL", 100, 8).with_time_in_force(TimeInForce::Fok))
		.unwrap();
	assert_eq!(fok.status, OrderStatus::Rejected);
	// The resting 5 were untouched
	assert_eq!(engine.get_market_data("AAPL").unwrap().ask_quantity, 5);
}

#[test]
fn test_cancel_unknown_order_rejects() {
	let engine = engine();
	let report = engine.cancel_order_sync(9_999, "client request").unwrap();
	assert_eq!(report.status, OrderStatus::Rejected);
	assert_eq!(report.reason.as_deref(), Some("order not found"));
}

#[test]
fn test_cancel_filled_order_rejects() {
	let engine = engine();
	let maker = engine.submit_order_sync(sell("AAPL", 100, 5)).unwrap();
	engine.submit_order_sync(buy("AAPL", 100, 5)).unwrap();

	let report = engine
		.cancel_order_sync(maker.order_id, "client request")
		.unwrap();
	assert_eq!(report.status, OrderStatus::Rejected);
	assert_eq!(report.reason.as_deref(), Some("order not found"));
}

#[test]
fn test_cancel_restores_book() {
	let engine = engine();
	let resting = engine.submit_order_sync(buy("AAPL", 99, 10)).unwrap();

	let report = engine
		.cancel_order_sync(resting.order_id, "client request")
		.unwrap();
	assert_eq!(report.status, OrderStatus::Cancelled);
	assert_eq!(report.remaining, 10);
	assert_eq!(report.reason.as_deref(), Some("client request"));

	let md = engine.get_market_data("AAPL").unwrap();
	assert_eq!(md.best_bid, None);
	assert!(engine.find_order(resting.order_id).is_none());
}

#[test]
fn test_async_submit_and_cancel() {
	let engine = engine();
	let order_id = engine.submit_order(buy("MSFT", 50, 10)).unwrap();

	assert!(wait_until(
		|| engine.find_order(order_id).is_some(),
		Duration::from_secs(1),
	));
	assert_eq!(
		engine.get_market_data("MSFT").unwrap().best_bid,
		Some(px(50))
	);

	engine.cancel_order(order_id, "client request").unwrap();
	assert!(wait_until(
		|| engine.find_order(order_id).is_none(),
		Duration::from_secs(1),
	));
}

#[test]
fn test_modify_replaces_price_and_quantity() {
	let engine = engine();
	let order_id = engine.submit_order(buy("MSFT", 50, 10)).unwrap();
	assert!(wait_until(
		|| engine.find_order(order_id).is_some(),
		Duration::from_secs(1),
	));

	engine.modify_order(order_id, px(51), 4).unwrap();
	assert!(wait_until(
		|| {
			engine
				.find_order(order_id)
				.map(|o| o.price == px(51) && o.remaining == 4)
				.unwrap_or(false)
		},
		Duration::from_secs(1),
	));
}

#[test]
fn test_commands_from_one_client_process_in_order() {
	let engine = engine();
	// Submit and immediately cancel through the queue; the cancel must see
	// the submit already applied.
	let order_id = engine.submit_order(buy("MSFT", 50, 10)).unwrap();
	engine.cancel_order(order_id, "raced cancel").unwrap();

	assert!(wait_until(
		|| {
			engine.find_order(order_id).is_none()
				&& engine
					.get_market_data("MSFT")
					.map(|md| md.best_bid.is_none())
					.unwrap_or(false)
		},
		Duration::from_secs(1),
	));
}

#[test]
fn test_statistics_track_activity() {
	let engine = engine();
	engine.submit_order_sync(sell("AAPL", 100, 8)).unwrap();
	engine.submit_order_sync(buy("AAPL", 100, 8)).unwrap();
	engine
		.submit_order_sync(OrderRequest::limit("C", "AAPL", Side::Buy, px(100), 0))
		.unwrap();

	let stats = engine.statistics();
	assert_eq!(stats.orders_processed, 3);
	assert_eq!(stats.trades_executed, 1);
	assert_eq!(stats.orders_rejected, 1);
	assert_eq!(stats.total_volume, 8);
	// 100.00 x 8 = 800.00 = 80_000 cents
	assert_eq!(stats.total_value_cents, 80_000);
	assert!(stats.max_processing_ns >= stats.min_processing_ns);

	engine.reset_statistics();
	assert_eq!(engine.statistics().orders_processed, 0);
}

#[test]
fn test_books_are_per_symbol() {
	let engine = engine();
	engine.submit_order_sync(sell("AAPL", 100, 5)).unwrap();
	engine.submit_order_sync(sell("MSFT", 50, 5)).unwrap();

	// A buy on MSFT must not touch AAPL liquidity
	let taker = engine.submit_order_sync(buy("MSFT", 50, 5)).unwrap();
	assert_eq!(taker.status, OrderStatus::Filled);
	assert_eq!(engine.get_market_data("AAPL").unwrap().ask_quantity, 5);

	let mut symbols = engine.all_symbols();
	symbols.sort();
	assert_eq!(symbols, vec!["AAPL".to_string(), "MSFT".to_string()]);
}

#[test]
fn test_auction_modes_are_refused_at_start() {
	for mode in [MatchingMode::Auction, MatchingMode::CallAuction] {
		let config = EngineConfig {
			matching_mode: mode,
			..EngineConfig::default()
		};
		match MatchingEngine::start(config) {
			Err(EngineError::UnsupportedMode(m)) => assert_eq!(m, mode),
			other => panic!("expected UnsupportedMode, got {:?}", other.is_ok()),
		}
	}
}

#[test]
fn test_graceful_stop_drains_queue() {
	let engine = engine();
	let order_id = engine.submit_order(buy("AAPL", 100, 5)).unwrap();
	// Stop after enqueue; the command must still be applied before the
	// thread exits.
	assert!(wait_until(
		|| engine.find_order(order_id).is_some(),
		Duration::from_secs(1),
	));
	engine.stop();
}
