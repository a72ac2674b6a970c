// Copyright 2025 The Ferrox Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

pub mod stats;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ferrox_sdk::{OrderId, OrderStatus, Price, Quantity, Symbol};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{EngineConfig, MatchingMode};
use crate::orderbook::{OrderBook, SubmitResult};
use crate::queue::{CommandQueue, CommandReceiver, CommandSender, EngineCommand, QueueError};
use crate::risk;
use crate::types::{ExecutionReport, MarketDataSnapshot, Order, OrderRequest};

use self::stats::{EngineStatistics, StatsSnapshot};

/// Execution-report callback; receives an owned snapshot, never a book
/// reference. Invoked on the matching thread after all locks are released.
pub type ExecutionCallback = Arc<dyn Fn(ExecutionReport) + Send + Sync>;

/// Market-data callback, fired after each mutating command when enabled.
pub type MarketDataCallback = Arc<dyn Fn(MarketDataSnapshot) + Send + Sync>;

/// Error callback for processing-budget overruns and invariant failures.
pub type ErrorCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Error types for engine operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
	#[error("matching mode {0:?} is not supported")]
	UnsupportedMode(MatchingMode),
	#[error("engine overloaded, command queue full")]
	Overloaded,
	#[error("engine is shutting down")]
	ShuttingDown,
	#[error("engine faulted, refusing commands")]
	Faulted,
	#[error("order {0} not found")]
	OrderNotFound(OrderId),
}

/// The venue's matching engine
///
/// Owns the `Symbol -> OrderBook` map and a dedicated matching thread that
/// drains the command queue. `submit_order`/`cancel_order`/`modify_order`
/// enqueue and return immediately; the `_sync` variants run the command on
/// the caller's thread for test harnesses.
///
/// Order ids are assigned centrally, monotonically from 1, before risk
/// checking, so a rejected order's report still carries an id.
pub struct MatchingEngine {
	shared: Arc<Shared>,
	sender: CommandSender,
	thread_handle: Option<JoinHandle<()>>,
}

struct Shared {
	config: EngineConfig,
	/// Books are created lazily and live for the program lifetime
	books: RwLock<HashMap<Symbol, Arc<RwLock<OrderBook>>>>,
	/// Routing for cancels and lookups; entries removed on terminal state
	order_symbols: Mutex<HashMap<OrderId, Symbol>>,
	next_order_id: AtomicU64,
	/// Monotonic epoch for admission timestamps and trade stamps
	epoch: Instant,
	stats: EngineStatistics,
	execution_cb: RwLock<Option<ExecutionCallback>>,
	market_data_cb: RwLock<Option<MarketDataCallback>>,
	error_cb: RwLock<Option<ErrorCallback>>,
	running: AtomicBool,
	faulted: AtomicBool,
}

impl MatchingEngine {
	/// Start the engine with a dedicated matching thread.
	pub fn start(config: EngineConfig) -> Result<Self, EngineError> {
		if config.matching_mode != MatchingMode::Continuous {
			return Err(EngineError::UnsupportedMode(config.matching_mode));
		}

		let (sender, receiver) = CommandQueue::new(config.command_queue_capacity).split();

		let shared = Arc::new(Shared {
			config,
			books: RwLock::new(HashMap::new()),
			order_symbols: Mutex::new(HashMap::new()),
			next_order_id: AtomicU64::new(1),
			epoch: Instant::now(),
			stats: EngineStatistics::new(),
			execution_cb: RwLock::new(None),
			market_data_cb: RwLock::new(None),
			error_cb: RwLock::new(None),
			running: AtomicBool::new(true),
			faulted: AtomicBool::new(false),
		});

		let loop_shared = shared.clone();
		let thread_handle = thread::Builder::new()
			.name("matching-loop".to_string())
			.spawn(move || {
				info!("matching engine started");
				Self::run_matching_loop(&loop_shared, receiver);
				loop_shared.running.store(false, Ordering::Relaxed);
				info!("matching engine stopped");
			})
			.expect("failed to spawn matching thread");

		Ok(Self {
			shared,
			sender,
			thread_handle: Some(thread_handle),
		})
	}

	fn run_matching_loop(shared: &Shared, receiver: CommandReceiver) {
		loop {
			match receiver.recv() {
				Ok(EngineCommand::Shutdown) => break,
				Ok(cmd) => Self::run_command(shared, cmd),
				Err(_) => {
					warn!("command queue disconnected");
					break;
				}
			}
		}
	}

	// ===== Asynchronous command interface =====

	/// Take the next order id from the central monotonic allocator.
	///
	/// Callers that must record routing before the engine can possibly
	/// report on the order (the gateway) allocate first, then submit with
	/// [`submit_order_with_id`](Self::submit_order_with_id).
	pub fn allocate_order_id(&self) -> OrderId {
		self.shared.next_order_id.fetch_add(1, Ordering::Relaxed)
	}

	/// Admit an order: assign its id and timestamp, enqueue, return the id.
	///
	/// Risk checks run on the matching thread; a failing order produces a
	/// Rejected execution report carrying the returned id.
	pub fn submit_order(&self, request: OrderRequest) -> Result<OrderId, EngineError> {
		let order_id = self.allocate_order_id();
		self.submit_order_with_id(order_id, request)?;
		Ok(order_id)
	}

	/// Enqueue an order under a previously allocated id.
	pub fn submit_order_with_id(
		&self,
		order_id: OrderId,
		request: OrderRequest,
	) -> Result<(), EngineError> {
		self.check_accepting()?;
		let order = Order::from_request(request, order_id, Self::now_nanos(&self.shared));
		self.enqueue(EngineCommand::Submit(order))
	}

	pub fn cancel_order(
		&self,
		order_id: OrderId,
		reason: impl Into<String>,
	) -> Result<(), EngineError> {
		self.check_accepting()?;
		self.enqueue(EngineCommand::Cancel {
			order_id,
			reason: reason.into(),
		})
	}

	/// Cancel-then-new under the same order id. The replacement loses time
	/// priority and is re-risk-checked; it is atomic with respect to other
	/// commands because both halves run inside one book critical section.
	pub fn modify_order(
		&self,
		order_id: OrderId,
		new_price: Price,
		new_quantity: Quantity,
	) -> Result<(), EngineError> {
		self.check_accepting()?;
		self.enqueue(EngineCommand::Modify {
			order_id,
			new_price,
			new_quantity,
		})
	}

	// ===== Synchronous paths (test harnesses) =====

	/// Submit bypassing the command queue; returns the taker's final
	/// report. Callbacks still fire.
	pub fn submit_order_sync(&self, request: OrderRequest) -> Result<ExecutionReport, EngineError> {
		self.check_accepting()?;
		let order = self.admit(request);
		let order_id = order.order_id;
		let start = Instant::now();
		let (reports, md) = Self::process_submit(&self.shared, order);
		self.shared
			.stats
			.record_command(start.elapsed().as_nanos() as u64);
		let result = reports
			.iter()
			.rev()
			.find(|r| r.order_id == order_id)
			.cloned()
			.expect("submit always reports on the taker");
		Self::flush(&self.shared, reports, md);
		Ok(result)
	}

	/// Cancel bypassing the command queue.
	pub fn cancel_order_sync(
		&self,
		order_id: OrderId,
		reason: impl Into<String>,
	) -> Result<ExecutionReport, EngineError> {
		self.check_accepting()?;
		let start = Instant::now();
		let (reports, md) = Self::process_cancel(&self.shared, order_id, reason.into());
		self.shared
			.stats
			.record_command(start.elapsed().as_nanos() as u64);
		let result = reports
			.iter()
			.rev()
			.find(|r| r.order_id == order_id)
			.cloned()
			.expect("cancel always reports");
		Self::flush(&self.shared, reports, md);
		Ok(result)
	}

	// ===== Read-only queries =====

	pub fn get_market_data(&self, symbol: &str) -> Option<MarketDataSnapshot> {
		let books = self.shared.books.read().unwrap();
		let book = books.get(symbol)?.clone();
		drop(books);
		let book = book.read().unwrap();
		Some(Self::market_data_locked(
			&book,
			Self::now_nanos(&self.shared),
		))
	}

	pub fn find_order(&self, order_id: OrderId) -> Option<Order> {
		let symbol = self
			.shared
			.order_symbols
			.lock()
			.unwrap()
			.get(&order_id)
			.cloned()?;
		let books = self.shared.books.read().unwrap();
		let book = books.get(&symbol)?.clone();
		drop(books);
		let book = book.read().unwrap();
		book.find(order_id)
	}

	pub fn all_symbols(&self) -> Vec<Symbol> {
		self.shared.books.read().unwrap().keys().cloned().collect()
	}

	pub fn statistics(&self) -> StatsSnapshot {
		self.shared.stats.snapshot()
	}

	pub fn reset_statistics(&self) {
		self.shared.stats.reset()
	}

	pub fn is_running(&self) -> bool {
		self.shared.running.load(Ordering::Relaxed)
	}

	pub fn is_faulted(&self) -> bool {
		self.shared.faulted.load(Ordering::Relaxed)
	}

	// ===== Callback registration =====

	pub fn set_execution_callback(&self, callback: ExecutionCallback) {
		*self.shared.execution_cb.write().unwrap() = Some(callback);
	}

	pub fn set_market_data_callback(&self, callback: MarketDataCallback) {
		*self.shared.market_data_cb.write().unwrap() = Some(callback);
	}

	pub fn set_error_callback(&self, callback: ErrorCallback) {
		*self.shared.error_cb.write().unwrap() = Some(callback);
	}

	/// Stop the matching thread after draining already-enqueued commands.
	pub fn stop(mut self) {
		let _ = self.sender.try_enqueue(EngineCommand::Shutdown);
		if let Some(handle) = self.thread_handle.take() {
			if handle.join().is_err() {
				error!("matching thread panicked during shutdown");
			}
		}
	}

	// ===== Internals =====

	fn check_accepting(&self) -> Result<(), EngineError> {
		if self.shared.faulted.load(Ordering::Relaxed) {
			return Err(EngineError::Faulted);
		}
		if !self.shared.running.load(Ordering::Relaxed) {
			return Err(EngineError::ShuttingDown);
		}
		Ok(())
	}

	fn admit(&self, request: OrderRequest) -> Order {
		let order_id = self.allocate_order_id();
		Order::from_request(request, order_id, Self::now_nanos(&self.shared))
	}

	fn enqueue(&self, cmd: EngineCommand) -> Result<(), EngineError> {
		self.sender.try_enqueue(cmd).map_err(|e| match e {
			QueueError::Full => EngineError::Overloaded,
			_ => EngineError::ShuttingDown,
		})
	}

	fn now_nanos(shared: &Shared) -> u64 {
		shared.epoch.elapsed().as_nanos() as u64
	}

	fn run_command(shared: &Shared, cmd: EngineCommand) {
		let start = Instant::now();
		let (reports, md) = match cmd {
			EngineCommand::Submit(order) => Self::process_submit(shared, order),
			EngineCommand::Cancel { order_id, reason } => {
				Self::process_cancel(shared, order_id, reason)
			}
			EngineCommand::Modify {
				order_id,
				new_price,
				new_quantity,
			} => Self::process_modify(shared, order_id, new_price, new_quantity),
			EngineCommand::Shutdown => return,
		};
		let elapsed = start.elapsed();
		shared.stats.record_command(elapsed.as_nanos() as u64);
		if elapsed > Duration::from_micros(shared.config.max_processing_time_us) {
			Self::emit_error(
				shared,
				format!(
					"command processing took {}us, budget {}us",
					elapsed.as_micros(),
					shared.config.max_processing_time_us
				),
			);
		}
		Self::flush(shared, reports, md);
	}

	fn process_submit(
		shared: &Shared,
		mut order: Order,
	) -> (Vec<ExecutionReport>, Option<MarketDataSnapshot>) {
		let now = Self::now_nanos(shared);
		let mut reports = Vec::new();

		let admission = risk::validate_structure(&order).and_then(|_| {
			if shared.config.enable_risk_check {
				let count = Self::book_order_count(shared, &order.symbol);
				risk::validate_limits(&order, &shared.config.risk_limits(), count)
			} else {
				Ok(())
			}
		});
		if let Err(reason) = admission {
			order.status = OrderStatus::Rejected;
			shared.stats.record_reject();
			reports.push(ExecutionReport::from_order(&order, now).with_reason(reason.to_string()));
			return (reports, None);
		}

		let book = Self::get_or_create_book(shared, &order.symbol);
		let (result, crossed, md) = {
			let mut book = book.write().unwrap();
			let result = book.submit(order, now);
			let crossed = book.is_crossed();
			let md = shared
				.config
				.enable_market_data_callbacks
				.then(|| Self::market_data_locked(&book, now));
			(result, crossed, md)
		};
		if crossed {
			Self::fault(
				shared,
				format!("book {} crossed at rest", result.taker.symbol),
			);
		}

		Self::report_submit_result(shared, &result, now, &mut reports);
		(reports, md)
	}

	fn process_cancel(
		shared: &Shared,
		order_id: OrderId,
		reason: String,
	) -> (Vec<ExecutionReport>, Option<MarketDataSnapshot>) {
		let now = Self::now_nanos(shared);
		let symbol = shared
			.order_symbols
			.lock()
			.unwrap()
			.get(&order_id)
			.cloned();

		let Some(symbol) = symbol else {
			return (vec![Self::not_found_report(order_id, now)], None);
		};

		let book = Self::get_or_create_book(shared, &symbol);
		let (cancelled, md) = {
			let mut book = book.write().unwrap();
			let cancelled = book.cancel(order_id);
			let md = shared
				.config
				.enable_market_data_callbacks
				.then(|| Self::market_data_locked(&book, now));
			(cancelled, md)
		};

		shared.order_symbols.lock().unwrap().remove(&order_id);

		match cancelled {
			Some(order) => {
				let report = ExecutionReport::from_order(&order, now).with_reason(reason);
				(vec![report], md)
			}
			None => (vec![Self::not_found_report(order_id, now)], None),
		}
	}

	fn process_modify(
		shared: &Shared,
		order_id: OrderId,
		new_price: Price,
		new_quantity: Quantity,
	) -> (Vec<ExecutionReport>, Option<MarketDataSnapshot>) {
		let now = Self::now_nanos(shared);
		let symbol = shared
			.order_symbols
			.lock()
			.unwrap()
			.get(&order_id)
			.cloned();

		let Some(symbol) = symbol else {
			return (vec![Self::not_found_report(order_id, now)], None);
		};

		let book = Self::get_or_create_book(shared, &symbol);
		let mut reports = Vec::new();
		// Cancel and resubmit inside one critical section so no other
		// command observes the intermediate state.
		let (outcome, crossed, md) = {
			let mut book = book.write().unwrap();
			match book.cancel(order_id) {
				None => (None, false, None),
				Some(old) => {
					let mut replacement = Order {
						price: new_price,
						quantity: new_quantity,
						remaining: new_quantity,
						status: OrderStatus::New,
						timestamp: now,
						..old
					};

					let admission = risk::validate_structure(&replacement).and_then(|_| {
						if shared.config.enable_risk_check {
							risk::validate_limits(
								&replacement,
								&shared.config.risk_limits(),
								book.order_count(),
							)
						} else {
							Ok(())
						}
					});

					let outcome = match admission {
						Ok(()) => Some(book.submit(replacement, now)),
						Err(reason) => {
							replacement.status = OrderStatus::Rejected;
							shared.stats.record_reject();
							reports.push(
								ExecutionReport::from_order(&replacement, now)
									.with_reason(reason.to_string()),
							);
							None
						}
					};
					let crossed = book.is_crossed();
					let md = shared
						.config
						.enable_market_data_callbacks
						.then(|| Self::market_data_locked(&book, now));
					(Some(outcome), crossed, md)
				}
			}
		};
		if crossed {
			Self::fault(shared, format!("book {} crossed at rest", symbol));
		}

		match outcome {
			None => {
				// Stale index entry for an order no longer in the book
				shared.order_symbols.lock().unwrap().remove(&order_id);
				reports.push(Self::not_found_report(order_id, now));
			}
			Some(None) => {
				// Replacement rejected by admission; the original is gone
				shared.order_symbols.lock().unwrap().remove(&order_id);
			}
			Some(Some(result)) => {
				if !result.taker.is_active() {
					shared.order_symbols.lock().unwrap().remove(&order_id);
				}
				Self::report_submit_result(shared, &result, now, &mut reports);
			}
		}
		(reports, md)
	}

	/// Turn a submit outcome into reports and index updates. Trades yield
	/// one report per side; residual dispositions yield a final report.
	fn report_submit_result(
		shared: &Shared,
		result: &SubmitResult,
		now: u64,
		reports: &mut Vec<ExecutionReport>,
	) {
		let taker = &result.taker;
		let mut order_symbols = shared.order_symbols.lock().unwrap();

		let mut taker_remaining = taker.quantity;
		for (trade, maker) in result.trades.iter().zip(&result.maker_updates) {
			shared
				.stats
				.record_trade(trade.quantity, trade.price.notional_cents(trade.quantity));

			reports.push(
				ExecutionReport::from_order(maker, now).with_fill(trade.price, trade.quantity),
			);
			if maker.remaining == 0 {
				order_symbols.remove(&maker.order_id);
			}

			taker_remaining -= trade.quantity;
			let mut taker_report =
				ExecutionReport::from_order(taker, now).with_fill(trade.price, trade.quantity);
			taker_report.remaining = taker_remaining;
			taker_report.status = if taker_remaining == 0 {
				OrderStatus::Filled
			} else {
				OrderStatus::PartiallyFilled
			};
			reports.push(taker_report);
		}

		match taker.status {
			OrderStatus::Rejected => {
				shared.stats.record_reject();
				let reason = if taker.time_in_force == ferrox_sdk::TimeInForce::Fok {
					"fill-or-kill: insufficient reachable quantity"
				} else if taker.is_market() {
					"insufficient liquidity for market order"
				} else {
					"order rejected by book"
				};
				reports.push(ExecutionReport::from_order(taker, now).with_reason(reason));
			}
			OrderStatus::Cancelled => {
				reports.push(
					ExecutionReport::from_order(taker, now)
						.with_reason("immediate-or-cancel residual cancelled"),
				);
			}
			OrderStatus::New => {
				// Rested without trading
				order_symbols.insert(taker.order_id, taker.symbol.clone());
				reports.push(ExecutionReport::from_order(taker, now));
			}
			OrderStatus::PartiallyFilled => {
				// Rested after trading; fill reports already emitted
				order_symbols.insert(taker.order_id, taker.symbol.clone());
			}
			OrderStatus::Filled => {}
		}
	}

	fn not_found_report(order_id: OrderId, now: u64) -> ExecutionReport {
		ExecutionReport {
			order_id,
			client_id: String::new(),
			symbol: String::new(),
			side: ferrox_sdk::Side::Buy,
			order_type: ferrox_sdk::OrderType::Limit,
			price: Price::ZERO,
			quantity: 0,
			remaining: 0,
			status: OrderStatus::Rejected,
			last_price: None,
			last_quantity: None,
			reason: Some("order not found".to_string()),
			timestamp: now,
		}
	}

	fn market_data_locked(book: &OrderBook, now: u64) -> MarketDataSnapshot {
		let (last_trade_price, last_trade_quantity) = match book.last_trade() {
			Some((price, quantity)) => (Some(price), quantity),
			None => (None, 0),
		};
		MarketDataSnapshot {
			symbol: book.symbol().to_string(),
			best_bid: book.best_bid(),
			best_ask: book.best_ask(),
			bid_quantity: book.bid_quantity_at_top(),
			ask_quantity: book.ask_quantity_at_top(),
			last_trade_price,
			last_trade_quantity,
			timestamp: now,
		}
	}

	fn book_order_count(shared: &Shared, symbol: &str) -> usize {
		shared
			.books
			.read()
			.unwrap()
			.get(symbol)
			.map(|b| b.read().unwrap().order_count())
			.unwrap_or(0)
	}

	fn get_or_create_book(shared: &Shared, symbol: &str) -> Arc<RwLock<OrderBook>> {
		if let Some(book) = shared.books.read().unwrap().get(symbol) {
			return book.clone();
		}
		let mut books = shared.books.write().unwrap();
		books
			.entry(symbol.to_string())
			.or_insert_with(|| {
				info!(symbol, "creating order book");
				Arc::new(RwLock::new(OrderBook::new(symbol.to_string())))
			})
			.clone()
	}

	/// Reports are delivered only after every lock is released, so a
	/// callback can re-enter the engine's query API safely.
	fn flush(shared: &Shared, reports: Vec<ExecutionReport>, md: Option<MarketDataSnapshot>) {
		if let Some(cb) = shared.execution_cb.read().unwrap().clone() {
			for report in reports {
				cb(report);
			}
		}
		if let Some(snapshot) = md {
			if let Some(cb) = shared.market_data_cb.read().unwrap().clone() {
				cb(snapshot);
			}
		}
	}

	/// Invariant violation: mark the engine failed and refuse further
	/// commands. There is no automatic recovery.
	fn fault(shared: &Shared, message: String) {
		error!(%message, "engine invariant violation");
		shared.faulted.store(true, Ordering::Relaxed);
		Self::emit_error(shared, message);
	}

	fn emit_error(shared: &Shared, message: String) {
		warn!(%message, "engine error callback");
		if let Some(cb) = shared.error_cb.read().unwrap().clone() {
			cb(message);
		}
	}
}

impl Drop for MatchingEngine {
	fn drop(&mut self) {
		let _ = self.sender.try_enqueue(EngineCommand::Shutdown);
		if let Some(handle) = self.thread_handle.take() {
			let _ = handle.join();
		}
	}
}
