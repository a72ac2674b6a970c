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

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use ferrox_sdk::{OrderId, OrderStatus, Price, Quantity, Side, Symbol, TimeInForce, Trade};
use serde::{Deserialize, Serialize};

use crate::types::Order;

/// Price level in the order book
///
/// All orders at one price, in time priority (first in, first out).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevel {
	price: Price,
	orders: Vec<Order>,
	/// Sum of `remaining` across `orders`
	total_quantity: Quantity,
}

impl PriceLevel {
	fn new(price: Price) -> Self {
		Self {
			price,
			orders: Vec::new(),
			total_quantity: 0,
		}
	}

	pub fn add_order(&mut self, order: Order) {
		debug_assert_eq!(order.price, self.price);
		debug_assert!(order.is_active());
		self.total_quantity += order.remaining;
		self.orders.push(order);
	}

	pub fn remove_order(&mut self, order_id: OrderId) -> Option<Order> {
		let pos = self.orders.iter().position(|o| o.order_id == order_id)?;
		let order = self.orders.remove(pos);
		self.total_quantity -= order.remaining;
		Some(order)
	}

	/// Fill the front order by `quantity` and return its post-fill
	/// snapshot; a fully filled order is removed in the same step.
	fn fill_front(&mut self, quantity: Quantity) -> Order {
		let order = self.orders.first_mut().expect("fill_front on empty level");
		order.fill(quantity);
		self.total_quantity -= quantity;
		let snapshot = order.clone();
		if snapshot.remaining == 0 {
			self.orders.remove(0);
		}
		snapshot
	}

	pub fn front(&self) -> Option<&Order> {
		self.orders.first()
	}

	pub fn find(&self, order_id: OrderId) -> Option<&Order> {
		self.orders.iter().find(|o| o.order_id == order_id)
	}

	pub fn is_empty(&self) -> bool {
		self.orders.is_empty()
	}

	pub fn total_quantity(&self) -> Quantity {
		self.total_quantity
	}

	pub fn order_count(&self) -> usize {
		self.orders.len()
	}
}

/// Outcome of submitting one order
///
/// `maker_updates` holds the post-fill snapshot of each resting order
/// touched, in the same order as `trades`; `taker` is the submitted
/// order's final state.
#[derive(Debug, Clone)]
pub struct SubmitResult {
	pub taker: Order,
	pub trades: Vec<Trade>,
	pub maker_updates: Vec<Order>,
}

/// Limit order book for one symbol (single-writer)
///
/// Price-sorted levels on each side: bids descending (via `Reverse`),
/// asks ascending. A direct `OrderId` index makes cancel O(log n). All
/// mutation happens on the matching thread; concurrent readers go through
/// the engine's book lock and only touch the query methods.
///
/// Invariants, checked where cheap:
/// - the id index and the level maps agree
/// - no empty level survives a mutation
/// - at rest, `best_bid < best_ask` whenever both sides are populated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
	symbol: Symbol,
	/// Buy side: best (highest) price first
	bids: BTreeMap<Reverse<Price>, PriceLevel>,
	/// Sell side: best (lowest) price first
	asks: BTreeMap<Price, PriceLevel>,
	/// OrderId -> (side, resting price)
	index: HashMap<OrderId, (Side, Price)>,
	last_trade: Option<(Price, Quantity)>,
}

impl OrderBook {
	pub fn new(symbol: Symbol) -> Self {
		Self {
			symbol,
			bids: BTreeMap::new(),
			asks: BTreeMap::new(),
			index: HashMap::new(),
			last_trade: None,
		}
	}

	pub fn symbol(&self) -> &str {
		&self.symbol
	}

	/// Match `order` against the opposite side, then rest any residual
	/// permitted to rest.
	///
	/// Continuous price-time priority: best opposite level first, FIFO
	/// within a level, every trade at the resting order's price. Market
	/// orders never rest; an unfilled market residual ends Rejected.
	/// IOC residuals are cancelled; FOK is checked against reachable
	/// liquidity before any trade is emitted.
	pub fn submit(&mut self, mut order: Order, now: u64) -> SubmitResult {
		let mut trades = Vec::new();
		let mut maker_updates = Vec::new();

		if order.symbol != self.symbol {
			order.status = OrderStatus::Rejected;
			return SubmitResult {
				taker: order,
				trades,
				maker_updates,
			};
		}

		if order.time_in_force == TimeInForce::Fok
			&& self.fillable_quantity(&order) < order.remaining
		{
			order.status = OrderStatus::Rejected;
			return SubmitResult {
				taker: order,
				trades,
				maker_updates,
			};
		}

		while order.remaining > 0 && self.crosses(&order) {
			let (trade, maker) = self.fill_best(&mut order, now);
			trades.push(trade);
			maker_updates.push(maker);
		}

		if order.remaining > 0 {
			if order.is_market() {
				// Insufficient liquidity; partial fills stand
				order.status = OrderStatus::Rejected;
			} else if order.time_in_force == TimeInForce::Ioc {
				order.status = OrderStatus::Cancelled;
			} else {
				self.rest(order.clone());
			}
		}

		debug_assert!(!self.is_crossed());

		SubmitResult {
			taker: order,
			trades,
			maker_updates,
		}
	}

	/// Atomically remove an active order. `None` when the id is unknown,
	/// already terminal, or never rested.
	pub fn cancel(&mut self, order_id: OrderId) -> Option<Order> {
		let (side, price) = self.index.remove(&order_id)?;
		let mut order = match side {
			Side::Buy => {
				let key = Reverse(price);
				let level = self.bids.get_mut(&key)?;
				let order = level.remove_order(order_id);
				if level.is_empty() {
					self.bids.remove(&key);
				}
				order?
			}
			Side::Sell => {
				let level = self.asks.get_mut(&price)?;
				let order = level.remove_order(order_id);
				if level.is_empty() {
					self.asks.remove(&price);
				}
				order?
			}
		};
		order.status = OrderStatus::Cancelled;
		Some(order)
	}

	pub fn best_bid(&self) -> Option<Price> {
		self.bids.first_key_value().map(|(key, _)| key.0)
	}

	pub fn best_ask(&self) -> Option<Price> {
		self.asks.first_key_value().map(|(key, _)| *key)
	}

	/// Aggregate resting quantity at the best bid.
	pub fn bid_quantity_at_top(&self) -> Quantity {
		self.bids
			.first_key_value()
			.map(|(_, level)| level.total_quantity())
			.unwrap_or(0)
	}

	/// Aggregate resting quantity at the best ask.
	pub fn ask_quantity_at_top(&self) -> Quantity {
		self.asks
			.first_key_value()
			.map(|(_, level)| level.total_quantity())
			.unwrap_or(0)
	}

	/// Up to `levels` price levels from the top of one side, best first.
	pub fn depth(&self, side: Side, levels: usize) -> Vec<(Price, Quantity)> {
		match side {
			Side::Buy => self
				.bids
				.iter()
				.take(levels)
				.map(|(key, level)| (key.0, level.total_quantity()))
				.collect(),
			Side::Sell => self
				.asks
				.iter()
				.take(levels)
				.map(|(key, level)| (*key, level.total_quantity()))
				.collect(),
		}
	}

	/// Snapshot of a resting order.
	pub fn find(&self, order_id: OrderId) -> Option<Order> {
		let (side, price) = self.index.get(&order_id)?;
		let level = match side {
			Side::Buy => self.bids.get(&Reverse(*price)),
			Side::Sell => self.asks.get(price),
		}?;
		level.find(order_id).cloned()
	}

	/// Total resting order count across both sides.
	pub fn order_count(&self) -> usize {
		self.index.len()
	}

	pub fn last_trade(&self) -> Option<(Price, Quantity)> {
		self.last_trade
	}

	/// A resting book must never cross.
	pub fn is_crossed(&self) -> bool {
		match (self.best_bid(), self.best_ask()) {
			(Some(bid), Some(ask)) => bid >= ask,
			_ => false,
		}
	}

	/// Whether `order` can trade against the current best opposite level.
	fn crosses(&self, order: &Order) -> bool {
		match order.side {
			Side::Buy => match self.best_ask() {
				Some(ask) => order.is_market() || order.price >= ask,
				None => false,
			},
			Side::Sell => match self.best_bid() {
				Some(bid) => order.is_market() || order.price <= bid,
				None => false,
			},
		}
	}

	/// Quantity reachable for `order` walking the opposite side top-down.
	/// Stops early once the order's own remaining is covered.
	fn fillable_quantity(&self, order: &Order) -> Quantity {
		let mut reachable = 0;
		match order.side {
			Side::Buy => {
				for (&price, level) in &self.asks {
					if !(order.is_market() || order.price >= price) {
						break;
					}
					reachable += level.total_quantity();
					if reachable >= order.remaining {
						break;
					}
				}
			}
			Side::Sell => {
				for (&Reverse(price), level) in &self.bids {
					if !(order.is_market() || order.price <= price) {
						break;
					}
					reachable += level.total_quantity();
					if reachable >= order.remaining {
						break;
					}
				}
			}
		}
		reachable
	}

	/// Execute one fill between `taker` and the front of the best opposite
	/// level. The caller has already established that the prices cross.
	fn fill_best(&mut self, taker: &mut Order, now: u64) -> (Trade, Order) {
		let (maker, quantity) = match taker.side {
			Side::Buy => {
				let mut entry = self.asks.first_entry().expect("crossed book has an ask");
				let level = entry.get_mut();
				let quantity = taker
					.remaining
					.min(level.front().expect("no empty levels").remaining);
				taker.fill(quantity);
				let maker = level.fill_front(quantity);
				if level.is_empty() {
					entry.remove();
				}
				(maker, quantity)
			}
			Side::Sell => {
				let mut entry = self.bids.first_entry().expect("crossed book has a bid");
				let level = entry.get_mut();
				let quantity = taker
					.remaining
					.min(level.front().expect("no empty levels").remaining);
				taker.fill(quantity);
				let maker = level.fill_front(quantity);
				if level.is_empty() {
					entry.remove();
				}
				(maker, quantity)
			}
		};

		if maker.remaining == 0 {
			self.index.remove(&maker.order_id);
		}

		let (buy_order_id, sell_order_id) = match taker.side {
			Side::Buy => (taker.order_id, maker.order_id),
			Side::Sell => (maker.order_id, taker.order_id),
		};
		let trade = Trade {
			buy_order_id,
			sell_order_id,
			symbol: self.symbol.clone(),
			price: maker.price,
			quantity,
			timestamp: now,
		};
		self.last_trade = Some((trade.price, trade.quantity));
		(trade, maker)
	}

	/// Rest a limit order at its price and record it in the id index.
	fn rest(&mut self, order: Order) {
		debug_assert!(!order.is_market());
		debug_assert!(order.is_active());
		self.index.insert(order.order_id, (order.side, order.price));
		match order.side {
			Side::Buy => self
				.bids
				.entry(Reverse(order.price))
				.or_insert_with(|| PriceLevel::new(order.price))
				.add_order(order),
			Side::Sell => self
				.asks
				.entry(order.price)
				.or_insert_with(|| PriceLevel::new(order.price))
				.add_order(order),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ferrox_sdk::OrderType;

	const SYMBOL: &str = "AAPL";

	fn px(units: u64) -> Price {
		Price::from_units(units)
	}

	fn limit(order_id: OrderId, side: Side, price: Price, quantity: Quantity) -> Order {
		Order {
			order_id,
			client_id: "client".to_string(),
			symbol: SYMBOL.to_string(),
			side,
			order_type: OrderType::Limit,
			price,
			quantity,
			remaining: quantity,
			status: OrderStatus::New,
			time_in_force: TimeInForce::Day,
			timestamp: order_id,
		}
	}

	fn market(order_id: OrderId, side: Side, quantity: Quantity) -> Order {
		Order {
			order_type: OrderType::Market,
			price: Price::ZERO,
			..limit(order_id, side, Price::ZERO, quantity)
		}
	}

	fn book() -> OrderBook {
		OrderBook::new(SYMBOL.to_string())
	}

	#[test]
	fn test_simple_cross_partial_maker() {
		let mut book = book();
		let rested = book.submit(limit(1, Side::Sell, px(100), 10), 1);
		assert!(rested.trades.is_empty());
		assert_eq!(rested.taker.status, OrderStatus::New);

		let result = book.submit(limit(2, Side::Buy, px(100), 8), 2);
		assert_eq!(result.trades.len(), 1);
		let trade = &result.trades[0];
		assert_eq!(trade.buy_order_id, 2);
		assert_eq!(trade.sell_order_id, 1);
		assert_eq!(trade.price, px(100));
		assert_eq!(trade.quantity, 8);

		assert_eq!(result.taker.status, OrderStatus::Filled);
		assert_eq!(result.taker.remaining, 0);
		assert_eq!(result.maker_updates[0].status, OrderStatus::PartiallyFilled);
		assert_eq!(result.maker_updates[0].remaining, 2);

		assert_eq!(book.best_ask(), Some(px(100)));
		assert_eq!(book.ask_quantity_at_top(), 2);
		assert_eq!(book.best_bid(), None);
	}

	#[test]
	fn test_market_walks_the_book() {
		let mut book = book();
		book.submit(limit(1, Side::Sell, px(100), 5), 1);
		book.submit(limit(2, Side::Sell, px(101), 10), 2);

		let result = book.submit(market(3, Side::Buy, 12), 3);
		assert_eq!(result.trades.len(), 2);
		assert_eq!(
			(result.trades[0].price, result.trades[0].quantity),
			(px(100), 5)
		);
		assert_eq!(
			(result.trades[1].price, result.trades[1].quantity),
			(px(101), 7)
		);
		assert_eq!(result.taker.status, OrderStatus::Filled);
		assert_eq!(result.maker_updates[0].status, OrderStatus::Filled);
		assert_eq!(result.maker_updates[1].status, OrderStatus::PartiallyFilled);
		assert_eq!(result.maker_updates[1].remaining, 3);
		assert_eq!(book.ask_quantity_at_top(), 3);
	}

	#[test]
	fn test_market_with_insufficient_liquidity_rejected() {
		let mut book = book();
		book.submit(limit(1, Side::Sell, px(100), 5), 1);

		let result = book.submit(market(2, Side::Buy, 20), 2);
		assert_eq!(result.trades.len(), 1);
		assert_eq!(result.trades[0].quantity, 5);
		assert_eq!(result.taker.status, OrderStatus::Rejected);
		assert_eq!(result.taker.remaining, 15);
		// Never rested
		assert_eq!(book.order_count(), 0);
		assert!(book.find(2).is_none());
	}

	#[test]
	fn test_market_against_empty_book_rejected_without_trades() {
		let mut book = book();
		let result = book.submit(market(1, Side::Buy, 10), 1);
		assert!(result.trades.is_empty());
		assert_eq!(result.taker.status, OrderStatus::Rejected);
		assert_eq!(result.taker.remaining, 10);
		assert_eq!(book.order_count(), 0);
	}

	#[test]
	fn test_fifo_within_price_level() {
		let mut book = book();
		book.submit(limit(1, Side::Sell, px(100), 5), 1);
		book.submit(limit(2, Side::Sell, px(100), 5), 2);

		let result = book.submit(limit(3, Side::Buy, px(100), 7), 3);
		assert_eq!(result.trades.len(), 2);
		assert_eq!(result.trades[0].sell_order_id, 1);
		assert_eq!(result.trades[0].quantity, 5);
		assert_eq!(result.trades[1].sell_order_id, 2);
		assert_eq!(result.trades[1].quantity, 2);
		assert_eq!(result.taker.status, OrderStatus::Filled);
		assert_eq!(result.maker_updates[1].remaining, 3);
	}

	#[test]
	fn test_price_priority_beats_time_priority() {
		let mut book = book();
		book.submit(limit(1, Side::Sell, px(101), 5), 1);
		book.submit(limit(2, Side::Sell, px(100), 5), 2);

		let result = book.submit(limit(3, Side::Buy, px(101), 5), 3);
		assert_eq!(result.trades.len(), 1);
		assert_eq!(result.trades[0].sell_order_id, 2);
		assert_eq!(result.trades[0].price, px(100));
	}

	#[test]
	fn test_trade_prints_at_maker_price() {
		let mut book = book();
		book.submit(limit(1, Side::Sell, px(100), 5), 1);
		// Buyer willing to pay more still trades at 100
		let result = book.submit(limit(2, Side::Buy, px(105), 5), 2);
		assert_eq!(result.trades[0].price, px(100));
	}

	#[test]
	fn test_non_crossing_limit_rests() {
		let mut book = book();
		book.submit(limit(1, Side::Sell, px(101), 5), 1);
		let result = book.submit(limit(2, Side::Buy, px(100), 5), 2);
		assert!(result.trades.is_empty());
		assert_eq!(result.taker.status, OrderStatus::New);
		assert_eq!(book.best_bid(), Some(px(100)));
		assert_eq!(book.best_ask(), Some(px(101)));
		assert!(!book.is_crossed());
	}

	#[test]
	fn test_ioc_residual_is_cancelled_not_rested() {
		let mut book = book();
		book.submit(limit(1, Side::Sell, px(100), 5), 1);

		let mut order = limit(2, Side::Buy, px(100), 8);
		order.time_in_force = TimeInForce::Ioc;
		let result = book.submit(order, 2);

		assert_eq!(result.trades.len(), 1);
		assert_eq!(result.trades[0].quantity, 5);
		assert_eq!(result.taker.status, OrderStatus::Cancelled);
		assert_eq!(result.taker.remaining, 3);
		assert_eq!(book.order_count(), 0);
	}

	#[test]
	fn test_fok_rejected_without_trading_when_unfillable() {
		let mut book = book();
		book.submit(limit(1, Side::Sell, px(100), 5), 1);
		book.submit(limit(2, Side::Sell, px(101), 2), 2);

		let mut order = limit(3, Side::Buy, px(100), 6);
		order.time_in_force = TimeInForce::Fok;
		let result = book.submit(order, 3);

		// The 101 level does not cross at 100, so only 5 were reachable
		assert!(result.trades.is_empty());
		assert_eq!(result.taker.status, OrderStatus::Rejected);
		// Book untouched
		assert_eq!(book.ask_quantity_at_top(), 5);
		assert_eq!(book.find(1).unwrap().remaining, 5);
	}

	#[test]
	fn test_fok_fills_completely_when_reachable() {
		let mut book = book();
		book.submit(limit(1, Side::Sell, px(100), 5), 1);
		book.submit(limit(2, Side::Sell, px(101), 5), 2);

		let mut order = limit(3, Side::Buy, px(101), 8);
		order.time_in_force = TimeInForce::Fok;
		let result = book.submit(order, 3);

		assert_eq!(result.trades.len(), 2);
		assert_eq!(result.taker.status, OrderStatus::Filled);
	}

	#[test]
	fn test_cancel_resting_order() {
		let mut book = book();
		book.submit(limit(1, Side::Buy, px(99), 10), 1);

		let cancelled = book.cancel(1).expect("order should be found");
		assert_eq!(cancelled.status, OrderStatus::Cancelled);
		assert_eq!(cancelled.remaining, 10);
		assert_eq!(book.best_bid(), None);
		assert_eq!(book.order_count(), 0);
	}

	#[test]
	fn test_cancel_unknown_order_returns_none() {
		let mut book = book();
		assert!(book.cancel(42).is_none());
	}

	#[test]
	fn test_cancel_filled_order_returns_none() {
		let mut book = book();
		book.submit(limit(1, Side::Sell, px(100), 5), 1);
		book.submit(limit(2, Side::Buy, px(100), 5), 2);
		// Order 1 is gone from the book
		assert!(book.cancel(1).is_none());
	}

	#[test]
	fn test_submit_then_cancel_restores_empty_book() {
		let mut book = book();
		book.submit(limit(1, Side::Buy, px(99), 10), 1);
		book.cancel(1);
		assert_eq!(book.order_count(), 0);
		assert_eq!(book.best_bid(), None);
		assert_eq!(book.depth(Side::Buy, 10).len(), 0);
	}

	#[test]
	fn test_wrong_symbol_is_rejected_without_state_change() {
		let mut book = book();
		let mut order = limit(1, Side::Buy, px(100), 5);
		order.symbol = "MSFT".to_string();
		let result = book.submit(order, 1);
		assert_eq!(result.taker.status, OrderStatus::Rejected);
		assert_eq!(book.order_count(), 0);
	}

	#[test]
	fn test_depth_orders_levels_best_first() {
		let mut book = book();
		book.submit(limit(1, Side::Buy, px(98), 1), 1);
		book.submit(limit(2, Side::Buy, px(100), 2), 2);
		book.submit(limit(3, Side::Buy, px(99), 3), 3);
		book.submit(limit(4, Side::Buy, px(100), 4), 4);

		let depth = book.depth(Side::Buy, 2);
		assert_eq!(depth, vec![(px(100), 6), (px(99), 3)]);
	}

	#[test]
	fn test_fill_conservation() {
		// Sum of trade quantities never exceeds the original quantity
		let mut book = book();
		book.submit(limit(1, Side::Sell, px(100), 3), 1);
		book.submit(limit(2, Side::Sell, px(100), 4), 2);
		book.submit(limit(3, Side::Sell, px(101), 5), 3);

		let result = book.submit(limit(4, Side::Buy, px(101), 10), 4);
		let total: Quantity = result.trades.iter().map(|t| t.quantity).sum();
		assert_eq!(total, 10);
		assert_eq!(result.taker.remaining, 0);
	}

	#[test]
	fn test_index_and_levels_agree_after_churn() {
		let mut book = book();
		for id in 1..=20 {
			let side = if id % 2 == 0 { Side::Buy } else { Side::Sell };
			let price = if side == Side::Buy { px(90 + id % 5) } else { px(100 + id % 5) };
			book.submit(limit(id, side, price, 10), id);
		}
		for id in (1..=20).step_by(3) {
			book.cancel(id);
		}
		// Every indexed order is findable, and counts line up
		let mut seen = 0;
		for id in 1..=20 {
			if let Some(order) = book.find(id) {
				assert_eq!(order.order_id, id);
				seen += 1;
			}
		}
		assert_eq!(seen, book.order_count());
		assert!(!book.is_crossed());
	}
}
