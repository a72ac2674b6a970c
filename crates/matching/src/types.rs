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

use ferrox_sdk::{
	ClientId, OrderId, OrderStatus, OrderType, Price, Quantity, Side, Symbol, TimeInForce,
};
use serde::{Deserialize, Serialize};

/// Order parameters as admitted by the gateway
///
/// This is the pre-validated input to the engine: no identity, no
/// timestamps, no state. The engine assigns `OrderId` and the admission
/// timestamp and turns it into an [`Order`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
	pub client_id: ClientId,
	pub symbol: Symbol,
	pub side: Side,
	pub order_type: OrderType,
	/// Zero for market orders
	pub price: Price,
	pub quantity: Quantity,
	pub time_in_force: TimeInForce,
}

impl OrderRequest {
	pub fn limit(
		client_id: impl Into<ClientId>,
		symbol: impl Into<Symbol>,
		side: Side,
		price: Price,
		quantity: Quantity,
	) -> Self {
		Self {
			client_id: client_id.into(),
			symbol: symbol.into(),
			side,
			order_type: OrderType::Limit,
			price,
			quantity,
			time_in_force: TimeInForce::Day,
		}
	}

	pub fn market(
		client_id: impl Into<ClientId>,
		symbol: impl Into<Symbol>,
		side: Side,
		quantity: Quantity,
	) -> Self {
		Self {
			client_id: client_id.into(),
			symbol: symbol.into(),
			side,
			order_type: OrderType::Market,
			price: Price::ZERO,
			quantity,
			time_in_force: TimeInForce::Day,
		}
	}

	pub fn with_time_in_force(mut self, tif: TimeInForce) -> Self {
		self.time_in_force = tif;
		self
	}
}

/// An order inside the matching core
///
/// Identity and parameters are immutable after admission; only `remaining`
/// and `status` change, and only on the matching thread. Values handed to
/// callers are clones, never references into the book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	pub order_id: OrderId,
	pub client_id: ClientId,
	pub symbol: Symbol,
	pub side: Side,
	pub order_type: OrderType,
	pub price: Price,
	pub quantity: Quantity,
	pub remaining: Quantity,
	pub status: OrderStatus,
	pub time_in_force: TimeInForce,
	/// Monotonic nanoseconds assigned at admission; the time-priority key
	pub timestamp: u64,
}

impl Order {
	pub fn from_request(request: OrderRequest, order_id: OrderId, timestamp: u64) -> Self {
		Self {
			order_id,
			client_id: request.client_id,
			symbol: request.symbol,
			side: request.side,
			order_type: request.order_type,
			price: request.price,
			quantity: request.quantity,
			remaining: request.quantity,
			status: OrderStatus::New,
			time_in_force: request.time_in_force,
			timestamp,
		}
	}

	pub fn filled_quantity(&self) -> Quantity {
		self.quantity - self.remaining
	}

	pub fn is_active(&self) -> bool {
		self.status.is_active()
	}

	pub fn is_market(&self) -> bool {
		self.order_type == OrderType::Market
	}

	/// Apply a fill of `quantity`, advancing status to PartiallyFilled or
	/// Filled. The caller guarantees `quantity <= remaining`.
	pub(crate) fn fill(&mut self, quantity: Quantity) {
		debug_assert!(quantity > 0 && quantity <= self.remaining);
		self.remaining -= quantity;
		self.status = if self.remaining == 0 {
			OrderStatus::Filled
		} else {
			OrderStatus::PartiallyFilled
		};
	}
}

/// Snapshot of an order state change, routed back to the originator
///
/// Reports are values copied out of the book; emitting one never holds a
/// book lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
	pub order_id: OrderId,
	pub client_id: ClientId,
	pub symbol: Symbol,
	pub side: Side,
	pub order_type: OrderType,
	pub price: Price,
	pub quantity: Quantity,
	/// LeavesQty
	pub remaining: Quantity,
	pub status: OrderStatus,
	/// Price of the fill that produced this report, if any
	pub last_price: Option<Price>,
	/// Quantity of the fill that produced this report, if any
	pub last_quantity: Option<Quantity>,
	/// Human-readable reason for rejects and cancels
	pub reason: Option<String>,
	pub timestamp: u64,
}

impl ExecutionReport {
	pub fn from_order(order: &Order, timestamp: u64) -> Self {
		Self {
			order_id: order.order_id,
			client_id: order.client_id.clone(),
			symbol: order.symbol.clone(),
			side: order.side,
			order_type: order.order_type,
			price: order.price,
			quantity: order.quantity,
			remaining: order.remaining,
			status: order.status,
			last_price: None,
			last_quantity: None,
			reason: None,
			timestamp,
		}
	}

	pub fn with_fill(mut self, price: Price, quantity: Quantity) -> Self {
		self.last_price = Some(price);
		self.last_quantity = Some(quantity);
		self
	}

	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());
		self
	}

	/// CumQty
	pub fn cumulative_quantity(&self) -> Quantity {
		self.quantity - self.remaining
	}

	pub fn is_terminal(&self) -> bool {
		self.status.is_terminal()
	}
}

/// Top-of-book view of one symbol plus the last trade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketDataSnapshot {
	pub symbol: Symbol,
	pub best_bid: Option<Price>,
	pub best_ask: Option<Price>,
	/// Aggregate quantity at the best bid (zero when no bid)
	pub bid_quantity: Quantity,
	/// Aggregate quantity at the best ask (zero when no ask)
	pub ask_quantity: Quantity,
	pub last_trade_price: Option<Price>,
	pub last_trade_quantity: Quantity,
	pub timestamp: u64,
}
