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

use serde::{Deserialize, Serialize};

use crate::price::Price;

/// Engine-assigned order identifier, monotonic and unique for the process.
pub type OrderId = u64;

/// Unsigned order quantity.
pub type Quantity = u64;

/// Short ASCII ticker, e.g. "AAPL".
pub type Symbol = String;

/// Opaque client identity assigned by the gateway (CompID-derived).
pub type ClientId = String;

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
	Buy,
	Sell,
}

impl Side {
	/// FIX tag 54 encoding ('1' = Buy, '2' = Sell)
	pub fn to_fix(self) -> char {
		match self {
			Side::Buy => '1',
			Side::Sell => '2',
		}
	}

	pub fn from_fix(c: char) -> Option<Side> {
		match c {
			'1' => Some(Side::Buy),
			'2' => Some(Side::Sell),
			_ => None,
		}
	}

	pub fn opposite(self) -> Side {
		match self {
			Side::Buy => Side::Sell,
			Side::Sell => Side::Buy,
		}
	}
}

/// Order type
///
/// Stop and StopLimit exist in the vocabulary but the matching core only
/// accepts Market and Limit; the others are rejected at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
	Market,
	Limit,
	Stop,
	StopLimit,
}

impl OrderType {
	/// FIX tag 40 encoding
	pub fn to_fix(self) -> char {
		match self {
			OrderType::Market => '1',
			OrderType::Limit => '2',
			OrderType::Stop => '3',
			OrderType::StopLimit => '4',
		}
	}

	pub fn from_fix(c: char) -> Option<OrderType> {
		match c {
			'1' => Some(OrderType::Market),
			'2' => Some(OrderType::Limit),
			'3' => Some(OrderType::Stop),
			'4' => Some(OrderType::StopLimit),
			_ => None,
		}
	}
}

/// Order status
///
/// `Filled`, `Cancelled` and `Rejected` are terminal: once reached, the
/// order may not change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	New,
	PartiallyFilled,
	Filled,
	Cancelled,
	Rejected,
}

impl OrderStatus {
	/// FIX tag 39 / 150 encoding
	pub fn to_fix(self) -> char {
		match self {
			OrderStatus::New => '0',
			OrderStatus::PartiallyFilled => '1',
			OrderStatus::Filled => '2',
			OrderStatus::Cancelled => '4',
			OrderStatus::Rejected => '8',
		}
	}

	pub fn is_terminal(self) -> bool {
		matches!(
			self,
			OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
		)
	}

	pub fn is_active(self) -> bool {
		matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
	}
}

/// Time in force
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
	/// Valid for the trading day (default)
	#[default]
	Day,
	/// Good till cancel
	Gtc,
	/// Immediate or cancel: fill what is possible, cancel the rest
	Ioc,
	/// Fill or kill: fill completely at once or reject without trading
	Fok,
}

impl TimeInForce {
	/// FIX tag 59 encoding
	pub fn to_fix(self) -> char {
		match self {
			TimeInForce::Day => '0',
			TimeInForce::Gtc => '1',
			TimeInForce::Ioc => '3',
			TimeInForce::Fok => '4',
		}
	}

	pub fn from_fix(c: char) -> Option<TimeInForce> {
		match c {
			'0' => Some(TimeInForce::Day),
			'1' => Some(TimeInForce::Gtc),
			'3' => Some(TimeInForce::Ioc),
			'4' => Some(TimeInForce::Fok),
			_ => None,
		}
	}
}

/// Immutable trade record produced when two orders cross
///
/// The price is always the resting (maker) order's price. Trades are never
/// mutated after emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
	pub buy_order_id: OrderId,
	pub sell_order_id: OrderId,
	pub symbol: Symbol,
	pub price: Price,
	pub quantity: Quantity,
	/// Monotonic nanoseconds assigned by the engine
	pub timestamp: u64,
}
