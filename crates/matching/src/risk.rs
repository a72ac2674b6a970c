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

use ferrox_sdk::{OrderType, Price, Quantity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Order;

/// Per-order risk limits enforced before an order touches a book
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
	pub max_order_price: Price,
	pub max_order_quantity: Quantity,
	pub max_orders_per_symbol: usize,
}

impl Default for RiskLimits {
	fn default() -> Self {
		Self {
			max_order_price: Price::from_units(10_000),
			max_order_quantity: 1_000_000,
			max_orders_per_symbol: 10_000,
		}
	}
}

/// Admission failure; the message text becomes the reject reason (tag 58)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
	#[error("empty symbol")]
	EmptySymbol,
	#[error("zero quantity")]
	ZeroQuantity,
	#[error("order type not supported")]
	UnsupportedOrderType,
	#[error("market order must not carry a price")]
	MarketOrderWithPrice,
	#[error("limit price must be positive")]
	NonPositiveLimitPrice,
	#[error("price {price} above limit {limit}")]
	PriceAboveLimit { price: Price, limit: Price },
	#[error("quantity {quantity} above limit {limit}")]
	QuantityAboveLimit { quantity: Quantity, limit: Quantity },
	#[error("symbol order limit reached ({0} orders)")]
	SymbolOrderLimit(usize),
}

/// Structural validation, always applied regardless of the risk-check
/// switch: these inputs cannot be represented in a book at all.
pub fn validate_structure(order: &Order) -> Result<(), AdmissionError> {
	if order.symbol.is_empty() {
		return Err(AdmissionError::EmptySymbol);
	}
	if order.quantity == 0 {
		return Err(AdmissionError::ZeroQuantity);
	}
	match order.order_type {
		OrderType::Market => {
			if !order.price.is_zero() {
				return Err(AdmissionError::MarketOrderWithPrice);
			}
		}
		OrderType::Limit => {
			if order.price.is_zero() {
				return Err(AdmissionError::NonPositiveLimitPrice);
			}
		}
		OrderType::Stop | OrderType::StopLimit => {
			return Err(AdmissionError::UnsupportedOrderType);
		}
	}
	Ok(())
}

/// Limit checks, applied when risk checking is enabled.
///
/// `book_order_count` is the target book's current resting-order count.
pub fn validate_limits(
	order: &Order,
	limits: &RiskLimits,
	book_order_count: usize,
) -> Result<(), AdmissionError> {
	if order.price > limits.max_order_price {
		return Err(AdmissionError::PriceAboveLimit {
			price: order.price,
			limit: limits.max_order_price,
		});
	}
	if order.quantity > limits.max_order_quantity {
		return Err(AdmissionError::QuantityAboveLimit {
			quantity: order.quantity,
			limit: limits.max_order_quantity,
		});
	}
	if book_order_count >= limits.max_orders_per_symbol {
		return Err(AdmissionError::SymbolOrderLimit(book_order_count));
	}
	Ok(())
}
