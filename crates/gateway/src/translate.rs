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

//! Translation between application FIX messages and engine domain types.
//!
//! Parse failures carry the failing field in the error text; the caller
//! turns them into application-level rejects (ExecutionReport with
//! OrdStatus=8), never into session errors.

use ferrox_fix::builder::utc_timestamp_now;
use ferrox_fix::{tags, FixMessage};
use ferrox_matching::{ExecutionReport, OrderRequest};
use ferrox_sdk::{OrderType, Price, Side, TimeInForce};
use thiserror::Error;

/// Error types for application-message translation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
	#[error("missing required tag {0}")]
	MissingTag(u32),
	#[error("invalid value for tag {tag}: {value}")]
	InvalidField { tag: u32, value: String },
}

fn required<'a>(msg: &'a FixMessage, tag: u32) -> Result<&'a str, TranslateError> {
	msg.get(tag).ok_or(TranslateError::MissingTag(tag))
}

fn invalid(tag: u32, value: &str) -> TranslateError {
	TranslateError::InvalidField {
		tag,
		value: value.to_string(),
	}
}

/// A parsed NewOrderSingle (35=D)
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
	pub cl_ord_id: String,
	pub request: OrderRequest,
}

/// Translate a NewOrderSingle into an engine order request.
///
/// Required: 11 ClOrdID, 55 Symbol, 54 Side, 38 OrderQty, 40 OrdType;
/// 44 Price for limit orders. Optional: 59 TimeInForce (default Day).
pub fn parse_new_order_single(
	msg: &FixMessage,
	client_id: &str,
) -> Result<NewOrder, TranslateError> {
	let cl_ord_id = required(msg, tags::CL_ORD_ID)?.to_string();
	let symbol = required(msg, tags::SYMBOL)?.to_string();

	let side_value = required(msg, tags::SIDE)?;
	let side = single_char(side_value)
		.and_then(Side::from_fix)
		.ok_or_else(|| invalid(tags::SIDE, side_value))?;

	let qty_value = required(msg, tags::ORDER_QTY)?;
	let quantity: u64 = qty_value
		.parse()
		.map_err(|_| invalid(tags::ORDER_QTY, qty_value))?;

	let type_value = required(msg, tags::ORD_TYPE)?;
	let order_type = single_char(type_value)
		.and_then(OrderType::from_fix)
		.ok_or_else(|| invalid(tags::ORD_TYPE, type_value))?;

	let price = match order_type {
		OrderType::Limit => {
			let price_value = required(msg, tags::PRICE)?;
			price_value
				.parse::<Price>()
				.map_err(|_| invalid(tags::PRICE, price_value))?
		}
		// Market orders carry no price; Stop/StopLimit are rejected by
		// engine admission with a precise reason
		_ => Price::ZERO,
	};

	let time_in_force = match msg.get(tags::TIME_IN_FORCE) {
		Some(value) => single_char(value)
			.and_then(TimeInForce::from_fix)
			.ok_or_else(|| invalid(tags::TIME_IN_FORCE, value))?,
		None => TimeInForce::Day,
	};

	Ok(NewOrder {
		cl_ord_id,
		request: OrderRequest {
			client_id: client_id.to_string(),
			symbol,
			side,
			order_type,
			price,
			quantity,
			time_in_force,
		},
	})
}

/// A parsed OrderCancelRequest (35=F)
#[derive(Debug, Clone)]
pub struct CancelRequest {
	pub orig_cl_ord_id: String,
	pub cl_ord_id: String,
	pub symbol: String,
	pub side: Side,
}

/// Translate an OrderCancelRequest. Required: 41 OrigClOrdID, 11 ClOrdID,
/// 55 Symbol, 54 Side.
pub fn parse_cancel_request(msg: &FixMessage) -> Result<CancelRequest, TranslateError> {
	let orig_cl_ord_id = required(msg, tags::ORIG_CL_ORD_ID)?.to_string();
	let cl_ord_id = required(msg, tags::CL_ORD_ID)?.to_string();
	let symbol = required(msg, tags::SYMBOL)?.to_string();
	let side_value = required(msg, tags::SIDE)?;
	let side = single_char(side_value)
		.and_then(Side::from_fix)
		.ok_or_else(|| invalid(tags::SIDE, side_value))?;

	Ok(CancelRequest {
		orig_cl_ord_id,
		cl_ord_id,
		symbol,
		side,
	})
}

/// Render an engine execution report as a FIX ExecutionReport (35=8).
///
/// ExecType (150) and OrdStatus (39) both map from the order status; fill
/// reports add LastQty/LastPx, rejects and cancels add Text.
pub fn execution_report_to_fix(
	report: &ExecutionReport,
	cl_ord_id: &str,
	exec_id: &str,
) -> FixMessage {
	let status = report.status.to_fix().to_string();
	let mut msg = FixMessage::new(tags::msg_type::EXECUTION_REPORT)
		.with(tags::ORDER_ID, report.order_id.to_string())
		.with(tags::CL_ORD_ID, cl_ord_id)
		.with(tags::EXEC_ID, exec_id)
		.with(tags::EXEC_TYPE, status.clone())
		.with(tags::ORD_STATUS, status)
		.with(tags::SYMBOL, report.symbol.clone())
		.with(tags::SIDE, report.side.to_fix().to_string())
		.with(tags::ORDER_QTY, report.quantity.to_string())
		.with(tags::LEAVES_QTY, report.remaining.to_string())
		.with(tags::CUM_QTY, report.cumulative_quantity().to_string())
		.with(tags::TRANSACT_TIME, utc_timestamp_now());

	if let (Some(price), Some(quantity)) = (report.last_price, report.last_quantity) {
		msg.set(tags::LAST_PX, price.to_string());
		msg.set(tags::LAST_QTY, quantity.to_string());
	}
	if let Some(reason) = &report.reason {
		msg.set(tags::TEXT, reason.clone());
	}
	msg
}

/// Application-level reject for a message that never reached the engine.
pub fn application_reject(
	cl_ord_id: &str,
	symbol: Option<&str>,
	exec_id: &str,
	reason: &str,
) -> FixMessage {
	let mut msg = FixMessage::new(tags::msg_type::EXECUTION_REPORT)
		.with(tags::ORDER_ID, "0")
		.with(tags::CL_ORD_ID, cl_ord_id)
		.with(tags::EXEC_ID, exec_id)
		.with(tags::EXEC_TYPE, "8")
		.with(tags::ORD_STATUS, "8")
		.with(tags::LEAVES_QTY, "0")
		.with(tags::CUM_QTY, "0")
		.with(tags::TEXT, reason)
		.with(tags::TRANSACT_TIME, utc_timestamp_now());
	if let Some(symbol) = symbol {
		msg.set(tags::SYMBOL, symbol);
	}
	msg
}

fn single_char(value: &str) -> Option<char> {
	let mut chars = value.chars();
	match (chars.next(), chars.next()) {
		(Some(c), None) => Some(c),
		_ => None,
	}
}
