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

//! Shared domain vocabulary for the Ferrox matching core.
//!
//! This crate defines the types every other crate agrees on: order
//! identifiers, sides, order types, statuses, time-in-force, the
//! fixed-point price representation and the immutable trade record.
//! It carries no behavior beyond conversions and validation.

pub mod price;
pub mod types;

pub use price::{Price, PriceParseError};
pub use types::{
	ClientId, OrderId, OrderStatus, OrderType, Quantity, Side, Symbol, TimeInForce, Trade,
};
