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

use std::str::FromStr;

use ferrox_sdk::Price;
use serde::{Deserialize, Serialize};

use crate::risk::RiskLimits;

/// Matching mode
///
/// Only `Continuous` is implemented; the other variants parse so that a
/// configuration naming them fails loudly at engine start rather than at
/// deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingMode {
	Continuous,
	Auction,
	CallAuction,
}

impl FromStr for MatchingMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"continuous" => Ok(MatchingMode::Continuous),
			"auction" => Ok(MatchingMode::Auction),
			"call_auction" | "callauction" => Ok(MatchingMode::CallAuction),
			other => Err(format!("unknown matching mode: {}", other)),
		}
	}
}

/// Matching engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
	pub matching_mode: MatchingMode,
	pub enable_risk_check: bool,
	pub enable_market_data_callbacks: bool,
	/// Per-command processing budget; exceeding it raises the error
	/// callback but does not abort the command
	pub max_processing_time_us: u64,
	pub command_queue_capacity: usize,
	pub max_order_price: Price,
	pub max_order_quantity: u64,
	pub max_orders_per_symbol: usize,
}

impl Default for EngineConfig {
	fn default() -> Self {
		let limits = RiskLimits::default();
		Self {
			matching_mode: MatchingMode::Continuous,
			enable_risk_check: true,
			enable_market_data_callbacks: true,
			max_processing_time_us: 1_000,
			command_queue_capacity: 4_096,
			max_order_price: limits.max_order_price,
			max_order_quantity: limits.max_order_quantity,
			max_orders_per_symbol: limits.max_orders_per_symbol,
		}
	}
}

impl EngineConfig {
	/// Load configuration from environment variables (prefix `ENGINE_`).
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Environment::with_prefix("ENGINE").try_parsing(true))
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file, with environment overrides.
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("ENGINE").try_parsing(true))
			.build()?;

		cfg.try_deserialize()
	}

	pub fn risk_limits(&self) -> RiskLimits {
		RiskLimits {
			max_order_price: self.max_order_price,
			max_order_quantity: self.max_order_quantity,
			max_orders_per_symbol: self.max_orders_per_symbol,
		}
	}
}
