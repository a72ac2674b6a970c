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

//! Ferrox Matching Engine
//!
//! This crate owns the venue's order books and the single-threaded
//! matching loop that mutates them. Orders arrive as commands on a bounded
//! MPSC queue; trades and order state changes leave as execution-report
//! callbacks.
//!
//! Architecture:
//! - One order book per symbol, created lazily, alive for the process
//! - A dedicated matching thread drains the command queue; all book
//!   mutations happen there
//! - Read-only market-data queries take per-book read locks
//! - Continuous price-time priority matching; trades always print at the
//!   resting order's price
//! - Callbacks are buffered during the book critical section and flushed
//!   after the lock is released

pub mod config;
pub mod engine;
pub mod orderbook;
pub mod queue;
pub mod risk;
pub mod types;

pub use config::{EngineConfig, MatchingMode};
pub use engine::{
	EngineError, ErrorCallback, ExecutionCallback, MarketDataCallback, MatchingEngine,
};
pub use engine::stats::{EngineStatistics, StatsSnapshot};
pub use orderbook::OrderBook;
pub use queue::{CommandQueue, CommandReceiver, CommandSender, EngineCommand, QueueError};
pub use risk::RiskLimits;
pub use types::{ExecutionReport, MarketDataSnapshot, Order, OrderRequest};
