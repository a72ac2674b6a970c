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

use std::time::Duration;

use serde::{Deserialize, Serialize};

// Logging configuration constants
/// Default log level (can be overridden by RUST_LOG)
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log directory component name
pub const LOG_COMPONENT_NAME: &str = "gateway";

/// Default console output (can be overridden by LOG_TO_CONSOLE)
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

// Server configuration constants
/// Default FIX listen port (can be overridden by GATEWAY_LISTEN_PORT)
pub const DEFAULT_LISTEN_PORT: u16 = 9878;

/// Default venue CompID (can be overridden by GATEWAY_LOCAL_COMP_ID)
pub const DEFAULT_LOCAL_COMP_ID: &str = "FERROX";

/// Default connection cap (can be overridden by GATEWAY_MAX_CONNECTIONS)
pub const DEFAULT_MAX_CONNECTIONS: usize = 1_000;

/// Default heartbeat interval in seconds, offered at Logon
pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Default ceiling on one FIX frame in bytes
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// Default per-connection execution-report queue depth
pub const DEFAULT_REPORT_QUEUE_CAPACITY: usize = 1_024;

/// Gateway service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
	/// TCP port the FIX acceptor listens on
	pub listen_port: u16,
	/// Our CompID (tag 49 outbound, tag 56 expected inbound)
	pub local_comp_id: String,
	pub max_connections: usize,
	/// Heartbeat interval offered at Logon; the peer's tag 108 wins
	pub heartbeat_interval_seconds: u64,
	pub max_frame_bytes: usize,
	pub report_queue_capacity: usize,
}

impl Default for GatewayConfig {
	fn default() -> Self {
		Self {
			listen_port: DEFAULT_LISTEN_PORT,
			local_comp_id: DEFAULT_LOCAL_COMP_ID.to_string(),
			max_connections: DEFAULT_MAX_CONNECTIONS,
			heartbeat_interval_seconds: DEFAULT_HEARTBEAT_INTERVAL_SECS,
			max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
			report_queue_capacity: DEFAULT_REPORT_QUEUE_CAPACITY,
		}
	}
}

impl GatewayConfig {
	/// Load configuration from environment variables (prefix `GATEWAY_`).
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Environment::with_prefix("GATEWAY").try_parsing(true))
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file, with environment overrides.
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("GATEWAY").try_parsing(true))
			.build()?;

		cfg.try_deserialize()
	}

	pub fn heartbeat_interval(&self) -> Duration {
		Duration::from_secs(self.heartbeat_interval_seconds)
	}
}
