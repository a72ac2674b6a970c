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

//! Ferrox gateway service entry point
//!
//! Starts the matching engine and the FIX acceptor, then runs until a
//! shutdown signal arrives. Configuration comes from the environment
//! (`GATEWAY_*` and `ENGINE_*` prefixes; `.env` supported).

use std::sync::Arc;

use anyhow::{Context, Result};
use ferrox_gateway::logging::init_logging;
use ferrox_gateway::{GatewayConfig, GatewayServer};
use ferrox_matching::{EngineConfig, MatchingEngine};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
	init_logging()?;

	let gateway_config = GatewayConfig::from_env().context("loading gateway configuration")?;
	let engine_config = EngineConfig::from_env().context("loading engine configuration")?;

	info!(
		port = gateway_config.listen_port,
		comp_id = %gateway_config.local_comp_id,
		"starting ferrox gateway"
	);

	let engine =
		Arc::new(MatchingEngine::start(engine_config).context("starting matching engine")?);
	let server = GatewayServer::new(gateway_config, engine.clone());

	tokio::select! {
		result = server.serve() => result?,
		_ = tokio::signal::ctrl_c() => {
			info!("shutdown signal received");
		}
	}

	info!(engine = %engine.statistics(), gateway = %server.stats(), "gateway stopped");
	Ok(())
}
