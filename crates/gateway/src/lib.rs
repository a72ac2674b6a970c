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

//! Ferrox FIX Gateway
//!
//! The gateway bridges the TCP transport to the matching engine. Each
//! accepted connection gets its own task owning the socket, a framing
//! decoder and a FIX session; application messages are translated into
//! engine commands, and execution reports are routed back through the
//! originating session.
//!
//! The gateway understands CompID identity only: a client is whatever the
//! peer CompID of its authenticated session says. Business-level identity
//! never enters this layer.

pub mod config;
pub mod connection;
pub mod logging;
pub mod routing;
pub mod server;
pub mod stats;
pub mod translate;

pub use config::GatewayConfig;
pub use routing::{ConnectionId, RouteDecision, RouteTable};
pub use server::GatewayServer;
pub use stats::GatewayStats;
