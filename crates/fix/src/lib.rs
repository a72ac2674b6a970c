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

//! FIX 4.2 wire codec and session layer.
//!
//! This crate is deliberately transport-free: [`FixDecoder`] turns a byte
//! stream into frames, [`FixMessage`] parses and serializes individual
//! messages, and [`FixSession`] is a sans-IO state machine that consumes
//! parsed messages plus clock ticks and returns the frames to send and the
//! application payloads to dispatch. The gateway owns the sockets.
//!
//! Canonical field separator is SOH (0x01). A `|`-separated parsing variant
//! exists for test fixtures only and never appears on the wire.

pub mod builder;
pub mod decoder;
pub mod error;
pub mod message;
pub mod session;
pub mod tags;

pub use builder::MessageBuilder;
pub use decoder::FixDecoder;
pub use error::FixError;
pub use message::{FixMessage, BEGIN_STRING_FIX42, SOH};
pub use session::{
	FixSession, SessionConfig, SessionError, SessionOutput, SessionState, SessionStats,
};
