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

use thiserror::Error;

/// Error types for FIX framing and parsing
///
/// These never escape the session layer as panics; the gateway maps them to
/// a session-level Reject or a disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixError {
	#[error("buffer does not start with BeginString")]
	MissingBeginString,
	#[error("unsupported BeginString: {0}")]
	UnsupportedVersion(String),
	#[error("malformed field: {0}")]
	MalformedField(String),
	#[error("invalid BodyLength: {0}")]
	InvalidBodyLength(String),
	#[error("frame of {0} bytes exceeds maximum")]
	FrameTooLarge(usize),
	#[error("malformed trailer (expected 10=nnn<SOH>)")]
	MalformedTrailer,
	#[error("checksum mismatch: computed {computed:03}, declared {declared}")]
	ChecksumMismatch { computed: u8, declared: String },
	#[error("duplicate tag {0}")]
	DuplicateTag(u32),
	#[error("missing required tag {0}")]
	MissingTag(u32),
	#[error("invalid value for tag {tag}: {value:?}")]
	InvalidValue { tag: u32, value: String },
}
