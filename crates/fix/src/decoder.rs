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

use crate::error::FixError;
use crate::message::{FixMessage, SOH};

/// Default ceiling on a single frame; anything larger is a protocol error.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 64 * 1024;

/// Length of the `10=nnn<SOH>` trailer.
const TRAILER_LEN: usize = 7;

/// Streaming frame extractor for one connection.
///
/// The decoder owns the connection's partial-frame buffer. Bytes go in via
/// [`feed`](Self::feed); complete messages come out via
/// [`next_message`](Self::next_message). Message boundaries come from
/// BodyLength alone: a frame is `8=FIX.4.2<SOH>9=<len><SOH>` + `len` body
/// bytes + the 7-byte checksum trailer.
///
/// Any error is fatal for the connection; the caller is expected to
/// disconnect rather than resynchronize.
#[derive(Debug)]
pub struct FixDecoder {
	buf: Vec<u8>,
	max_frame: usize,
}

impl Default for FixDecoder {
	fn default() -> Self {
		Self::new(DEFAULT_MAX_FRAME_BYTES)
	}
}

impl FixDecoder {
	pub fn new(max_frame: usize) -> Self {
		Self {
			buf: Vec::new(),
			max_frame,
		}
	}

	/// Append received bytes to the framing buffer.
	pub fn feed(&mut self, bytes: &[u8]) {
		self.buf.extend_from_slice(bytes);
	}

	pub fn buffered(&self) -> usize {
		self.buf.len()
	}

	/// Try to extract one complete raw frame.
	///
	/// Returns `Ok(None)` when more bytes are needed.
	pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FixError> {
		if self.buf.is_empty() {
			return Ok(None);
		}

		// The frame must start with "8=". Anything else is garbage we do
		// not try to resynchronize past.
		if self.buf.len() >= 2 && &self.buf[..2] != b"8=" {
			return Err(FixError::MissingBeginString);
		}
		if self.buf.len() < 2 {
			return Ok(None);
		}

		// 8=<version><SOH>
		let begin_end = match find_soh(&self.buf, 2, 16) {
			Some(i) => i,
			None if self.buf.len() > 18 => return Err(FixError::MissingBeginString),
			None => return Ok(None),
		};

		// 9=<digits><SOH>
		let len_start = begin_end + 1;
		if self.buf.len() < len_start + 2 {
			return Ok(None);
		}
		if &self.buf[len_start..len_start + 2] != b"9=" {
			return Err(FixError::InvalidBodyLength(
				String::from_utf8_lossy(&self.buf[len_start..(len_start + 2).min(self.buf.len())])
					.into_owned(),
			));
		}
		let len_end = match find_soh(&self.buf, len_start + 2, 16) {
			Some(i) => i,
			None if self.buf.len() > len_start + 18 => {
				return Err(FixError::InvalidBodyLength(
					String::from_utf8_lossy(&self.buf[len_start..len_start + 18]).into_owned(),
				));
			}
			None => return Ok(None),
		};
		let len_str = &self.buf[len_start + 2..len_end];
		if len_str.is_empty() || !len_str.iter().all(|b| b.is_ascii_digit()) {
			return Err(FixError::InvalidBodyLength(
				String::from_utf8_lossy(len_str).into_owned(),
			));
		}
		let body_len: usize = std::str::from_utf8(len_str)
			.ok()
			.and_then(|s| s.parse().ok())
			.ok_or_else(|| {
				FixError::InvalidBodyLength(String::from_utf8_lossy(len_str).into_owned())
			})?;

		let total = len_end + 1 + body_len + TRAILER_LEN;
		if total > self.max_frame {
			return Err(FixError::FrameTooLarge(total));
		}
		if self.buf.len() < total {
			return Ok(None);
		}

		let trailer = &self.buf[total - TRAILER_LEN..total];
		if &trailer[..3] != b"10=" || trailer[6] != SOH {
			return Err(FixError::MalformedTrailer);
		}

		let frame: Vec<u8> = self.buf.drain(..total).collect();
		Ok(Some(frame))
	}

	/// Extract and parse the next complete message, verifying its checksum.
	pub fn next_message(&mut self) -> Result<Option<FixMessage>, FixError> {
		match self.next_frame()? {
			Some(frame) => FixMessage::parse(&frame).map(Some),
			None => Ok(None),
		}
	}
}

/// Find the next SOH at or after `start`, looking at most `window` bytes.
fn find_soh(buf: &[u8], start: usize, window: usize) -> Option<usize> {
	let end = buf.len().min(start + window);
	buf.get(start..end)?
		.iter()
		.position(|&b| b == SOH)
		.map(|i| start + i)
}
