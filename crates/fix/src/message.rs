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

use std::collections::BTreeMap;
use std::fmt;

use crate::error::FixError;
use crate::tags;

/// FIX field separator
pub const SOH: u8 = 0x01;

/// Protocol version spoken by this venue
pub const BEGIN_STRING_FIX42: &str = "FIX.4.2";

/// A parsed FIX message: an ordered mapping from tag to value.
///
/// The map holds body fields only. `8=BeginString`, `9=BodyLength` and
/// `10=CheckSum` are framing concerns: [`FixMessage::parse`] validates and
/// strips them, [`FixMessage::serialize`] recomputes them. This is what
/// makes `parse(serialize(m)) == m` hold structurally.
///
/// Serialization is canonical: `8`, `9`, `35`, remaining tags in ascending
/// numeric order, `10`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FixMessage {
	fields: BTreeMap<u32, String>,
}

impl FixMessage {
	/// Create an empty message with the given MsgType (tag 35).
	pub fn new(msg_type: &str) -> Self {
		let mut fields = BTreeMap::new();
		fields.insert(tags::MSG_TYPE, msg_type.to_string());
		Self { fields }
	}

	/// Set a field, replacing any existing value.
	pub fn set(&mut self, tag: u32, value: impl Into<String>) -> &mut Self {
		self.fields.insert(tag, value.into());
		self
	}

	/// Builder-style variant of [`set`](Self::set).
	pub fn with(mut self, tag: u32, value: impl Into<String>) -> Self {
		self.fields.insert(tag, value.into());
		self
	}

	pub fn get(&self, tag: u32) -> Option<&str> {
		self.fields.get(&tag).map(String::as_str)
	}

	pub fn has(&self, tag: u32) -> bool {
		self.fields.contains_key(&tag)
	}

	pub fn remove(&mut self, tag: u32) -> Option<String> {
		self.fields.remove(&tag)
	}

	/// Get a field parsed as an unsigned integer.
	pub fn get_u64(&self, tag: u32) -> Option<u64> {
		self.get(tag).and_then(|v| v.parse().ok())
	}

	/// Get a single-character field value.
	pub fn get_char(&self, tag: u32) -> Option<char> {
		self.get(tag).and_then(|v| {
			let mut chars = v.chars();
			match (chars.next(), chars.next()) {
				(Some(c), None) => Some(c),
				_ => None,
			}
		})
	}

	pub fn msg_type(&self) -> Option<&str> {
		self.get(tags::MSG_TYPE)
	}

	/// Whether this is a session-administration message.
	pub fn is_admin(&self) -> bool {
		self.msg_type().map(tags::is_admin).unwrap_or(false)
	}

	/// Number of body fields (excluding framing tags).
	pub fn field_count(&self) -> usize {
		self.fields.len()
	}

	/// Iterate over body fields in ascending tag order.
	pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
		self.fields.iter().map(|(t, v)| (*t, v.as_str()))
	}

	/// Validate presence of the header fields required on every inbound
	/// message: MsgType, SenderCompID, TargetCompID, MsgSeqNum, SendingTime.
	///
	/// BeginString, BodyLength and CheckSum were already enforced by parse.
	pub fn validate_header(&self) -> Result<(), FixError> {
		for tag in [
			tags::MSG_TYPE,
			tags::SENDER_COMP_ID,
			tags::TARGET_COMP_ID,
			tags::MSG_SEQ_NUM,
			tags::SENDING_TIME,
		] {
			if !self.has(tag) {
				return Err(FixError::MissingTag(tag));
			}
		}
		Ok(())
	}

	/// Parse a complete frame, verifying BeginString, BodyLength and
	/// CheckSum.
	pub fn parse(raw: &[u8]) -> Result<FixMessage, FixError> {
		Self::parse_inner(raw, SOH, true)
	}

	/// Parse without checksum verification. Intended for tests that build
	/// fixtures by hand.
	pub fn parse_unchecked(raw: &[u8]) -> Result<FixMessage, FixError> {
		Self::parse_inner(raw, SOH, false)
	}

	/// Parse with an alternate separator. This exists for `|`-delimited
	/// test fixtures only; the checksum is not verified because it is
	/// defined over SOH-delimited bytes. Never use this on wire input.
	pub fn parse_with_separator(raw: &[u8], separator: u8) -> Result<FixMessage, FixError> {
		Self::parse_inner(raw, separator, false)
	}

	fn parse_inner(raw: &[u8], separator: u8, verify_checksum: bool) -> Result<FixMessage, FixError> {
		let mut fields = BTreeMap::new();
		let mut order: Vec<u32> = Vec::new();
		let mut declared_checksum: Option<(usize, String)> = None;

		let mut pos = 0;
		while pos < raw.len() {
			let end = raw[pos..]
				.iter()
				.position(|&b| b == separator)
				.map(|i| pos + i)
				.ok_or_else(|| {
					FixError::MalformedField(String::from_utf8_lossy(&raw[pos..]).into_owned())
				})?;
			let field = &raw[pos..end];
			let eq = field.iter().position(|&b| b == b'=').ok_or_else(|| {
				FixError::MalformedField(String::from_utf8_lossy(field).into_owned())
			})?;
			let tag: u32 = std::str::from_utf8(&field[..eq])
				.ok()
				.and_then(|s| s.parse().ok())
				.ok_or_else(|| {
					FixError::MalformedField(String::from_utf8_lossy(field).into_owned())
				})?;
			let value = std::str::from_utf8(&field[eq + 1..])
				.map_err(|_| FixError::InvalidValue {
					tag,
					value: String::from_utf8_lossy(&field[eq + 1..]).into_owned(),
				})?
				.to_string();

			if tag == tags::CHECKSUM {
				declared_checksum = Some((pos, value));
			} else if fields.insert(tag, value).is_some() {
				return Err(FixError::DuplicateTag(tag));
			} else {
				order.push(tag);
			}
			pos = end + 1;

			if declared_checksum.is_some() {
				break;
			}
		}

		// Fixed first/last positions: 8, 9, 35 lead; 10 closes.
		if order.first() != Some(&tags::BEGIN_STRING) {
			return Err(FixError::MissingBeginString);
		}
		if order.get(1) != Some(&tags::BODY_LENGTH) {
			return Err(FixError::InvalidBodyLength(
				fields.get(&tags::BODY_LENGTH).cloned().unwrap_or_default(),
			));
		}
		if order.get(2) != Some(&tags::MSG_TYPE) {
			return Err(FixError::MissingTag(tags::MSG_TYPE));
		}
		let begin_string = fields.remove(&tags::BEGIN_STRING).unwrap_or_default();
		if begin_string != BEGIN_STRING_FIX42 {
			return Err(FixError::UnsupportedVersion(begin_string));
		}
		fields.remove(&tags::BODY_LENGTH);

		let (checksum_pos, declared) =
			declared_checksum.ok_or(FixError::MalformedTrailer)?;
		if verify_checksum {
			if declared.len() != 3 || !declared.bytes().all(|b| b.is_ascii_digit()) {
				return Err(FixError::MalformedTrailer);
			}
			let computed = checksum(&raw[..checksum_pos]);
			if declared.parse::<u32>().unwrap_or(u32::MAX) != computed as u32 {
				return Err(FixError::ChecksumMismatch { computed, declared });
			}
		}

		Ok(FixMessage { fields })
	}

	/// Serialize into canonical SOH-delimited bytes.
	///
	/// BodyLength covers everything after `9=...<SOH>` up to and including
	/// the SOH preceding `10=`; CheckSum is the byte sum of the whole
	/// prefix, mod 256, zero-padded to three digits.
	pub fn serialize(&self) -> Vec<u8> {
		let mut body = Vec::with_capacity(128);
		if let Some(mt) = self.get(tags::MSG_TYPE) {
			push_field(&mut body, tags::MSG_TYPE, mt);
		}
		for (tag, value) in self.iter() {
			if tag == tags::MSG_TYPE {
				continue;
			}
			push_field(&mut body, tag, value);
		}

		let mut out = Vec::with_capacity(body.len() + 32);
		push_field(&mut out, tags::BEGIN_STRING, BEGIN_STRING_FIX42);
		push_field(&mut out, tags::BODY_LENGTH, &body.len().to_string());
		out.extend_from_slice(&body);
		let cs = checksum(&out);
		push_field(&mut out, tags::CHECKSUM, &format!("{:03}", cs));
		out
	}
}

fn push_field(buf: &mut Vec<u8>, tag: u32, value: &str) {
	buf.extend_from_slice(tag.to_string().as_bytes());
	buf.push(b'=');
	buf.extend_from_slice(value.as_bytes());
	buf.push(SOH);
}

/// Byte sum mod 256 over the given prefix.
pub fn checksum(bytes: &[u8]) -> u8 {
	bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

impl fmt::Display for FixMessage {
	/// Human-readable form with `|` in place of SOH, for logs.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let raw = self.serialize();
		let printable: String = raw
			.iter()
			.map(|&b| if b == SOH { '|' } else { b as char })
			.collect();
		f.write_str(&printable)
	}
}
