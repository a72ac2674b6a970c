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

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Number of implied decimal places in a [`Price`].
pub const PRICE_DECIMALS: u32 = 4;

/// Tick scale: one currency unit equals this many ticks.
pub const PRICE_SCALE: u64 = 10_u64.pow(PRICE_DECIMALS);

/// Fixed-point price with four implied decimal places.
///
/// Wire prices are decimal strings with up to four fractional digits, so a
/// `u64` tick count represents every valid price exactly. Integer keys also
/// keep the order-book level map deterministic; there is no float anywhere
/// in the matching path.
///
/// A price of zero is the market-order convention and never a valid limit.
///
/// Serde uses the decimal-string form (`"100.25"`), matching the wire and
/// configuration encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(u64);

impl Serialize for Price {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for Price {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Price, D::Error> {
		deserializer.deserialize_any(PriceVisitor)
	}
}

/// Accepts `"100.25"`, `100.25` and `100`; configuration sources differ in
/// which form they hand over.
struct PriceVisitor;

impl de::Visitor<'_> for PriceVisitor {
	type Value = Price;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("a decimal price as a string or number")
	}

	fn visit_str<E: de::Error>(self, v: &str) -> Result<Price, E> {
		v.parse().map_err(de::Error::custom)
	}

	fn visit_u64<E: de::Error>(self, v: u64) -> Result<Price, E> {
		v.checked_mul(PRICE_SCALE)
			.map(Price)
			.ok_or_else(|| de::Error::custom(PriceParseError::Overflow))
	}

	fn visit_i64<E: de::Error>(self, v: i64) -> Result<Price, E> {
		u64::try_from(v)
			.map_err(|_| de::Error::custom("price may not be negative"))
			.and_then(|v| self.visit_u64(v))
	}

	fn visit_f64<E: de::Error>(self, v: f64) -> Result<Price, E> {
		if !(0.0..=(u64::MAX / PRICE_SCALE) as f64).contains(&v) {
			return Err(de::Error::custom(PriceParseError::Overflow));
		}
		Ok(Price((v * PRICE_SCALE as f64).round() as u64))
	}
}

impl Price {
	pub const ZERO: Price = Price(0);
	pub const MAX: Price = Price(u64::MAX);

	/// Construct from raw ticks (1 tick = 0.0001).
	pub const fn from_ticks(ticks: u64) -> Price {
		Price(ticks)
	}

	/// Construct from whole currency units.
	pub const fn from_units(units: u64) -> Price {
		Price(units * PRICE_SCALE)
	}

	pub const fn ticks(self) -> u64 {
		self.0
	}

	pub const fn is_zero(self) -> bool {
		self.0 == 0
	}

	/// Notional value of `quantity` at this price, in integer cents.
	///
	/// Saturates on overflow; the risk limits keep real inputs far below it.
	pub fn notional_cents(self, quantity: u64) -> u64 {
		self.0.saturating_mul(quantity) / (PRICE_SCALE / 100)
	}
}

/// Error parsing a decimal price string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceParseError {
	#[error("empty price")]
	Empty,
	#[error("invalid character in price: {0:?}")]
	InvalidChar(char),
	#[error("more than {PRICE_DECIMALS} fractional digits")]
	TooManyDecimals,
	#[error("price out of range")]
	Overflow,
}

impl FromStr for Price {
	type Err = PriceParseError;

	/// Parse a decimal string such as `"100"`, `"100.25"` or `"0.0001"`.
	fn from_str(s: &str) -> Result<Price, PriceParseError> {
		if s.is_empty() {
			return Err(PriceParseError::Empty);
		}
		let (int_part, frac_part) = match s.split_once('.') {
			Some((i, f)) => (i, f),
			None => (s, ""),
		};
		if int_part.is_empty() && frac_part.is_empty() {
			return Err(PriceParseError::Empty);
		}
		if frac_part.len() > PRICE_DECIMALS as usize {
			return Err(PriceParseError::TooManyDecimals);
		}

		let mut ticks: u64 = 0;
		for c in int_part.chars() {
			let digit = c.to_digit(10).ok_or(PriceParseError::InvalidChar(c))? as u64;
			ticks = ticks
				.checked_mul(10)
				.and_then(|t| t.checked_add(digit))
				.ok_or(PriceParseError::Overflow)?;
		}
		ticks = ticks.checked_mul(PRICE_SCALE).ok_or(PriceParseError::Overflow)?;

		let mut frac: u64 = 0;
		for c in frac_part.chars() {
			let digit = c.to_digit(10).ok_or(PriceParseError::InvalidChar(c))? as u64;
			frac = frac * 10 + digit;
		}
		// Scale e.g. "25" after the point up to 2500 ticks
		frac *= 10_u64.pow(PRICE_DECIMALS - frac_part.len() as u32);

		ticks.checked_add(frac).map(Price).ok_or(PriceParseError::Overflow)
	}
}

impl fmt::Display for Price {
	/// Formats as a minimal decimal string: `"100"`, `"100.25"`, `"0.0001"`.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let units = self.0 / PRICE_SCALE;
		let frac = self.0 % PRICE_SCALE;
		if frac == 0 {
			return write!(f, "{}", units);
		}
		let mut frac_str = format!("{:04}", frac);
		while frac_str.ends_with('0') {
			frac_str.pop();
		}
		write!(f, "{}.{}", units, frac_str)
	}
}
