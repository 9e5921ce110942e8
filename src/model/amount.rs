//! Amount type for monetary values read from spreadsheet cells.
//!
//! Amounts arrive either as numeric cells or as text that must parse as a number; anything else is
//! rejected. The value is kept as a finite `f64` from the cell all the way to the `REAL` column so
//! that nothing a spreadsheet can hold is truncated or rejected on the way.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::num::ParseFloatError;
use std::str::FromStr;

/// Represents a monetary amount.
///
/// JSON representation is a plain number, which is what the read endpoint returns.
///
/// # Examples
///
/// ```
/// # use monthly_finances::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str(" 1250.50 ").unwrap();
/// assert_eq!(amount.to_f64(), 1250.5);
///
/// let sci = Amount::from_str("1.5e3").unwrap();
/// assert_eq!(sci.to_f64(), 1500.0);
///
/// assert!(Amount::from_str("abc").is_err());
/// assert!(Amount::from_str("NaN").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Amount {
    value: f64,
}

impl Amount {
    /// Wraps a float, as stored in a numeric cell or the database. Returns `None` for NaN and
    /// infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        value.is_finite().then_some(Self { value })
    }

    /// The value as a float, used for storage and JSON output.
    pub fn to_f64(&self) -> f64 {
        self.value
    }

    /// Formats the amount with thousands separators and two decimal places, e.g. `-1,250.50`.
    /// Cents are rounded half away from zero. Values too large for a `Decimal` are formatted from
    /// the float directly.
    pub fn pretty(&self) -> String {
        let rounded = Decimal::from_f64(self.value)
            .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|d| d.to_f64())
            .unwrap_or(self.value);
        let (sign, num) = if rounded < 0.0 {
            ("-", -rounded)
        } else {
            ("", rounded)
        };
        format!("{sign}{}", format_num::format_num!(",.2", num))
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError {
    input: String,
    source: Option<ParseFloatError>,
}

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "AmountError({:?}, {:?})", self.input, self.source)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a number", self.input)
    }
}

impl Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn Error + 'static))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Accepts surrounding whitespace, a leading sign and scientific notation. Empty text, `NaN`
    /// and infinities are not amounts.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |source: Option<ParseFloatError>| AmountError {
            input: s.to_string(),
            source,
        };
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(err(None));
        }
        let value = f64::from_str(trimmed).map_err(|e| err(Some(e)))?;
        Amount::from_f64(value).ok_or_else(|| err(None))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.value, f)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.value)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let f = f64::deserialize(deserializer)?;
        Amount::from_f64(f)
            .ok_or_else(|| serde::de::Error::custom(format!("{f} is not a finite amount")))
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self {
            value: value as f64,
        }
    }
}
