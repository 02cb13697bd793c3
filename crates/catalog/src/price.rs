use std::{
    fmt,
    ops::{Add, Neg, Sub},
    str::FromStr,
};

use thiserror::Error;

/// Errors raised while reading a price out of catalog text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("empty price")]
    Empty,
    #[error("invalid price: {0}")]
    Invalid(String),
    #[error("price too large: {0}")]
    Overflow(String),
}

/// Price represented as **integer kopecks** (minor units of BYN).
///
/// Catalog pages render prices as free text (`"1 299,00 р."`), so parsing
/// keeps only digits and the decimal separator before converting.
///
/// ```rust
/// use catalog::Price;
///
/// let price: Price = "1 299,50 р.".parse().unwrap();
/// assert_eq!(price.minor(), 129_950);
/// assert_eq!(price.to_string(), "1299.50");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Price(i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Creates a price from kopecks.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in kopecks.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn abs(self) -> Price {
        Price(self.0.abs())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for Price {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Price> for i64 {
    fn from(value: Price) -> Self {
        value.0
    }
}

impl Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Self::Output {
        Price(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Price;

    fn sub(self, rhs: Price) -> Self::Output {
        Price(self.0 - rhs.0)
    }
}

impl Neg for Price {
    type Output = Price;

    fn neg(self) -> Self::Output {
        Price(-self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    /// Parses catalog text into kopecks.
    ///
    /// Everything except digits, `,` and `.` is dropped first, so currency
    /// suffixes and thousands spaces are ignored. `,` and `.` are both
    /// accepted as decimal separator; at most 2 fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PriceError::Invalid(s.trim().to_string());
        let overflow = || PriceError::Overflow(s.trim().to_string());

        let kept: String = s
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
            .map(|c| if c == ',' { '.' } else { c })
            .collect();
        let kept = kept.trim_matches('.');
        if kept.is_empty() {
            return Err(PriceError::Empty);
        }

        let (units, fraction) = match kept.split_once('.') {
            Some((units, fraction)) => (units, fraction),
            None => (kept, ""),
        };
        if units.is_empty() || fraction.contains('.') || fraction.len() > 2 {
            return Err(invalid());
        }

        let units: i64 = units.parse().map_err(|_| overflow())?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => fraction.parse().map_err(|_| invalid())?,
        };

        units
            .checked_mul(100)
            .and_then(|v| v.checked_add(fraction))
            .map(Price)
            .ok_or_else(overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Price::new(0).to_string(), "0.00");
        assert_eq!(Price::new(5).to_string(), "0.05");
        assert_eq!(Price::new(129_950).to_string(), "1299.50");
        assert_eq!(Price::new(-150).to_string(), "-1.50");
    }

    #[test]
    fn parse_ignores_currency_and_spaces() {
        assert_eq!("1 299,00 р.".parse::<Price>().unwrap().minor(), 129_900);
        assert_eq!("45,5".parse::<Price>().unwrap().minor(), 4_550);
        assert_eq!("от 812.07 р.".parse::<Price>().unwrap().minor(), 81_207);
        assert_eq!("17".parse::<Price>().unwrap().minor(), 1_700);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!("нет в наличии".parse::<Price>(), Err(PriceError::Empty));
        assert!("1,2,3".parse::<Price>().is_err());
        assert!("12.345".parse::<Price>().is_err());
    }
}
