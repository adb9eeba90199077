//! Price range filter in minor currency units.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound of the default (inactive) price range, in minor units.
pub const DEFAULT_MAX_PRICE: u64 = 100_000_000;

/// Errors that can occur when parsing a [`PriceRange`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceRangeError {
    /// The input is not of the form `min-max`.
    #[error("price range must look like `min-max`")]
    MissingSeparator,
    /// One of the bounds is not a non-negative integer.
    #[error("invalid price bound: {0}")]
    InvalidBound(String),
    /// The lower bound is above the upper bound.
    #[error("minimum price {min} is greater than maximum price {max}")]
    Inverted {
        /// Requested lower bound.
        min: u64,
        /// Requested upper bound.
        max: u64,
    },
}

/// Inclusive price range, in minor currency units (e.g. cents).
///
/// The default range `0..=DEFAULT_MAX_PRICE` means "no price filter".
///
/// ```
/// use bazaar_core::PriceRange;
///
/// let range = PriceRange::parse("1000-5000").unwrap();
/// assert_eq!(range.min, 1000);
/// assert!(range.is_active());
/// assert!(!PriceRange::default().is_active());
/// assert!(PriceRange::parse("9-1").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceRange {
    /// Inclusive lower bound.
    pub min: u64,
    /// Inclusive upper bound.
    pub max: u64,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0,
            max: DEFAULT_MAX_PRICE,
        }
    }
}

impl PriceRange {
    /// Create a price range.
    ///
    /// # Errors
    ///
    /// Returns [`PriceRangeError::Inverted`] if `min > max`.
    pub const fn new(min: u64, max: u64) -> Result<Self, PriceRangeError> {
        if min > max {
            return Err(PriceRangeError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    /// Parse a `min-max` string. Either side may be empty to keep its default.
    ///
    /// # Errors
    ///
    /// Returns an error if the separator is missing, a bound is not a number,
    /// or the bounds are inverted.
    pub fn parse(s: &str) -> Result<Self, PriceRangeError> {
        let (min, max) = s
            .trim()
            .split_once('-')
            .ok_or(PriceRangeError::MissingSeparator)?;

        let default = Self::default();
        let min = parse_bound(min, default.min)?;
        let max = parse_bound(max, default.max)?;
        Self::new(min, max)
    }

    /// Whether this range narrows the result set.
    #[must_use]
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }

    /// Whether `price` falls inside the range.
    #[must_use]
    pub const fn contains(&self, price: u64) -> bool {
        price >= self.min && price <= self.max
    }
}

fn parse_bound(s: &str, default: u64) -> Result<u64, PriceRangeError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(default);
    }
    s.parse()
        .map_err(|_| PriceRangeError::InvalidBound(s.to_string()))
}

impl fmt::Display for PriceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

impl std::str::FromStr for PriceRange {
    type Err = PriceRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
