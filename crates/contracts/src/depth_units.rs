//! DepthUnits - scale factor from raw depth counts to meters

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::ContractError;

/// Meters per raw depth count.
///
/// Always finite and strictly positive; the only way to build one is through
/// [`DepthUnits::new`], which rejects anything else.
///
/// # Examples
/// ```
/// use contracts::DepthUnits;
///
/// let units = DepthUnits::new(0.0001).unwrap();
/// assert_eq!(units.get(), 0.0001);
/// assert!(DepthUnits::new(0.0).is_err());
/// assert!(DepthUnits::new(f32::NAN).is_err());
/// ```
#[derive(Clone, Copy, PartialEq, PartialOrd)]
pub struct DepthUnits(f32);

impl DepthUnits {
    /// One millimeter per count. Used when no other source yields a valid value:
    /// a slightly wrong scale is better than a black depth image.
    pub const DEFAULT: DepthUnits = DepthUnits(0.001);

    /// Validate and wrap a raw scale value.
    #[inline]
    pub fn new(value: f32) -> Result<Self, ContractError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(ContractError::InvalidDepthUnits { value })
        }
    }

    /// Get the underlying value.
    #[inline]
    pub fn get(self) -> f32 {
        self.0
    }

    /// Convert a raw depth count to meters.
    #[inline]
    pub fn to_meters(self, raw: u16) -> f32 {
        f32::from(raw) * self.0
    }
}

impl Default for DepthUnits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f32> for DepthUnits {
    type Error = ContractError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DepthUnits> for f32 {
    fn from(units: DepthUnits) -> Self {
        units.0
    }
}

impl fmt::Display for DepthUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for DepthUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DepthUnits({})", self.0)
    }
}

impl Serialize for DepthUnits {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f32(self.0)
    }
}

impl<'de> Deserialize<'de> for DepthUnits {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f32::deserialize(deserializer)?;
        Self::new(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_one_millimeter() {
        assert_eq!(DepthUnits::DEFAULT.get(), 0.001);
        assert_eq!(DepthUnits::default(), DepthUnits::DEFAULT);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for value in [0.0, -0.001, f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(DepthUnits::new(value).is_err(), "accepted {value}");
        }
    }

    #[test]
    fn test_to_meters() {
        let units = DepthUnits::new(0.001).unwrap();
        assert!((units.to_meters(1500) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_serde_validates() {
        let units: DepthUnits = serde_json::from_str("0.0001").unwrap();
        assert_eq!(units.get(), 0.0001);
        assert!(serde_json::from_str::<DepthUnits>("-1.0").is_err());
        assert_eq!(serde_json::to_string(&DepthUnits::DEFAULT).unwrap(), "0.001");
    }
}
