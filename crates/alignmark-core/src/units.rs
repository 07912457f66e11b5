use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// A length unit. All conversions are normalized through nanometers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Unit {
    Inch,
    Millimeter,
    Micrometer,
    Nanometer,
}

impl Unit {
    pub const ALL: [Unit; 4] = [Unit::Inch, Unit::Millimeter, Unit::Micrometer, Unit::Nanometer];

    /// Nanometers per one of this unit.
    pub fn nm_per_unit(self) -> f64 {
        match self {
            Unit::Inch => 25.4e6,
            Unit::Millimeter => 1e6,
            Unit::Micrometer => 1e3,
            Unit::Nanometer => 1.0,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Inch => "in",
            Unit::Millimeter => "mm",
            Unit::Micrometer => "um",
            Unit::Nanometer => "nm",
        }
    }

    /// Convert `value` expressed in `self` into `to`.
    pub fn convert(self, value: f64, to: Unit) -> f64 {
        value * self.nm_per_unit() / to.nm_per_unit()
    }
}

impl FromStr for Unit {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" | "inch" | "inches" => Ok(Unit::Inch),
            "mm" | "millimeter" | "millimeters" => Ok(Unit::Millimeter),
            "um" | "µm" | "micrometer" | "micrometers" | "micron" | "microns" => {
                Ok(Unit::Micrometer)
            }
            "nm" | "nanometer" | "nanometers" => Ok(Unit::Nanometer),
            _ => Err(LayoutError::UnsupportedUnit(s.to_string())),
        }
    }
}

impl TryFrom<String> for Unit {
    type Error = LayoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.symbol().to_string()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Convert a length between units given by name (case-insensitive).
pub fn convert(value: f64, from_unit: &str, to_unit: &str) -> Result<f64, LayoutError> {
    let from: Unit = from_unit.parse()?;
    let to: Unit = to_unit.parse()?;
    Ok(from.convert(value, to))
}

/// A scalar length with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Length {
    pub value: f64,
    pub unit: Unit,
}

impl Length {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn to(&self, unit: Unit) -> f64 {
        self.unit.convert(self.value, unit)
    }

    pub fn to_nm(&self) -> f64 {
        self.to(Unit::Nanometer)
    }

    /// Length in integer database units of `dbu_nm` nanometers each, rounded to nearest.
    pub fn to_dbu(&self, dbu_nm: f64) -> i64 {
        (self.to_nm() / dbu_nm).round() as i64
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_conversions() {
        assert_eq!(convert(1.0, "mm", "nm").unwrap(), 1_000_000.0);
        assert_relative_eq!(convert(1.0, "in", "um").unwrap(), 25_400.0, max_relative = 1e-12);
        assert_relative_eq!(convert(76.2, "mm", "in").unwrap(), 3.0, max_relative = 1e-12);
    }

    #[test]
    fn test_round_trip_all_pairs() {
        for &a in &Unit::ALL {
            for &b in &Unit::ALL {
                for &v in &[1e-3, 0.5, 1.0, 15.0, 76.2, 53_881.7] {
                    let there = a.convert(v, b);
                    let back = b.convert(there, a);
                    assert_relative_eq!(back, v, max_relative = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_unit_names_case_insensitive() {
        assert_eq!("MM".parse::<Unit>().unwrap(), Unit::Millimeter);
        assert_eq!("µm".parse::<Unit>().unwrap(), Unit::Micrometer);
        assert_eq!("Inch".parse::<Unit>().unwrap(), Unit::Inch);
        assert_eq!(" nm ".parse::<Unit>().unwrap(), Unit::Nanometer);
    }

    #[test]
    fn test_unsupported_unit() {
        let err = convert(1.0, "furlong", "nm").unwrap_err();
        assert_eq!(err, LayoutError::UnsupportedUnit("furlong".into()));
        assert!(convert(1.0, "nm", "pc").is_err());
    }

    #[test]
    fn test_length_serde() {
        let len: Length = serde_json::from_str(r#"{"value": 15, "unit": "um"}"#).unwrap();
        assert_eq!(len, Length::new(15.0, Unit::Micrometer));
        assert_eq!(len.to_dbu(1.0), 15_000);
        assert!(serde_json::from_str::<Length>(r#"{"value": 1, "unit": "ft"}"#).is_err());
    }
}
