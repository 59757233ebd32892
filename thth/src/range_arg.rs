//! Curvature search range argument.
//!
//! A clap-compatible `low:high` pair in seconds cubed, validated at parse
//! time so a search is never started on an empty or inverted range.

use std::fmt;
use std::str::FromStr;

use crate::units::Curvature;

/// Parse `"low:high"` into a validated curvature range in seconds cubed.
///
/// # Validation Rules
/// - Both values must parse as finite numbers
/// - `low` must be positive (the theta-theta map is undefined at `eta <= 0`)
/// - `high` must be strictly greater than `low`
///
/// # Examples
/// - Valid: "0.005:0.02", "1e-3:5e-3"
/// - Invalid: "0.01" (missing bound), "0:0.01" (non-positive low),
///   "0.02:0.01" (inverted)
pub fn parse_eta_range(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err("Curvature range must be in format 'low:high'".to_string());
    }

    let low = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid low value".to_string())?;
    let high = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid high value".to_string())?;

    if !low.is_finite() || !high.is_finite() {
        return Err("Curvature bounds must be finite".to_string());
    }
    if low <= 0.0 {
        return Err(format!("Low curvature must be positive, got {low}"));
    }
    if high <= low {
        return Err(format!("High curvature ({high}) must exceed low ({low})"));
    }

    Ok((low, high))
}

/// Curvature range for a search, `low:high` in seconds cubed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EtaRangeArg(pub Curvature, pub Curvature);

impl FromStr for EtaRangeArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (low, high) = parse_eta_range(s)?;
        Ok(EtaRangeArg(
            Curvature::from_seconds_cubed(low),
            Curvature::from_seconds_cubed(high),
        ))
    }
}

impl fmt::Display for EtaRangeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.0.as_seconds_cubed(),
            self.1.as_seconds_cubed()
        )
    }
}

impl EtaRangeArg {
    pub fn low(&self) -> Curvature {
        self.0
    }

    pub fn high(&self) -> Curvature {
        self.1
    }

    /// Geometric midpoint, used as the reference curvature for arc-length edges
    pub fn midpoint(&self) -> Curvature {
        Curvature::from_seconds_cubed((self.0.as_seconds_cubed() * self.1.as_seconds_cubed()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eta_range_parsing() {
        assert_eq!(parse_eta_range("0.005:0.02").unwrap(), (0.005, 0.02));
        assert_eq!(parse_eta_range(" 1e-3 : 5e-3 ").unwrap(), (1e-3, 5e-3));

        assert!(parse_eta_range("0.01").is_err()); // Missing bound
        assert!(parse_eta_range("0.01:0.02:0.03").is_err()); // Too many parts
        assert!(parse_eta_range("abc:0.02").is_err());
        assert!(parse_eta_range("0.01:abc").is_err());
        assert!(parse_eta_range("0:0.02").is_err()); // Non-positive low
        assert!(parse_eta_range("-0.01:0.02").is_err());
        assert!(parse_eta_range("0.02:0.01").is_err()); // Inverted
        assert!(parse_eta_range("0.01:0.01").is_err()); // Empty
        assert!(parse_eta_range("0.01:inf").is_err());
    }

    #[test]
    fn test_eta_range_arg_methods() {
        let range: EtaRangeArg = "0.01:0.04".parse().unwrap();
        assert_eq!(range.low().as_seconds_cubed(), 0.01);
        assert_eq!(range.high().as_seconds_cubed(), 0.04);
        assert!((range.midpoint().as_seconds_cubed() - 0.02).abs() < 1e-15);
        assert_eq!(range.to_string(), "0.01:0.04");
    }

    #[test]
    fn test_eta_range_arg_error_message() {
        let err = "0.05:0.01".parse::<EtaRangeArg>().unwrap_err();
        assert!(err.contains("High curvature (0.01) must exceed low (0.05)"));
    }
}
