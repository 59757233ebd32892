//! Type-safe physical units for scintillation analysis
//!
//! Time and frequency axes are carried as `uom` quantities. Curvature has
//! no named SI quantity (it is a time cubed), so it gets a small newtype.
//!
//! Core numeric routines work on plain `f64` axes in fixed working units:
//! delay (tau) in microseconds, Doppler frequency (fd) and theta in
//! millihertz. With those units a curvature in us/mHz^2 is numerically
//! equal to seconds cubed.

use std::fmt;
use uom::si::f64::{Frequency as UomFrequency, Time as UomTime};
use uom::si::frequency::{hertz, megahertz, millihertz};
use uom::si::time::{microsecond, minute, second};

/// Type alias for time measurements
pub type Time = UomTime;

/// Type alias for frequency measurements
pub type Frequency = UomFrequency;

/// Extension trait for the time units used by dynamic spectra
pub trait TimeExt {
    /// Create time from seconds
    fn from_seconds(s: f64) -> Self;

    /// Get time in seconds
    fn as_seconds(&self) -> f64;

    /// Create time from microseconds (delays)
    fn from_microseconds(us: f64) -> Self;

    /// Get time in microseconds
    fn as_microseconds(&self) -> f64;

    /// Get time in minutes (display only)
    fn as_minutes(&self) -> f64;
}

/// Extension trait for the frequency units used by dynamic spectra
pub trait FrequencyExt {
    /// Create frequency from hertz
    fn from_hertz(hz: f64) -> Self;

    /// Get frequency in hertz
    fn as_hertz(&self) -> f64;

    /// Create frequency from megahertz (observing frequencies)
    fn from_megahertz(mhz: f64) -> Self;

    /// Get frequency in megahertz
    fn as_megahertz(&self) -> f64;

    /// Create frequency from millihertz (Doppler frequencies)
    fn from_millihertz(mhz: f64) -> Self;

    /// Get frequency in millihertz
    fn as_millihertz(&self) -> f64;
}

impl TimeExt for Time {
    fn from_seconds(s: f64) -> Self {
        Time::new::<second>(s)
    }

    fn as_seconds(&self) -> f64 {
        self.get::<second>()
    }

    fn from_microseconds(us: f64) -> Self {
        Time::new::<microsecond>(us)
    }

    fn as_microseconds(&self) -> f64 {
        self.get::<microsecond>()
    }

    fn as_minutes(&self) -> f64 {
        self.get::<minute>()
    }
}

impl FrequencyExt for Frequency {
    fn from_hertz(hz: f64) -> Self {
        Frequency::new::<hertz>(hz)
    }

    fn as_hertz(&self) -> f64 {
        self.get::<hertz>()
    }

    fn from_megahertz(mhz: f64) -> Self {
        Frequency::new::<megahertz>(mhz)
    }

    fn as_megahertz(&self) -> f64 {
        self.get::<megahertz>()
    }

    fn from_millihertz(mhz: f64) -> Self {
        Frequency::new::<millihertz>(mhz)
    }

    fn as_millihertz(&self) -> f64 {
        self.get::<millihertz>()
    }
}

/// Scattering screen curvature (delay per Doppler frequency squared).
///
/// Stored in seconds cubed. `NaN` is a valid value and is used as the
/// "could not determine" sentinel by the curvature search.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Curvature(f64);

impl Curvature {
    /// Create a curvature from seconds cubed
    pub fn from_seconds_cubed(s3: f64) -> Self {
        Curvature(s3)
    }

    /// Create a curvature from microseconds per millihertz squared
    pub fn from_us_per_mhz2(value: f64) -> Self {
        // 1 us / mHz^2 = 1e-6 s * 1e6 s^2
        Curvature(value)
    }

    /// Undetermined curvature
    pub fn nan() -> Self {
        Curvature(f64::NAN)
    }

    /// Get curvature in seconds cubed
    pub fn as_seconds_cubed(&self) -> f64 {
        self.0
    }

    /// Get curvature in the working units of the mapping routines
    pub fn as_us_per_mhz2(&self) -> f64 {
        self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    pub fn is_nan(&self) -> bool {
        self.0.is_nan()
    }
}

impl fmt::Display for Curvature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(precision) = f.precision() {
            write!(f, "{:.*e} s^3", precision, self.0)
        } else {
            write!(f, "{:e} s^3", self.0)
        }
    }
}
