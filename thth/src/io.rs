//! CSV input and output
//!
//! Dynamic spectra are read as a bare numeric grid: one row per frequency
//! channel, one column per time sample, no header. Curvature estimates are
//! written one row per chunk with a header.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ndarray::Array2;

use crate::search::CurvatureEstimate;
use crate::spectra::{DynamicSpectrum, SpectrumError};
use crate::units::{Frequency, FrequencyExt, Time, TimeExt};

/// Errors reading or writing CSV files
#[derive(Error, Debug)]
pub enum IoError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Spectrum(#[from] SpectrumError),

    #[error("Row {row}, column {column}: cannot parse {value:?} as a number")]
    Parse {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("Row {row} has {got} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("File contains no data")]
    Empty,
}

/// Read a dynamic spectrum grid with uniformly spaced axes.
pub fn read_dynspec_csv(
    path: &Path,
    freq_start: Frequency,
    channel_width: Frequency,
    time_start: Time,
    sample_time: Time,
) -> Result<DynamicSpectrum, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut values = Vec::new();
    let mut n_cols = None;
    let mut n_rows = 0;
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let expected = *n_cols.get_or_insert(record.len());
        if record.len() != expected {
            return Err(IoError::Ragged {
                row,
                expected,
                got: record.len(),
            });
        }
        for (column, field) in record.iter().enumerate() {
            let value = field.parse::<f64>().map_err(|_| IoError::Parse {
                row,
                column,
                value: field.to_string(),
            })?;
            values.push(value);
        }
        n_rows += 1;
    }

    let n_cols = n_cols.ok_or(IoError::Empty)?;
    let data = Array2::from_shape_vec((n_rows, n_cols), values).map_err(|_| IoError::Empty)?;
    Ok(DynamicSpectrum::from_uniform(
        data,
        freq_start,
        channel_width,
        time_start,
        sample_time,
    )?)
}

/// One row of the estimates file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimateRecord {
    pub eta_s3: f64,
    pub eta_sigma_s3: f64,
    pub frequency_mhz: f64,
    pub time_s: f64,
}

impl From<&CurvatureEstimate> for EstimateRecord {
    fn from(e: &CurvatureEstimate) -> Self {
        Self {
            eta_s3: e.eta.as_seconds_cubed(),
            eta_sigma_s3: e.sigma.as_seconds_cubed(),
            frequency_mhz: e.mean_frequency.as_megahertz(),
            time_s: e.mean_time.as_seconds(),
        }
    }
}

/// Write one row per estimate. Undetermined curvatures are written as NaN.
pub fn write_estimates_csv(path: &Path, estimates: &[CurvatureEstimate]) -> Result<(), IoError> {
    let mut writer = csv::Writer::from_path(path)?;
    for estimate in estimates {
        writer.serialize(EstimateRecord::from(estimate))?;
    }
    // An empty run still gets a header
    if estimates.is_empty() {
        writer.write_record(["eta_s3", "eta_sigma_s3", "frequency_mhz", "time_s"])?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Read back an estimates file
pub fn read_estimates_csv(path: &Path) -> Result<Vec<EstimateRecord>, IoError> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader.deserialize().collect::<Result<Vec<EstimateRecord>, _>>()?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Curvature;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_dynspec_grid() {
        let file = write_temp("1.0, 2.0, 3.0\n4.0, 5.0, 6.5\n");
        let dspec = read_dynspec_csv(
            file.path(),
            Frequency::from_megahertz(1400.0),
            Frequency::from_megahertz(0.25),
            Time::from_seconds(100.0),
            Time::from_seconds(10.0),
        )
        .unwrap();

        assert_eq!(dspec.dim(), (2, 3));
        assert_eq!(dspec.data()[[1, 2]], 6.5);
        assert_eq!(dspec.freqs()[1].as_megahertz(), 1400.25);
        assert_eq!(dspec.times()[2].as_seconds(), 120.0);
    }

    #[test]
    fn test_read_dynspec_errors() {
        let args = (
            Frequency::from_megahertz(1400.0),
            Frequency::from_megahertz(0.25),
            Time::from_seconds(0.0),
            Time::from_seconds(10.0),
        );

        let bad = write_temp("1.0,abc\n2.0,3.0\n");
        let err = read_dynspec_csv(bad.path(), args.0, args.1, args.2, args.3).unwrap_err();
        assert!(matches!(err, IoError::Parse { row: 0, column: 1, .. }));

        let ragged = write_temp("1.0,2.0\n3.0\n");
        let err = read_dynspec_csv(ragged.path(), args.0, args.1, args.2, args.3).unwrap_err();
        assert!(matches!(
            err,
            IoError::Ragged {
                row: 1,
                expected: 2,
                got: 1
            }
        ));

        let empty = write_temp("");
        let err = read_dynspec_csv(empty.path(), args.0, args.1, args.2, args.3).unwrap_err();
        assert!(matches!(err, IoError::Empty));

        // A single sample per axis cannot be transformed
        let tiny = write_temp("1.0\n");
        let err = read_dynspec_csv(tiny.path(), args.0, args.1, args.2, args.3).unwrap_err();
        assert!(matches!(err, IoError::Spectrum(SpectrumError::AxisTooShort { .. })));
    }

    #[test]
    fn test_estimates_round_trip_with_nan() {
        let estimates = vec![
            CurvatureEstimate {
                eta: Curvature::from_seconds_cubed(0.0123),
                sigma: Curvature::from_seconds_cubed(2.0e-4),
                mean_frequency: Frequency::from_megahertz(1400.5),
                mean_time: Time::from_seconds(320.0),
            },
            CurvatureEstimate {
                eta: Curvature::nan(),
                sigma: Curvature::nan(),
                mean_frequency: Frequency::from_megahertz(1416.5),
                mean_time: Time::from_seconds(320.0),
            },
        ];
        let file = NamedTempFile::new().unwrap();
        write_estimates_csv(file.path(), &estimates).unwrap();

        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.starts_with("eta_s3,eta_sigma_s3,frequency_mhz,time_s\n"));
        assert!(text.contains("NaN,NaN,1416.5,320"));

        let records = read_estimates_csv(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].eta_s3, 0.0123);
        assert_eq!(records[0].frequency_mhz, 1400.5);
        assert!(records[1].eta_s3.is_nan());
    }
}
