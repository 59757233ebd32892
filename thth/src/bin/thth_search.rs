//! Curvature search over a chunked dynamic spectrum
//!
//! Reads a dynamic spectrum from CSV (one row per channel, one column per
//! sample) or generates a synthetic thin-screen spectrum, tiles it into
//! chunks, runs the theta-theta curvature search on every chunk and writes
//! one estimate per chunk to CSV.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use thth::chunking::{chunk_params, run_chunks, ChunkLayout};
use thth::io::{read_dynspec_csv, write_estimates_csv};
use thth::range_arg::EtaRangeArg;
use thth::search::SearchConfig;
use thth::spectra::{DynamicSpectrum, SpectralAxes};
use thth::synthetic::{add_noise, random_screen, synthetic_dynamic_spectrum};
use thth::units::{Curvature, Frequency, FrequencyExt, Time, TimeExt};
use thth::EdgeSpec;

const DEFAULT_CSV_FILENAME: &str = "thth_estimates_YYYYMMDD_HHMMSS.csv";

/// Theta edge layout
#[derive(Debug, Clone, Copy, ValueEnum)]
enum EdgeKind {
    /// Evenly spaced in theta
    Linear,
    /// Equal arc length along the parabola at the middle of the search range
    ArcLength,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeKind::Linear => write!(f, "linear"),
            EdgeKind::ArcLength => write!(f, "arc-length"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "Theta-theta Curvature Search",
    about = "Estimates scintillation arc curvature per chunk of a dynamic spectrum",
    long_about = None
)]
struct Args {
    /// Dynamic spectrum CSV (rows are frequency channels, columns are time samples)
    #[arg(short, long, required_unless_present = "synthetic_eta")]
    input: Option<PathBuf>,

    /// Generate a synthetic spectrum at this curvature (s^3) instead of reading a file
    #[arg(long, conflicts_with = "input")]
    synthetic_eta: Option<f64>,

    /// Frequency of the first channel in MHz
    #[arg(long, default_value_t = 1400.0)]
    freq_start_mhz: f64,

    /// Channel width in MHz
    #[arg(long, default_value_t = 0.1)]
    channel_width_mhz: f64,

    /// Time of the first sample in seconds
    #[arg(long, default_value_t = 0.0)]
    time_start_s: f64,

    /// Sample time in seconds
    #[arg(long, default_value_t = 10.0)]
    sample_time_s: f64,

    /// Channels in a synthetic spectrum
    #[arg(long, default_value_t = 128)]
    synthetic_channels: usize,

    /// Samples in a synthetic spectrum
    #[arg(long, default_value_t = 128)]
    synthetic_samples: usize,

    /// Scattered images in a synthetic screen
    #[arg(long, default_value_t = 40)]
    synthetic_images: usize,

    /// Gaussian noise added to a synthetic spectrum
    #[arg(long, default_value_t = 0.0)]
    noise: f64,

    /// Seed for the synthetic screen and noise
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Curvature search range in s^3 (low:high)
    /// Example: --eta-range 0.005:0.02
    #[arg(long, default_value = "0.005:0.02")]
    eta_range: EtaRangeArg,

    /// Frequency channels per chunk
    #[arg(long, default_value_t = 64)]
    chunk_channels: usize,

    /// Time samples per chunk
    #[arg(long, default_value_t = 64)]
    chunk_samples: usize,

    /// Theta edge layout
    #[arg(long, value_enum, default_value_t = EdgeKind::Linear)]
    edges: EdgeKind,

    /// Largest theta (Doppler frequency) covered by the edges, in mHz.
    /// Also bounds the images of a synthetic screen.
    #[arg(long, default_value_t = 12.0)]
    theta_max_mhz: f64,

    /// Number of theta edges
    #[arg(long, default_value_t = 64)]
    n_edges: usize,

    /// Candidate curvatures per search
    #[arg(long, default_value_t = 100)]
    n_candidates: usize,

    /// Extra copies of each chunk axis appended as padding before the FFT
    #[arg(long, default_value_t = 3)]
    pad: usize,

    /// Run chunks one at a time
    #[arg(long)]
    serial: bool,

    /// Write a diagnostic figure per chunk
    #[arg(long)]
    plot: bool,

    /// Directory for diagnostic figures
    #[arg(long, default_value = "thth_plots")]
    plot_dir: PathBuf,

    /// Output CSV file for the estimates
    #[arg(short, long, default_value = DEFAULT_CSV_FILENAME)]
    output_csv: String,
}

fn load_spectrum(args: &Args) -> anyhow::Result<DynamicSpectrum> {
    let freq_start = Frequency::from_megahertz(args.freq_start_mhz);
    let channel_width = Frequency::from_megahertz(args.channel_width_mhz);
    let time_start = Time::from_seconds(args.time_start_s);
    let sample_time = Time::from_seconds(args.sample_time_s);

    if let Some(path) = &args.input {
        return read_dynspec_csv(path, freq_start, channel_width, time_start, sample_time)
            .with_context(|| format!("Failed to read dynamic spectrum from {}", path.display()));
    }

    let Some(eta) = args.synthetic_eta else {
        bail!("Either --input or --synthetic-eta is required");
    };
    let freqs: Vec<Frequency> = (0..args.synthetic_channels)
        .map(|i| freq_start + channel_width * i as f64)
        .collect();
    let times: Vec<Time> = (0..args.synthetic_samples)
        .map(|i| time_start + sample_time * i as f64)
        .collect();

    let images = random_screen(
        args.synthetic_images,
        Frequency::from_millihertz(args.theta_max_mhz),
        args.seed,
    );
    let dspec = synthetic_dynamic_spectrum(
        &images,
        Curvature::from_seconds_cubed(eta),
        &freqs,
        &times,
    )?;
    info!(
        "Synthetic spectrum: {} images at eta = {eta} s^3",
        images.len()
    );

    if args.noise > 0.0 {
        Ok(add_noise(&dspec, args.noise, args.seed.wrapping_add(1))?)
    } else {
        Ok(dspec)
    }
}

fn edge_spec(args: &Args) -> EdgeSpec {
    let theta_max = Frequency::from_millihertz(args.theta_max_mhz);
    match args.edges {
        EdgeKind::Linear => EdgeSpec::Linear {
            max: theta_max,
            n: args.n_edges,
        },
        EdgeKind::ArcLength => EdgeSpec::ArcLength {
            eta: args.eta_range.midpoint(),
            fd_max: theta_max,
            n: args.n_edges,
        },
    }
}

fn output_filename(template: &str) -> String {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    template.replace("YYYYMMDD_HHMMSS", &timestamp)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let dspec = load_spectrum(&args)?;
    let (n_freq, n_time) = dspec.dim();
    info!("Dynamic spectrum: {n_freq} channels x {n_time} samples");
    info!("Curvature range (s^3): {}", args.eta_range);
    info!("Theta edges: {} ({} edges to {} mHz)", args.edges, args.n_edges, args.theta_max_mhz);

    let layout = ChunkLayout::new(args.chunk_channels, args.chunk_samples);
    let (n_f, n_t) = layout.grid(&dspec);
    if n_f == 0 || n_t == 0 {
        bail!(
            "Chunk size {}x{} does not fit in a {n_freq}x{n_time} spectrum",
            args.chunk_channels,
            args.chunk_samples
        );
    }
    info!("Chunks: {n_f} in frequency x {n_t} in time");

    // Chunks share one spacing, so the first one fixes the edge layout
    let first = layout.chunk(&dspec, 0, 0)?;
    let axes = SpectralAxes::new(first.tau_axis(args.pad), first.fd_axis(args.pad));
    let edges = edge_spec(&args).build(&axes);

    if args.plot {
        std::fs::create_dir_all(&args.plot_dir).with_context(|| {
            format!("Failed to create plot directory {}", args.plot_dir.display())
        })?;
    }

    let config = SearchConfig {
        n_candidates: args.n_candidates,
        pad: args.pad,
        ..SearchConfig::default()
    };
    let params = chunk_params(
        &dspec,
        layout,
        args.eta_range.low(),
        args.eta_range.high(),
        &edges,
        &args.plot_dir,
        "chunk",
        args.plot,
        config,
    )?;

    let progress_style = ProgressStyle::default_bar()
        .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .context("Invalid progress bar template")?
        .progress_chars("█▉▊▋▌▍▎▏ ");
    let pb = ProgressBar::new(params.len() as u64);
    pb.set_style(progress_style);
    pb.set_message("Searching chunks");

    let estimates = run_chunks(&params, !args.serial, || pb.inc(1));
    pb.finish_with_message("Search complete");

    let output = output_filename(&args.output_csv);
    write_estimates_csv(Path::new(&output), &estimates)
        .with_context(|| format!("Failed to write estimates to {output}"))?;

    let determined: Vec<f64> = estimates
        .iter()
        .filter(|e| e.is_determined())
        .map(|e| e.eta.as_seconds_cubed())
        .collect();
    if determined.is_empty() {
        warn!("No chunk produced a curvature estimate");
    } else {
        let mean = determined.iter().sum::<f64>() / determined.len() as f64;
        info!(
            "{} of {} chunks determined, mean eta = {mean:.4e} s^3",
            determined.len(),
            estimates.len()
        );
    }
    info!("Estimates written to {output}");

    Ok(())
}
