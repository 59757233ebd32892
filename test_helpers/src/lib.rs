//! Test infrastructure shared across the workspace.
//!
//! Locates the workspace root from any test context and hands out paths in
//! a persistent `test_output/` directory, so diagnostic figures and CSV
//! files written by integration tests survive for manual inspection.
//!
//! ```text
//! test_output/
//! ├── plots/      # Diagnostic figures from curvature searches
//! └── csv/        # Estimate tables
//! ```
//!
//! # Usage
//! ```rust
//! use test_helpers::output_path;
//!
//! let figure = output_path("plots/recovery.png");
//! assert!(figure.starts_with(test_helpers::get_output_dir()));
//! ```

use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};

/// Errors locating test infrastructure
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    /// No `Cargo.toml` with a `[workspace]` section above the working directory
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),
}

/// Walk up from the current directory to the workspace `Cargo.toml`.
///
/// # Returns
/// * `Ok(PathBuf)` - Directory holding the workspace manifest
/// * `Err(TestHelperError)` - Filesystem root reached, or a manifest was unreadable
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {e}"))
    })?;

    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::ProjectRootNotFound(format!("Failed to read Cargo.toml: {e}"))
            })?;

            if content.contains("[workspace]") {
                return Ok(current_dir);
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::ProjectRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

/// Project root, resolved once per process
static PROJECT_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_project_root().expect("Failed to find project root directory"));

/// `<project_root>/test_output/`, created on first use.
pub fn get_output_dir() -> PathBuf {
    let output_dir = PROJECT_ROOT.join("test_output");

    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    }

    output_dir
}

/// Path inside the test output directory. Parent directories of `path`
/// are created so the caller can write to it immediately.
pub fn output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    let full = get_output_dir().join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create output subdirectory");
    }
    full
}

/// Route `log` output through the test harness capture.
///
/// Safe to call from every test; only the first call installs the logger.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
