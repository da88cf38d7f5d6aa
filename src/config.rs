//! fm-merge configuration (`fm-merge.toml`).
//!
//! Solver limits, merge post-condition checks, and validation. Every field
//! has a default; a missing file means all defaults.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use fm_oracle::SolverLimits;
use serde::Deserialize;

/// Default config file name looked up in the working directory.
pub const CONFIG_FILE: &str = "fm-merge.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FmMergeConfig {
    /// Oracle limits.
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Merge pipeline settings.
    #[serde(default)]
    pub merge: MergeConfig,

    /// Validation settings.
    #[serde(default)]
    pub validate: ValidateConfig,
}

// ---------------------------------------------------------------------------
// OracleConfig
// ---------------------------------------------------------------------------

/// Limits applied to every oracle query. Absent means unlimited.
///
/// ```toml
/// [oracle]
/// max_decisions = 5000000
/// timeout_ms = 30000
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleConfig {
    /// Branching decisions allowed per query.
    #[serde(default)]
    pub max_decisions: Option<u64>,

    /// Wall-clock limit per query, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl OracleConfig {
    /// The solver limits these settings describe.
    #[must_use]
    pub fn limits(&self) -> SolverLimits {
        SolverLimits {
            max_decisions: self.max_decisions,
            timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }
}

// ---------------------------------------------------------------------------
// MergeConfig
// ---------------------------------------------------------------------------

/// Merge pipeline settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    /// Count solutions before and after every phase and fail on a mismatch.
    /// Exponential in the number of features; meant for tests and audits.
    #[serde(default)]
    pub verify_solution_counts: bool,
}

// ---------------------------------------------------------------------------
// ValidateConfig
// ---------------------------------------------------------------------------

/// Validation settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidateConfig {
    /// Run the validator after `merge` (default: `true`).
    #[serde(default = "default_validate_enabled")]
    pub enabled: bool,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            enabled: default_validate_enabled(),
        }
    }
}

const fn default_validate_enabled() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<std::path::PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl FmMergeConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }
}
