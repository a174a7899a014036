//! Configuration module.
//!
//! Handles loading, validating, and merging `drawalong.toml`. Stock defaults
//! are overridden by the user's file; command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [normalize]
//! max_dimension = 1600      # Cap on the longer output side, in pixels
//! quality = 0.85            # JPEG quality in 0-1, clamped to 0.5-0.95 when used
//! default_name = "drawing"  # Base name when the upload has none
//!
//! [submission]
//! max_upload_bytes = 10485760
//! allowed_media_types = ["image/jpeg", "image/png", "image/webp"]
//!
//! [mail]
//! from = "DrawAlong <onboarding@resend.dev>"
//! review_inbox = ""         # Empty: send to the submitter (local development)
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [normalize]
//! max_dimension = 2048
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{MaxDimension, NormalizeOptions, Quality};
use crate::naming::DEFAULT_BASE_NAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in a directory by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "drawalong.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `drawalong.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Image normalization settings.
    pub normalize: NormalizeConfig,
    /// Upload validation policy.
    pub submission: SubmissionConfig,
    /// Reviewer email settings.
    pub mail: MailConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.normalize.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "normalize.max_dimension must be non-zero".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.normalize.quality) {
            return Err(ConfigError::Validation(
                "normalize.quality must be between 0 and 1".into(),
            ));
        }
        if self.normalize.default_name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "normalize.default_name must not be empty".into(),
            ));
        }
        if self.submission.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "submission.max_upload_bytes must be non-zero".into(),
            ));
        }
        if let Some(bad) = self
            .submission
            .allowed_media_types
            .iter()
            .find(|t| !t.starts_with("image/"))
        {
            return Err(ConfigError::Validation(format!(
                "submission.allowed_media_types: {bad:?} is not an image type"
            )));
        }
        if self.mail.from.trim().is_empty() {
            return Err(ConfigError::Validation("mail.from must not be empty".into()));
        }
        Ok(())
    }
}

/// Image normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeConfig {
    /// Cap on the longer output side, in pixels.
    pub max_dimension: u32,
    /// Requested JPEG quality as a fraction. Clamped to 0.5-0.95 when used.
    pub quality: f32,
    /// Base file name for uploads that arrive without one.
    pub default_name: String,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            max_dimension: MaxDimension::default().value(),
            quality: Quality::default().value(),
            default_name: DEFAULT_BASE_NAME.to_string(),
        }
    }
}

impl NormalizeConfig {
    pub fn to_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            max_dimension: MaxDimension(self.max_dimension),
            quality: Quality::new(self.quality),
            default_name: self.default_name.trim().to_string(),
        }
    }
}

/// Upload validation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubmissionConfig {
    /// Largest accepted image upload, in bytes.
    pub max_upload_bytes: u64,
    /// Media types accepted for the image field.
    pub allowed_media_types: Vec<String>,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            allowed_media_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
        }
    }
}

/// Reviewer email settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MailConfig {
    /// Sender shown on the review email.
    pub from: String,
    /// Reviewer inbox. Empty means "send to the submitter", for local development.
    pub review_inbox: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "DrawAlong <onboarding@resend.dev>".to_string(),
            review_inbox: String::new(),
        }
    }
}

impl MailConfig {
    pub fn review_inbox(&self) -> Option<&str> {
        let inbox = self.review_inbox.trim();
        (!inbox.is_empty()).then_some(inbox)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel normalization workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)`, at least 1
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top. `Option` fields that are
/// `None` are simply absent.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(AppConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config does not serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load `drawalong.toml` from the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    load_config_file(&dir.join(CONFIG_FILE_NAME))
}

/// Like [`load_config`], for an explicit file path. A missing file yields defaults.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `drawalong.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# DrawAlong Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Command-line flags (--max-dim, --quality) override this file.

# ---------------------------------------------------------------------------
# Image normalization
# ---------------------------------------------------------------------------
[normalize]
# Longest side of the re-encoded image, in pixels. Smaller images are
# never upscaled.
max_dimension = 1600
# JPEG quality as a fraction between 0 and 1. Values below 0.5 or
# above 0.95 are clamped when encoding.
quality = 0.85
# Base file name used when an upload arrives without one.
default_name = "drawing"

# ---------------------------------------------------------------------------
# Upload validation
# ---------------------------------------------------------------------------
[submission]
# Uploads larger than this are rejected with 413.
max_upload_bytes = 10485760
# Media types accepted for the image field; anything else is rejected with 415.
allowed_media_types = ["image/jpeg", "image/png", "image/webp"]

# ---------------------------------------------------------------------------
# Reviewer email
# ---------------------------------------------------------------------------
[mail]
from = "DrawAlong <onboarding@resend.dev>"
# Where submissions go. Leave empty to send them back to the submitter,
# which is handy for local development.
review_inbox = ""

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for batch normalization. Omit for all CPU cores.
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_normalize_settings() {
        let config = AppConfig::default();
        assert_eq!(config.normalize.max_dimension, 1600);
        assert_eq!(config.normalize.quality, 0.85);
        assert_eq!(config.normalize.default_name, "drawing");
    }

    #[test]
    fn default_config_has_submission_policy() {
        let config = AppConfig::default();
        assert_eq!(config.submission.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config
            .submission
            .allowed_media_types
            .contains(&"image/png".to_string()));
        assert_eq!(config.mail.review_inbox(), None);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[normalize]
max_dimension = 2048
"##;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.normalize.max_dimension, 2048);
        // Defaults preserved
        assert_eq!(config.normalize.quality, 0.85);
        assert_eq!(config.mail.from, "DrawAlong <onboarding@resend.dev>");
    }

    #[test]
    fn to_options_clamps_quality() {
        let normalize = NormalizeConfig {
            quality: 1.0,
            ..Default::default()
        };
        let options = normalize.to_options();
        assert_eq!(options.quality.value(), 0.95);
        assert_eq!(options.max_dimension.value(), 1600);
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.normalize.max_dimension, 1600);
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r##"
[normalize]
quality = 0.7

[mail]
review_inbox = "review@example.com"
"##,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.normalize.quality, 0.7);
        assert_eq!(config.mail.review_inbox(), Some("review@example.com"));
        // Unspecified values should be defaults
        assert_eq!(config.normalize.max_dimension, 1600);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "this is not valid toml [[[").unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            "[normalize]\nmax_dimension = 0\n",
        )
        .unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_config_file_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("custom.toml");
        fs::write(&path, "[processing]\nmax_processes = 2\n").unwrap();
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.processing.max_processes, Some(2));
    }

    // =========================================================================
    // Unknown keys
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("colour = \"red\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[normalize]\nmax_dim = 10\n");
        assert!(result.is_err());
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_out_of_range() {
        let mut config = AppConfig::default();
        config.normalize.quality = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_quality_is_checked_but_in_range_values_still_clamp() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[normalize]\nquality = 1.2\n").unwrap();
        assert!(load_config(tmp.path()).is_err());

        fs::write(tmp.path().join(CONFIG_FILE_NAME), "[normalize]\nquality = 0.2\n").unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.normalize.to_options().quality.value(), 0.5);
    }

    #[test]
    fn validate_non_image_media_type() {
        let mut config = AppConfig::default();
        config.submission.allowed_media_types.push("application/pdf".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("application/pdf"));
    }

    #[test]
    fn validate_empty_default_name() {
        let mut config = AppConfig::default();
        config.normalize.default_name = "  ".into();
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // Merging
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("a = 1\nb = 2").unwrap();
        let overlay: toml::Value = toml::from_str("b = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["b"].as_integer(), Some(3));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str("[mail]\nfrom = \"x <x@y.z>\"").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["mail"]["from"].as_str(), Some("x <x@y.z>"));
        assert_eq!(merged["mail"]["review_inbox"].as_str(), Some(""));
    }

    #[test]
    fn resolve_config_with_no_overlay() {
        let config = resolve_config(stock_defaults_value().unwrap(), None).unwrap();
        assert_eq!(config.normalize.max_dimension, 1600);
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: AppConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(config.normalize.max_dimension, defaults.normalize.max_dimension);
        assert_eq!(config.normalize.quality, defaults.normalize.quality);
        assert_eq!(config.submission.max_upload_bytes, defaults.submission.max_upload_bytes);
        assert_eq!(
            config.submission.allowed_media_types,
            defaults.submission.allowed_media_types
        );
        assert_eq!(config.processing.max_processes, None);
    }

    // =========================================================================
    // Threads
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let threads = effective_threads(&ProcessingConfig::default());
        assert!(threads >= 1);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let threads = effective_threads(&ProcessingConfig {
            max_processes: Some(1),
        });
        assert_eq!(threads, 1);
    }

    #[test]
    fn effective_threads_zero_is_one() {
        let threads = effective_threads(&ProcessingConfig {
            max_processes: Some(0),
        });
        assert_eq!(threads, 1);
    }
}
