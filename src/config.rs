//! Configuration loaded from `mjconv.toml`.
//!
//! [`MjconvConfig`] holds the external tool contracts and run defaults. Every field
//! has a default, so a missing file means "use the defaults". The environment
//! variables `MJCONV_CONVERTER` and `MJCONV_VALIDATOR` take precedence over the
//! file for the tool programs. [`RunConfig`] is the immutable per-run view built
//! from the file plus command-line overrides.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Default config file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "mjconv.toml";

/// Top-level configuration loaded from `mjconv.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct MjconvConfig {
    /// Worker count used when `--workers` is not given.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Extension (without dot) of the files picked up from the input directory.
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// File name of the JSON report written into the output directory.
    #[serde(default = "default_report_file")]
    pub report_file: String,

    /// Inputs containing any of these markers are skipped without conversion.
    #[serde(default = "default_skip_markers")]
    pub skip_markers: Vec<String>,

    #[serde(default)]
    pub converter: ConverterConfig,

    #[serde(default)]
    pub validator: ValidatorConfig,
}

/// How the converter hands back its event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// The tool writes the `{output}` path itself.
    File,
    /// The tool prints the stream to stdout; we write it to the output path.
    Stdout,
}

/// Contract of the external translation tool.
#[derive(Debug, Clone, Deserialize)]
pub struct ConverterConfig {
    #[serde(default = "default_converter_program")]
    pub program: String,

    /// Argument template; `{input}` and `{output}` are substituted per job.
    #[serde(default = "default_converter_args")]
    pub args: Vec<String>,

    #[serde(default = "default_output_mode")]
    pub output: OutputMode,

    #[serde(default = "default_converter_timeout_secs")]
    pub timeout_secs: u64,

    /// Extension of the gzip artifact staged for the converter.
    #[serde(default = "default_staged_extension")]
    pub staged_extension: String,

    /// Extension of the converted files in the output directory.
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
}

/// Contract of the external validator tool.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorConfig {
    #[serde(default = "default_validator_program")]
    pub program: String,

    /// Argument template; `{input}` is the converted file.
    #[serde(default = "default_validator_args")]
    pub args: Vec<String>,

    #[serde(default = "default_validator_timeout_secs")]
    pub timeout_secs: u64,

    /// A stderr line containing this marker is the validator's failure signal.
    #[serde(default = "default_fail_marker")]
    pub fail_marker: String,
}

fn default_workers() -> usize {
    4
}

fn default_source_extension() -> String {
    "xml".to_string()
}

fn default_report_file() -> String {
    "conversion_results.json".to_string()
}

fn default_skip_markers() -> Vec<String> {
    vec!["BYE".to_string()]
}

fn default_converter_program() -> String {
    if cfg!(windows) {
        "mjai.bat".to_string()
    } else {
        "mjai".to_string()
    }
}

fn default_converter_args() -> Vec<String> {
    vec!["convert".into(), "{input}".into(), "{output}".into()]
}

fn default_output_mode() -> OutputMode {
    OutputMode::File
}

fn default_converter_timeout_secs() -> u64 {
    120
}

fn default_staged_extension() -> String {
    "mjlog".to_string()
}

fn default_output_extension() -> String {
    "mjson".to_string()
}

fn default_validator_program() -> String {
    "validate_logs".to_string()
}

fn default_validator_args() -> Vec<String> {
    vec!["{input}".into()]
}

fn default_validator_timeout_secs() -> u64 {
    10
}

fn default_fail_marker() -> String {
    "fails".to_string()
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            program: default_converter_program(),
            args: default_converter_args(),
            output: default_output_mode(),
            timeout_secs: default_converter_timeout_secs(),
            staged_extension: default_staged_extension(),
            output_extension: default_output_extension(),
        }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            program: default_validator_program(),
            args: default_validator_args(),
            timeout_secs: default_validator_timeout_secs(),
            fail_marker: default_fail_marker(),
        }
    }
}

impl Default for MjconvConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            source_extension: default_source_extension(),
            report_file: default_report_file(),
            skip_markers: default_skip_markers(),
            converter: ConverterConfig::default(),
            validator: ValidatorConfig::default(),
        }
    }
}

impl ConverterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ValidatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MjconvConfig {
    /// Loads the configuration.
    ///
    /// With an explicit `path` the file must exist. Without one, `mjconv.toml` in
    /// the current directory is used when present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p, true),
            None => (Path::new(DEFAULT_CONFIG_FILE), false),
        };

        let mut config = if required || path.exists() {
            let contents =
                std::fs::read_to_string(path).map_err(|source| ConfigError::ConfigUnreadable {
                    path: path.to_path_buf(),
                    source,
                })?;
            toml::from_str::<MjconvConfig>(&contents)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Environment variables win over the file for the tool programs.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(program) = lookup("MJCONV_CONVERTER")
            && !program.is_empty()
        {
            self.converter.program = program;
        }
        if let Some(program) = lookup("MJCONV_VALIDATOR")
            && !program.is_empty()
        {
            self.validator.program = program;
        }
    }

    /// Rejects values no run could work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.converter.program.trim().is_empty() {
            return Err(ConfigError::Invalid("converter.program is empty".into()));
        }
        if !self.converter.args.iter().any(|a| a.contains("{input}")) {
            return Err(ConfigError::Invalid(
                "converter.args must reference {input}".into(),
            ));
        }
        if self.converter.output == OutputMode::File
            && !self.converter.args.iter().any(|a| a.contains("{output}"))
        {
            return Err(ConfigError::Invalid(
                "converter.args must reference {output} when output = \"file\"".into(),
            ));
        }
        if self.converter.timeout_secs == 0 || self.validator.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }
        if self.validator.fail_marker.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "validator.fail_marker is empty".into(),
            ));
        }
        if self.report_file.trim().is_empty() {
            return Err(ConfigError::Invalid("report_file is empty".into()));
        }
        Ok(())
    }
}

/// Immutable settings for one run, built from the file and the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfig {
    pub workers: usize,
    pub limit: Option<usize>,
    pub validate: bool,
}

impl RunConfig {
    pub fn new(workers: usize, limit: Option<usize>, validate: bool) -> Result<Self, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if limit == Some(0) {
            return Err(ConfigError::Invalid("limit must be at least 1".into()));
        }
        Ok(Self {
            workers,
            limit,
            validate,
        })
    }
}
