//! file: core/src/config.rs
//! description: compilation settings consumed by context-manager lowering.
//!
//! Settings are plain data with serde defaults so a partial JSON file is
//! enough; the CLI layers its flags on top of whatever was loaded.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Level, ReformErrorExt};
use crate::location::{Location, Span};
use crate::policy::SpecRevision;

/// What an asynchronous construct does when its task is cancelled while
/// suspended on the enter call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnterCancellation {
    /// Let the cancellation propagate; the exit hook is not invoked.
    #[default]
    Propagate,
    /// Invoke the exit hook with the cancellation, then re-raise it.
    AttemptExit,
}

impl FromStr for EnterCancellation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "propagate" => Ok(EnterCancellation::Propagate),
            "attempt_exit" | "attempt-exit" => Ok(EnterCancellation::AttemptExit),
            other => Err(format!("unknown cancellation mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReformConfig {
    #[serde(default)]
    pub revision: SpecRevision,
    #[serde(default)]
    pub strict_legacy_diagnostics: bool,
    #[serde(default)]
    pub enter_cancellation: EnterCancellation,
    #[serde(default = "default_verify")]
    pub verify_output: bool,
}

fn default_verify() -> bool {
    true
}

impl Default for ReformConfig {
    fn default() -> Self {
        ReformConfig {
            revision: SpecRevision::default(),
            strict_legacy_diagnostics: false,
            enter_cancellation: EnterCancellation::default(),
            verify_output: default_verify(),
        }
    }
}

impl ReformConfig {
    pub fn for_revision(revision: SpecRevision) -> Self {
        ReformConfig {
            revision,
            ..ReformConfig::default()
        }
    }

    pub fn with_strict_legacy_diagnostics(mut self, strict: bool) -> Self {
        self.strict_legacy_diagnostics = strict;
        self
    }

    pub fn with_enter_cancellation(mut self, mode: EnterCancellation) -> Self {
        self.enter_cancellation = mode;
        self
    }

    pub fn with_verify_output(mut self, verify: bool) -> Self {
        self.verify_output = verify;
        self
    }

    /// Load settings from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ReformConfig, Box<dyn ReformErrorExt>> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::new(path, format!("read config: {}", e)))?;
        let config = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::new(path, format!("parse config: {}", e)))?;
        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub path: PathBuf,
    message: String,
}

impl ConfigError {
    pub fn new(path: &Path, message: String) -> Self {
        ConfigError {
            path: path.to_path_buf(),
            message,
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?})", self.message, self.path)
    }
}

impl std::error::Error for ConfigError {}

impl ReformErrorExt for ConfigError {
    fn level(&self) -> Level {
        Level::Error
    }

    fn message(&self) -> String {
        format!("{} ({:?})", self.message, self.path)
    }

    fn issuer(&self) -> String {
        "reform.config".to_string()
    }

    fn span(&self) -> Option<Span> {
        None
    }

    fn location(&self) -> Option<Location> {
        None
    }
}

impl From<ConfigError> for Box<dyn ReformErrorExt> {
    fn from(err: ConfigError) -> Self {
        Box::new(err)
    }
}
