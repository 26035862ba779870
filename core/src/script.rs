use std::path::{Path, PathBuf};

use crate::error::{Level, ReformErrorExt};
use crate::location::{Location, Span};

/// A fixture script handed to the front-end. The `name` is what diagnostics
/// and IR locations print as the file.
#[derive(Debug, Clone)]
pub struct Script {
    pub name: String,
    pub path: PathBuf,
    pub content: String,
}

impl Script {
    pub fn new(path: PathBuf) -> Result<Self, Box<dyn ReformErrorExt>> {
        let content = std::fs::read_to_string(&path).map_err(|e| UnreadableScriptError {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Script {
            name: display_name(&path),
            path,
            content,
        })
    }

    /// In-memory source, mostly for tests and tooling.
    pub fn from_source(name: &str, content: &str) -> Self {
        Script {
            name: name.to_string(),
            path: PathBuf::from(name),
            content: content.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Location of a 1-based line/column pair inside this script.
    pub fn location_at(&self, line: usize, column: usize) -> Location {
        Location::new(self.name.clone(), line, column)
    }
}

fn display_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().to_string(),
        None => path.to_string_lossy().to_string(),
    }
}

impl std::fmt::Display for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} line(s))", self.name, self.content.lines().count())
    }
}

/// The script file could not be read.
#[derive(Debug, Clone)]
pub struct UnreadableScriptError {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for UnreadableScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot read script {:?}: {}", self.path, self.reason)
    }
}

impl std::error::Error for UnreadableScriptError {}

impl ReformErrorExt for UnreadableScriptError {
    fn level(&self) -> Level {
        Level::Error
    }

    fn message(&self) -> String {
        self.to_string()
    }

    fn issuer(&self) -> String {
        "reform.script".to_string()
    }

    fn span(&self) -> Option<Span> {
        None
    }

    fn location(&self) -> Option<Location> {
        None
    }
}

impl From<UnreadableScriptError> for Box<dyn ReformErrorExt> {
    fn from(err: UnreadableScriptError) -> Self {
        Box::new(err)
    }
}
