use std::fmt;

use crate::location::{Location, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level_str = match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
            Level::Critical => "CRITICAL",
        };
        write!(f, "{}", level_str)
    }
}

pub trait ReformErrorExt {
    fn level(&self) -> Level;
    fn message(&self) -> String;
    fn issuer(&self) -> String;
    fn span(&self) -> Option<Span>;
    fn location(&self) -> Option<Location>;
}

impl fmt::Debug for dyn ReformErrorExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let loc_str = match self.location() {
            Some(loc) => format!("{}:{}:{}", loc.file, loc.line, loc.column),
            None => "unknown".to_string(),
        };

        let span_str = match self.span() {
            Some(span) => span.to_string(),
            None => "span:none".to_string(),
        };

        write!(
            f,
            "REFORM | {} | {} | {} | {} | {}",
            self.level(),
            loc_str,
            self.issuer(),
            span_str,
            self.message()
        )
    }
}

impl fmt::Display for dyn ReformErrorExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A broken promise between compiler stages: closed scopes, malformed clause
/// lists, unknown revisions. Always `Critical`; compilation of the current
/// unit stops when one is raised.
#[derive(Debug, Clone)]
pub struct ContractViolation {
    level: Level,
    message: String,
    issuer: String,
    location: Option<Location>,
}

impl ContractViolation {
    pub fn new(message: impl Into<String>, issuer: impl Into<String>, location: Option<Location>) -> Self {
        ContractViolation {
            level: Level::Critical,
            message: message.into(),
            issuer: issuer.into(),
            location,
        }
    }
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = &self.location {
            write!(f, "{} (at {})", self.message, loc)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ContractViolation {}

impl ReformErrorExt for ContractViolation {
    fn level(&self) -> Level {
        self.level
    }

    fn message(&self) -> String {
        self.message.clone()
    }

    fn issuer(&self) -> String {
        self.issuer.clone()
    }

    fn span(&self) -> Option<Span> {
        None
    }

    fn location(&self) -> Option<Location> {
        self.location.clone()
    }
}

impl From<ContractViolation> for Box<dyn ReformErrorExt> {
    fn from(err: ContractViolation) -> Self {
        Box::new(err)
    }
}

impl<T: ReformErrorExt + 'static> From<Box<T>> for Box<dyn ReformErrorExt> {
    fn from(err: Box<T>) -> Self {
        err
    }
}
