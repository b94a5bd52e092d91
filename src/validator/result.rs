//! Outcome types returned to whoever proposed a hook URL

use std::fmt;

/// What a successful (HTTP 200) probe learned about the responder
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Responder presented this instance's identity
    Recognized,
    /// Responder did not present any identity
    Unrecognized,
}

/// Tri-state result of validating a candidate hook URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationResult {
    Ok,
    Warning(String),
    Error(String),
}

impl ValidationResult {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationResult::Ok => "ok",
            ValidationResult::Warning(_) => "warning",
            ValidationResult::Error(_) => "error",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ValidationResult::Ok => None,
            ValidationResult::Warning(m) | ValidationResult::Error(m) => Some(m),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ValidationResult::Ok)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationResult::Warning(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValidationResult::Error(_))
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {}", self.kind(), message),
            None => write!(f, "{}", self.kind()),
        }
    }
}
