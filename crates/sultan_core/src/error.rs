use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    MalformedSave,
    Range,
    TypeMismatch,
    BusinessRule,
    Conflict,
    UnsupportedOperation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Io, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::MalformedSave, message)
    }

    pub fn range(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Range, message)
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::TypeMismatch, message)
    }

    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::BusinessRule, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::Conflict, message)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::new(CoreErrorCode::UnsupportedOperation, message)
    }

    /// Field-level validation errors: the edit is rejected, the previous
    /// value stays in place and the session continues.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.code,
            CoreErrorCode::Range | CoreErrorCode::TypeMismatch | CoreErrorCode::BusinessRule
        )
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CoreError {}
