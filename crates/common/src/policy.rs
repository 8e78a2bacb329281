//! Failure policies for the bootstrap steps.

use std::fmt;

/// What the bootstrap driver does when a step returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPolicy {
    /// Abort startup with a nonzero exit code.
    Fatal,
    /// Log and continue with the documented fallback.
    RecoverWithFallback,
    /// Log and continue.
    Ignored,
}

impl StepPolicy {
    #[must_use]
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Fatal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::RecoverWithFallback => "recover-with-fallback",
            Self::Ignored => "ignored",
        }
    }
}

impl fmt::Display for StepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
