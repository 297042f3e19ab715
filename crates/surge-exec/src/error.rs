use std::time::Duration;

use thiserror::Error;

pub type ExecResult<T> = Result<T, ExecError>;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("non-zero exit code {code}: {output}")]
    NonZeroExit { code: i32, output: String },
    #[error("killed by signal: {output}")]
    KilledBySignal { output: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("missing program")]
    MissingProgram,
    #[error("io error: {0}")]
    Io(String),
    #[error("failed to provision slot: {0}")]
    Provision(String),
    #[error("slot pool drained")]
    PoolDrained,
    #[error("cancelled")]
    Cancelled,
}

/// Coarse classification callers use to decide how a failure is accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The tool ran and reported failure, or overran its deadline.
    Command,
    /// The tool could not be run at all.
    Fatal,
    /// The run was stopped from outside.
    Cancellation,
}

impl ExecError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ExecError::NonZeroExit { .. } | ExecError::KilledBySignal { .. } | ExecError::Timeout(_) => {
                ErrorClass::Command
            }
            ExecError::Spawn(_)
            | ExecError::MissingProgram
            | ExecError::Io(_)
            | ExecError::Provision(_)
            | ExecError::PoolDrained => ErrorClass::Fatal,
            ExecError::Cancelled => ErrorClass::Cancellation,
        }
    }

    /// Cancellation aborts are already accounted for by whoever cancelled.
    #[inline]
    pub fn counts_against_budget(&self) -> bool {
        self.class() != ErrorClass::Cancellation
    }
}

impl From<std::io::Error> for ExecError {
    fn from(e: std::io::Error) -> Self {
        ExecError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        let exit = ExecError::NonZeroExit {
            code: 1,
            output: "FAILED".into(),
        };
        assert_eq!(exit.class(), ErrorClass::Command);
        assert!(exit.counts_against_budget());

        assert_eq!(
            ExecError::Timeout(Duration::from_secs(1)).class(),
            ErrorClass::Command
        );
        assert_eq!(ExecError::Spawn("enoent".into()).class(), ErrorClass::Fatal);
        assert_eq!(ExecError::Cancelled.class(), ErrorClass::Cancellation);
        assert!(!ExecError::Cancelled.counts_against_budget());
    }
}
