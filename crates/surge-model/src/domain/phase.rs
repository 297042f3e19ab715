use std::fmt;

/// One bounded-concurrency pass over the unit collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Upload the unit without starting it.
    Deploy,
    /// Start the unit and health-check its route.
    Activate,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Deploy => "deploy",
            Phase::Activate => "activate",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one phase for one unit.
///
/// `Pending -> {Succeeded | Failed | Skipped}`; the in-flight step is never stored.
/// `Skipped` means the unit was never attempted because the run had already been cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Outcome {
    #[default]
    Pending,
    Succeeded,
    Failed,
    Skipped,
}

impl Outcome {
    /// Returns `true` once the phase has a final outcome.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Pending)
    }
}
