use serde::{Serialize, Serializer};
use time::OffsetDateTime;

use crate::{Outcome, timestamp};

/// Recorded state of one unit in one phase.
///
/// A pending or skipped phase has no timestamps; a finished phase always has both.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PhaseState {
    outcome: Outcome,
    started_at: Option<OffsetDateTime>,
    ended_at: Option<OffsetDateTime>,
}

impl PhaseState {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn skipped() -> Self {
        Self {
            outcome: Outcome::Skipped,
            ..Self::default()
        }
    }

    /// State of a phase that ran from `started_at` to `ended_at`.
    pub fn finished(succeeded: bool, started_at: OffsetDateTime, ended_at: OffsetDateTime) -> Self {
        Self {
            outcome: if succeeded {
                Outcome::Succeeded
            } else {
                Outcome::Failed
            },
            started_at: Some(started_at),
            ended_at: Some(ended_at),
        }
    }

    #[inline]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    #[inline]
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Succeeded
    }

    /// Wall-clock duration in nanoseconds; zero when the phase never ran.
    pub fn duration_ns(&self) -> i64 {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => {
                let ns = (end - start).whole_nanoseconds();
                i64::try_from(ns).unwrap_or(i64::MAX)
            }
            _ => 0,
        }
    }
}

#[derive(Serialize)]
struct WireState {
    succeeded: bool,
    start_time: Option<String>,
    end_time: Option<String>,
    duration_ns: i64,
}

impl Serialize for PhaseState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let fmt = |ts: Option<OffsetDateTime>| -> Result<Option<String>, S::Error> {
            ts.map(timestamp::format)
                .transpose()
                .map_err(serde::ser::Error::custom)
        };

        WireState {
            succeeded: self.succeeded(),
            start_time: fmt(self.started_at)?,
            end_time: fmt(self.ended_at)?,
            duration_ns: self.duration_ns(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn skipped_serializes_like_never_attempted() {
        let skipped = serde_json::to_value(PhaseState::skipped()).unwrap();
        let pending = serde_json::to_value(PhaseState::pending()).unwrap();

        assert_eq!(skipped, pending);
        assert_eq!(
            skipped,
            serde_json::json!({
                "succeeded": false,
                "start_time": null,
                "end_time": null,
                "duration_ns": 0
            })
        );
    }

    #[test]
    fn skipped_and_pending_differ_in_memory() {
        assert_eq!(PhaseState::skipped().outcome(), Outcome::Skipped);
        assert_eq!(PhaseState::pending().outcome(), Outcome::Pending);
        assert_ne!(PhaseState::skipped(), PhaseState::pending());
    }

    #[test]
    fn failed_state_keeps_timestamps() {
        let start = datetime!(2024-03-05 07:08:09.000 UTC);
        let end = datetime!(2024-03-05 07:08:10.500 UTC);
        let state = PhaseState::finished(false, start, end);

        assert_eq!(state.outcome(), Outcome::Failed);
        assert!(!state.succeeded());
        assert_eq!(state.duration_ns(), 1_500_000_000);

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["succeeded"], false);
        assert_eq!(json["start_time"], "2024-03-05T07:08:09.000+0000");
        assert_eq!(json["end_time"], "2024-03-05T07:08:10.500+0000");
        assert_eq!(json["duration_ns"], 1_500_000_000i64);
    }
}
