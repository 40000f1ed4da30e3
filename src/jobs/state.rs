use serde::{Deserialize, Serialize};

use crate::error::{invalid_state_error, Error};

/// Lifecycle of the client's single active analysis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    Submitting,
    Polling,
    Completed,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobState {
    pub fn name(&self) -> String {
        match self {
            Self::Idle => "idle".into(),
            Self::Submitting => "submitting".into(),
            Self::Polling => "polling".into(),
            Self::Completed => "completed".into(),
            Self::Failed => "failed".into(),
            Self::TimedOut => "timed_out".into(),
            Self::Cancelled => "cancelled".into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Submitting | Self::Polling)
    }

    /// `Idle` or any terminal state may start a new analysis.
    pub fn submit(&mut self) -> Result<(), Error> {
        match self {
            Self::Idle | Self::Completed | Self::Failed | Self::TimedOut | Self::Cancelled => {
                *self = Self::Submitting;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    pub fn accepted(&mut self) -> Result<(), Error> {
        match self {
            Self::Submitting => {
                *self = Self::Polling;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    pub fn complete(&mut self) -> Result<(), Error> {
        self.finish(Self::Completed)
    }

    pub fn fail(&mut self) -> Result<(), Error> {
        match self {
            Self::Submitting | Self::Polling => {
                *self = Self::Failed;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    pub fn time_out(&mut self) -> Result<(), Error> {
        self.finish(Self::TimedOut)
    }

    pub fn cancel(&mut self) -> Result<(), Error> {
        match self {
            Self::Submitting | Self::Polling => {
                *self = Self::Cancelled;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    fn finish(&mut self, terminal: JobState) -> Result<(), Error> {
        match self {
            Self::Polling => {
                *self = terminal;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let mut state = JobState::default();
        state.submit().unwrap();
        assert!(state.is_loading());
        state.accepted().unwrap();
        state.complete().unwrap();
        assert!(state.is_terminal());

        // terminal states re-enter through submit
        state.submit().unwrap();
        assert_eq!(state, JobState::Submitting);
    }

    #[test]
    fn cancel_only_while_loading() {
        let mut state = JobState::Idle;
        assert!(state.cancel().is_err());

        state.submit().unwrap();
        state.cancel().unwrap();
        assert_eq!(state, JobState::Cancelled);
        assert!(state.cancel().is_err());

        let mut done = JobState::Polling;
        done.time_out().unwrap();
        assert!(done.cancel().is_err());
        assert_eq!(done, JobState::TimedOut);
    }

    #[test]
    fn no_second_terminal_state() {
        let mut state = JobState::Polling;
        state.fail().unwrap();
        assert!(state.complete().is_err());
        assert!(state.time_out().is_err());
        assert_eq!(state, JobState::Failed);
    }

    #[test]
    fn submitting_can_fail_but_not_complete() {
        let mut state = JobState::Submitting;
        assert!(state.complete().is_err());
        state.fail().unwrap();
        assert_eq!(state.name(), "failed");
    }
}
