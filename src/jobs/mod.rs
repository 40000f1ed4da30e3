//! Route analysis jobs: submission, polling and cancellation.

mod client;
mod poll;
mod state;

pub use client::{JobClient, JobEvent, JobHandle};
pub use poll::{poll_until_terminal, PollPolicy};
pub use state::JobState;
