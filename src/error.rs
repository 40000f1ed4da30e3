use serde::Serialize;
use std::env;
use std::fmt::{self, Debug, Display};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Error {
    pub code: i32,
    pub message: String,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

impl From<env::VarError> for Error {
    fn from(err: env::VarError) -> Self {
        env_var_error(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        reqwest_error(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        decode_error(err)
    }
}

/// Coarse classification surfaced to the UI layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Submission,
    PollTransport,
    JobFailed,
    Timeout,
    RenderDefect,
    InvalidState,
    Surface,
    Config,
    Upstream,
    Unexpected,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self.code {
            100 => ErrorKind::Submission,
            101 => ErrorKind::PollTransport,
            102 => ErrorKind::JobFailed,
            103 => ErrorKind::Timeout,
            104 => ErrorKind::RenderDefect,
            105 => ErrorKind::InvalidState,
            106 => ErrorKind::Surface,
            1 => ErrorKind::Config,
            3 | 4 => ErrorKind::Upstream,
            _ => ErrorKind::Unexpected,
        }
    }

    pub fn is_submission_error(&self) -> bool {
        self.kind() == ErrorKind::Submission
    }

    pub fn is_poll_transport_error(&self) -> bool {
        self.kind() == ErrorKind::PollTransport
    }

    pub fn is_timeout_error(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    pub fn is_job_failed_error(&self) -> bool {
        self.kind() == ErrorKind::JobFailed
    }

    /// Re-tags a transport-level error raised while submitting.
    pub fn into_submission_error(self) -> Error {
        match self.kind() {
            ErrorKind::Submission => self,
            _ => submission_error(self.message),
        }
    }

    /// Re-tags a transport-level error raised while polling.
    pub fn into_poll_transport_error(self) -> Error {
        match self.kind() {
            ErrorKind::PollTransport => self,
            _ => poll_transport_error(self.message),
        }
    }
}

pub fn submission_error<S: Into<String>>(message: S) -> Error {
    Error {
        code: 100,
        message: message.into(),
    }
}

pub fn poll_transport_error<S: Into<String>>(message: S) -> Error {
    Error {
        code: 101,
        message: message.into(),
    }
}

pub fn job_failed_error<S: Into<String>>(message: S) -> Error {
    Error {
        code: 102,
        message: message.into(),
    }
}

pub fn timeout_error(attempts: u32) -> Error {
    Error {
        code: 103,
        message: format!("route analysis still running after {} polls", attempts),
    }
}

pub fn render_defect_error<S: Into<String>>(message: S) -> Error {
    Error {
        code: 104,
        message: message.into(),
    }
}

pub fn invalid_state_error() -> Error {
    Error {
        code: 105,
        message: "invalid state".into(),
    }
}

pub fn surface_error<S: Into<String>>(message: S) -> Error {
    Error {
        code: 106,
        message: message.into(),
    }
}

pub fn env_var_error(_: env::VarError) -> Error {
    Error {
        code: 1,
        message: "environment variable error".into(),
    }
}

pub fn config_error<S: Into<String>>(message: S) -> Error {
    Error {
        code: 1,
        message: message.into(),
    }
}

pub fn decode_error<T: Debug>(err: T) -> Error {
    Error {
        code: 2,
        message: format!("decode error: {:?}", err),
    }
}

pub fn reqwest_error(err: reqwest::Error) -> Error {
    Error {
        code: 3,
        message: format!("reqwest error: {}", err),
    }
}

pub fn upstream_error() -> Error {
    Error {
        code: 4,
        message: "upstream error".into(),
    }
}

pub fn unexpected_error() -> Error {
    Error {
        code: 5,
        message: "unexpected error".into(),
    }
}

#[test]
fn error_kinds_from_codes() {
    assert_eq!(submission_error("x").kind(), ErrorKind::Submission);
    assert_eq!(timeout_error(3).kind(), ErrorKind::Timeout);
    assert_eq!(upstream_error().kind(), ErrorKind::Upstream);
    assert_eq!(unexpected_error().kind(), ErrorKind::Unexpected);

    let retagged = upstream_error().into_poll_transport_error();
    assert!(retagged.is_poll_transport_error());
    assert_eq!(retagged.message, "upstream error");
}
