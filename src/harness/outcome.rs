use std::fmt;

use serde::Serialize;

pub const SUCCESS_MESSAGE: &str = "Completed successfully";
pub const CANCELLED_MESSAGE: &str = "Task cancelled";

/// Terminal classification of a work unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResultCode {
    Success,
    Failure,
    Cancelled,
}

impl ResultCode {
    /// Process exit code. 1223 is the conventional "operation cancelled by the user" code.
    pub fn exit_code(self) -> i32 {
        match self {
            ResultCode::Success => 0,
            ResultCode::Failure => 1,
            ResultCode::Cancelled => 1223,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultCode::Success => write!(f, "Success"),
            ResultCode::Failure => write!(f, "Failure"),
            ResultCode::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// What happened to one work unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub name: String,
    pub code: ResultCode,
    pub message: String,
}

impl Outcome {
    pub fn success(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: ResultCode::Success,
            message: SUCCESS_MESSAGE.to_string(),
        }
    }

    pub fn failure(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: ResultCode::Failure,
            message: message.into(),
        }
    }

    pub fn cancelled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: ResultCode::Cancelled,
            message: CANCELLED_MESSAGE.to_string(),
        }
    }
}
