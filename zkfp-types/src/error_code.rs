//! Outward error codes
//!
//! These values are part of the C ABI of the vendor SDK and must never
//! change. `AlreadyInit` is the only positive code.

use std::fmt;

use crate::error::{Error, Result};

/// SDK result codes
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    AlreadyInit = 1,
    Ok = 0,
    InitLib = -1,
    Init = -2,
    NoDevice = -3,
    NotSupport = -4,
    InvalidParam = -5,
    Open = -6,
    InvalidHandle = -7,
    Capture = -8,
    ExtractFp = -9,
    Absort = -10,
    MemoryNotEnough = -11,
    Busy = -12,
    AddFinger = -13,
    DelFinger = -14,
    Fail = -17,
    Cancel = -18,
    VerifyFp = -20,
    Merge = -22,
    NotOpened = -23,
    NotInit = -24,
    AlreadyOpened = -25,
    LoadImage = -26,
    AnalyseImg = -27,
    Timeout = -28,
}

impl ErrorCode {
    /// Numeric ABI value
    pub fn value(self) -> i32 {
        self as i32
    }

    /// Check if this code signals success
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok | Self::AlreadyInit)
    }

    /// Get code name
    pub fn name(self) -> &'static str {
        match self {
            Self::AlreadyInit => "ALREADY_INIT",
            Self::Ok => "OK",
            Self::InitLib => "INITLIB",
            Self::Init => "INIT",
            Self::NoDevice => "NO_DEVICE",
            Self::NotSupport => "NOT_SUPPORT",
            Self::InvalidParam => "INVALID_PARAM",
            Self::Open => "OPEN",
            Self::InvalidHandle => "INVALID_HANDLE",
            Self::Capture => "CAPTURE",
            Self::ExtractFp => "EXTRACT_FP",
            Self::Absort => "ABSORT",
            Self::MemoryNotEnough => "MEMORY_NOT_ENOUGH",
            Self::Busy => "BUSY",
            Self::AddFinger => "ADD_FINGER",
            Self::DelFinger => "DEL_FINGER",
            Self::Fail => "FAIL",
            Self::Cancel => "CANCEL",
            Self::VerifyFp => "VERIFY_FP",
            Self::Merge => "MERGE",
            Self::NotOpened => "NOT_OPENED",
            Self::NotInit => "NOT_INIT",
            Self::AlreadyOpened => "ALREADY_OPENED",
            Self::LoadImage => "LOADIMAGE",
            Self::AnalyseImg => "ANALYSE_IMG",
            Self::Timeout => "TIMEOUT",
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> i32 {
        code as i32
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(Self::AlreadyInit),
            0 => Ok(Self::Ok),
            -1 => Ok(Self::InitLib),
            -2 => Ok(Self::Init),
            -3 => Ok(Self::NoDevice),
            -4 => Ok(Self::NotSupport),
            -5 => Ok(Self::InvalidParam),
            -6 => Ok(Self::Open),
            -7 => Ok(Self::InvalidHandle),
            -8 => Ok(Self::Capture),
            -9 => Ok(Self::ExtractFp),
            -10 => Ok(Self::Absort),
            -11 => Ok(Self::MemoryNotEnough),
            -12 => Ok(Self::Busy),
            -13 => Ok(Self::AddFinger),
            -14 => Ok(Self::DelFinger),
            -17 => Ok(Self::Fail),
            -18 => Ok(Self::Cancel),
            -20 => Ok(Self::VerifyFp),
            -22 => Ok(Self::Merge),
            -23 => Ok(Self::NotOpened),
            -24 => Ok(Self::NotInit),
            -25 => Ok(Self::AlreadyOpened),
            -26 => Ok(Self::LoadImage),
            -27 => Ok(Self::AnalyseImg),
            -28 => Ok(Self::Timeout),
            _ => Err(Error::Parse(format!("unknown error code {value}"))),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as i32)
    }
}
