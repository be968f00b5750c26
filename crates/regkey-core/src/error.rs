//! Error types for regkey.
//!
//! Every fallible operation returns exactly one [`RegError`]. Backend failures
//! arrive as [`OsError`] and are translated at the call site into the nearest
//! taxonomy entry; nothing is wrapped or retried.

use thiserror::Error;

/// Failure reported by a [`RegKey`](crate::RegKey) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RegError {
    #[error("unknown registry error")]
    UnknownError,

    #[error("root key is not one of the predefined root scopes")]
    InvalidRoot,

    #[error("key path is invalid or exceeds the path length limit")]
    InvalidPath,

    /// Kept for code compatibility. Output locations are return values here,
    /// so no operation produces this.
    #[error("invalid output location")]
    InvalidPointer,

    #[error("access denied")]
    AccessDenied,

    #[error("invalid value payload")]
    InvalidValue,

    #[error("stored value has a different type")]
    IncorrectType,

    #[error("key path does not exist")]
    PathNotExist,

    #[error("key is not opened")]
    KeyNotOpened,

    #[error("string exceeds 255 characters")]
    StrTooLong,

    #[error("value does not exist")]
    ValueNotExist,

    #[error("value does not fit the read buffer")]
    BufferOverflow,

    #[error("key is already at the root of its scope")]
    KeyIsRoot,
}

/// Result type alias for regkey operations.
pub type Result<T> = std::result::Result<T, RegError>;

impl RegError {
    const ALL: [RegError; 13] = [
        RegError::UnknownError,
        RegError::InvalidRoot,
        RegError::InvalidPath,
        RegError::InvalidPointer,
        RegError::AccessDenied,
        RegError::InvalidValue,
        RegError::IncorrectType,
        RegError::PathNotExist,
        RegError::KeyNotOpened,
        RegError::StrTooLong,
        RegError::ValueNotExist,
        RegError::BufferOverflow,
        RegError::KeyIsRoot,
    ];

    /// Legacy numeric status code.
    ///
    /// Success is `0`; errors are the negative codes `-1` through `-13` in
    /// declaration order.
    pub fn code(&self) -> i32 {
        match self {
            RegError::UnknownError => -0x1,
            RegError::InvalidRoot => -0x2,
            RegError::InvalidPath => -0x3,
            RegError::InvalidPointer => -0x4,
            RegError::AccessDenied => -0x5,
            RegError::InvalidValue => -0x6,
            RegError::IncorrectType => -0x7,
            RegError::PathNotExist => -0x8,
            RegError::KeyNotOpened => -0x9,
            RegError::StrTooLong => -0xA,
            RegError::ValueNotExist => -0xB,
            RegError::BufferOverflow => -0xC,
            RegError::KeyIsRoot => -0xD,
        }
    }

    /// Map a legacy status code back to an error.
    ///
    /// Returns `None` for the success code and for codes outside the taxonomy.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }

    /// Translate a backend failure for value-level operations.
    pub(crate) fn from_value_os(err: OsError) -> Self {
        match err {
            OsError::AccessDenied => RegError::AccessDenied,
            OsError::NotFound => RegError::ValueNotExist,
            _ => RegError::UnknownError,
        }
    }

    /// Translate a backend failure for writes, where not-found has no
    /// dedicated meaning.
    pub(crate) fn from_write_os(err: OsError) -> Self {
        match err {
            OsError::AccessDenied => RegError::AccessDenied,
            _ => RegError::UnknownError,
        }
    }
}

/// Status reported by a [`RegistryBackend`](crate::backend::RegistryBackend).
///
/// Mirrors the handful of OS error codes the key layer distinguishes; every
/// other code is carried through as [`OsError::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum OsError {
    #[error("the system cannot find the file specified")]
    NotFound,

    #[error("access is denied")]
    AccessDenied,

    #[error("the handle is invalid")]
    InvalidHandle,

    #[error("more data is available")]
    MoreData,

    #[error("illegal operation attempted on a registry key that has been marked for deletion")]
    KeyDeleted,

    #[error("the data is invalid")]
    InvalidData,

    #[error("os error {0}")]
    Other(u32),
}

impl OsError {
    pub const ERROR_FILE_NOT_FOUND: u32 = 2;
    pub const ERROR_ACCESS_DENIED: u32 = 5;
    pub const ERROR_INVALID_HANDLE: u32 = 6;
    pub const ERROR_INVALID_DATA: u32 = 13;
    pub const ERROR_MORE_DATA: u32 = 234;
    pub const ERROR_KEY_DELETED: u32 = 1018;

    /// Classify a raw Win32 error code.
    pub fn from_win32(code: u32) -> Self {
        match code {
            Self::ERROR_FILE_NOT_FOUND => OsError::NotFound,
            Self::ERROR_ACCESS_DENIED => OsError::AccessDenied,
            Self::ERROR_INVALID_HANDLE => OsError::InvalidHandle,
            Self::ERROR_INVALID_DATA => OsError::InvalidData,
            Self::ERROR_MORE_DATA => OsError::MoreData,
            Self::ERROR_KEY_DELETED => OsError::KeyDeleted,
            other => OsError::Other(other),
        }
    }

    /// Raw Win32 error code for this status.
    pub fn win32_code(&self) -> u32 {
        match self {
            OsError::NotFound => Self::ERROR_FILE_NOT_FOUND,
            OsError::AccessDenied => Self::ERROR_ACCESS_DENIED,
            OsError::InvalidHandle => Self::ERROR_INVALID_HANDLE,
            OsError::InvalidData => Self::ERROR_INVALID_DATA,
            OsError::MoreData => Self::ERROR_MORE_DATA,
            OsError::KeyDeleted => Self::ERROR_KEY_DELETED,
            OsError::Other(code) => *code,
        }
    }
}

/// Backend result alias.
pub type OsResult<T> = std::result::Result<T, OsError>;
