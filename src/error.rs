//! Error taxonomy for the storage core.
//!
//! Errors partition into three kinds, per the three-way split the rest of
//! the crate relies on: [`ErrorKind::Usage`] variants are caller mistakes
//! that must not corrupt state, [`ErrorKind::Storage`] wraps a KV-layer
//! failure with its numeric code preserved, and [`ErrorKind::Fatal`]
//! represents an invariant violation that a caller must not try to
//! recover from.

use std::{fmt, io, result};

/// Crate-wide result alias.
pub type Result<T> = result::Result<T, Error>;

/// One error, tagged with the file/line that raised it (set by [`err_at!`])
/// and carrying a human message.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    file: &'static str,
    line: u32,
    msg: String,
}

impl Error {
    pub fn new(kind: ErrorKind, file: &'static str, line: u32, msg: String) -> Error {
        Error {
            kind,
            file,
            line,
            msg,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Stable numeric code for the error, preserved across Display/Debug
    /// formatting for diagnostics.
    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    pub fn is_usage(&self) -> bool {
        matches!(self.kind, ErrorKind::Usage(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self.kind, ErrorKind::Storage(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, ErrorKind::Fatal)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}:{}] ({}) {} {}",
            self.file,
            self.line,
            self.code(),
            self.kind,
            self.msg
        )
    }
}

impl std::error::Error for Error {}

/// Error categories. `Usage` carries stable, named error codes callers
/// can match on; `Storage` wraps a code coming out of the KV engine;
/// `Fatal` marks an invariant violation (dangling edge, corrupt catalog)
/// that the caller must not attempt to paper over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Usage(UsageError),
    Storage(StorageError),
    Fatal,
    /// A conversion between integer/size types failed.
    FailConvert,
    /// Decoding a payload or key ran into malformed bytes.
    DecodeFail,
    /// An `std::io` operation failed outside of the KV engine (lock file,
    /// config file).
    IoError,
    /// A background/auxiliary thread panicked or a lock was poisoned.
    ThreadFail,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::Usage(u) => write!(f, "usage:{}", u),
            ErrorKind::Storage(s) => write!(f, "storage:{}", s),
            ErrorKind::Fatal => write!(f, "fatal"),
            ErrorKind::FailConvert => write!(f, "fail-convert"),
            ErrorKind::DecodeFail => write!(f, "decode-fail"),
            ErrorKind::IoError => write!(f, "io-error"),
            ErrorKind::ThreadFail => write!(f, "thread-fail"),
        }
    }
}

impl ErrorKind {
    pub fn code(&self) -> i32 {
        match self {
            ErrorKind::Usage(u) => u.code(),
            ErrorKind::Storage(s) => 2000 + s.raw_code(),
            ErrorKind::Fatal => 9000,
            ErrorKind::FailConvert => 9001,
            ErrorKind::DecodeFail => 9002,
            ErrorKind::IoError => 9003,
            ErrorKind::ThreadFail => 9004,
        }
    }
}

/// The named usage-error constants, each a stable integer code plus a
/// human string via [`fmt::Display`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageError {
    NoExistClass,
    NoExistProperty,
    NoExistIndex,
    DuplicateClass,
    DuplicateProperty,
    DuplicateIndex,
    InvalidClassName,
    InvalidPropertyName,
    InvalidClassType,
    InvalidPropType,
    NoExistVertex,
    ContextLocked,
    ClassNotEmpty,
    DuplicateKey,
    WriterBusy,
    CursorExpired,
    CyclicInheritance,
}

impl UsageError {
    pub fn code(&self) -> i32 {
        use UsageError::*;
        match self {
            NoExistClass => 1001,
            NoExistProperty => 1002,
            NoExistIndex => 1003,
            DuplicateClass => 1004,
            DuplicateProperty => 1005,
            DuplicateIndex => 1006,
            InvalidClassName => 1007,
            InvalidPropertyName => 1008,
            InvalidClassType => 1009,
            InvalidPropType => 1010,
            NoExistVertex => 1011,
            ContextLocked => 1012,
            ClassNotEmpty => 1013,
            DuplicateKey => 1014,
            WriterBusy => 1015,
            CursorExpired => 1016,
            CyclicInheritance => 1017,
        }
    }
}

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Storage-layer error categories: every LMDB failure is surfaced as one
/// of these, with the original numeric code preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    MapFull,
    ReadersExhausted,
    InvalidHandle,
    Other(i32),
}

impl StorageError {
    pub fn raw_code(&self) -> i32 {
        match self {
            StorageError::NotFound => 1,
            StorageError::MapFull => 2,
            StorageError::ReadersExhausted => 3,
            StorageError::InvalidHandle => 4,
            StorageError::Other(code) => *code,
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<lmdb::Error> for StorageError {
    fn from(err: lmdb::Error) -> StorageError {
        match err {
            lmdb::Error::NotFound => StorageError::NotFound,
            lmdb::Error::MapFull => StorageError::MapFull,
            lmdb::Error::ReadersFull => StorageError::ReadersExhausted,
            lmdb::Error::BadTxn | lmdb::Error::BadValSize | lmdb::Error::Invalid => {
                StorageError::InvalidHandle
            }
            other => StorageError::Other(other.to_err_code()),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::new(ErrorKind::IoError, file!(), line!(), err.to_string())
    }
}

impl From<lmdb::Error> for Error {
    fn from(err: lmdb::Error) -> Error {
        let storage: StorageError = err.into();
        Error::new(ErrorKind::Storage(storage), file!(), line!(), err.to_string())
    }
}

/// Tag a fallible expression (or construct a fresh failure) with the call
/// site and a kind, the way the rest of this crate's ancestors do it:
///
/// ```ignore
/// err_at!(IoError, fs::read(path))?;
/// err_at!(Usage(UsageError::NoExistClass), msg: "class {:?} not found", name)?;
/// ```
#[macro_export]
macro_rules! err_at {
    ($v:ident, msg: $($arg:expr),+ $(,)?) => {{
        let msg = format!($($arg),+);
        Err($crate::error::Error::new(
            $crate::error::ErrorKind::$v, file!(), line!(), msg,
        ))
    }};
    (Usage($variant:expr), msg: $($arg:expr),+ $(,)?) => {{
        let msg = format!($($arg),+);
        Err($crate::error::Error::new(
            $crate::error::ErrorKind::Usage($variant), file!(), line!(), msg,
        ))
    }};
    (Usage($variant:expr), $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => Err($crate::error::Error::new(
                $crate::error::ErrorKind::Usage($variant),
                file!(),
                line!(),
                format!("{}", err),
            )),
        }
    }};
    ($v:ident, $e:expr) => {{
        match $e {
            Ok(val) => Ok(val),
            Err(err) => Err($crate::error::Error::new(
                $crate::error::ErrorKind::$v, file!(), line!(), format!("{}", err),
            )),
        }
    }};
}
