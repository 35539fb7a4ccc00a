use std::fmt;
use std::panic::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Errno,          // OS-level failure, errno is attached
    FileNotFound,
    OpenFailed,
    Corrupt,
    Parse,
    InvalidQuery,
    InvalidArgument,
    NotInit,
    Unsupported,
}

/// Crate error: a kind, free-form context, where it was raised and the OS
/// error number for `Errno` failures.
#[derive(Debug, thiserror::Error)]
#[error("{kind:?} at {origin}: {context}")]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
    pub origin: Origin,
    pub errno: Option<i32>,
}

/// Source location an error was raised at.
#[derive(Debug, Clone, Copy)]
pub struct Origin {
    pub file: &'static str,
    pub line: u32,
}

impl Origin {
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Origin {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

impl Error {
    #[track_caller]
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error {
            kind,
            context: context.into(),
            origin: Origin::caller(),
            errno: None,
        }
    }

    #[track_caller]
    pub fn errno(errno: i32, context: impl Into<String>) -> Self {
        Error {
            kind: ErrorKind::Errno,
            context: context.into(),
            origin: Origin::caller(),
            errno: Some(errno),
        }
    }

    /// Re-tag an error while keeping its origin and errno.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_context(mut self, context: impl fmt::Display) -> Self {
        self.context = format!("{}: {}", context, self.context);
        self
    }

    pub fn is_recoverable_open_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::FileNotFound | ErrorKind::Errno | ErrorKind::Io)
    }

    /// Emit this error through `tracing`, prefixed with the failed stage.
    pub fn log(&self, stage: &str) {
        match self.errno {
            Some(errno) => tracing::error!(
                kind = ?self.kind,
                origin = %self.origin,
                errno,
                "{} failed: {}",
                stage,
                self.context
            ),
            None => tracing::error!(
                kind = ?self.kind,
                origin = %self.origin,
                "{} failed: {}",
                stage,
                self.context
            ),
        }
    }
}

impl From<std::io::Error> for Error {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        let kind = match (err.kind(), err.raw_os_error()) {
            (std::io::ErrorKind::NotFound, _) => ErrorKind::FileNotFound,
            (_, Some(_)) => ErrorKind::Errno,
            _ => ErrorKind::Io,
        };
        Error {
            kind,
            context: err.to_string(),
            origin: Origin::caller(),
            errno: err.raw_os_error(),
        }
    }
}

impl From<bincode::Error> for Error {
    #[track_caller]
    fn from(err: bincode::Error) -> Self {
        Error::new(ErrorKind::Corrupt, err.to_string())
    }
}

impl From<fst::Error> for Error {
    #[track_caller]
    fn from(err: fst::Error) -> Self {
        Error::new(ErrorKind::Corrupt, format!("FST error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
