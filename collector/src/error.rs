use std::{error::Error, fmt, io};

/// The collector's result type.
pub type Result<T> = std::result::Result<T, CollectorErr>;

/// Collector runtime failures.
#[derive(Debug)]
pub enum CollectorErr {
    Io(io::Error),
    Csv(csv::Error),
    InvalidConfig(String),
}

impl fmt::Display for CollectorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectorErr::Io(e) => write!(f, "io error: {e}"),
            CollectorErr::Csv(e) => write!(f, "csv error: {e}"),
            CollectorErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl Error for CollectorErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CollectorErr::Io(e) => Some(e),
            CollectorErr::Csv(e) => Some(e),
            CollectorErr::InvalidConfig(_) => None,
        }
    }
}

impl From<io::Error> for CollectorErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for CollectorErr {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<CollectorErr> for io::Error {
    fn from(value: CollectorErr) -> Self {
        match value {
            CollectorErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
