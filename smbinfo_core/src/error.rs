use std::error;
use std::fmt;
use std::io;

/// Errors produced while locating or reading the SMBIOS structure table.
#[derive(Debug)]
pub enum SmbiosError {
    /// No valid entry point or structure table was found by any source.
    NotFound,

    /// A device or file could not be opened, mapped or read.
    Io(io::Error),

    /// A record's declared length or string table overruns the buffer.
    MalformedRecord { offset: usize },
}

impl fmt::Display for SmbiosError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmbiosError::NotFound => write!(f, "SMBIOS entry point not found"),
            SmbiosError::Io(err) => write!(f, "IO error: {}", err),
            SmbiosError::MalformedRecord { offset } => {
                write!(f, "malformed SMBIOS record at offset {:#x}", offset)
            }
        }
    }
}

impl error::Error for SmbiosError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            SmbiosError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SmbiosError {
    fn from(err: io::Error) -> Self {
        SmbiosError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, SmbiosError>;
