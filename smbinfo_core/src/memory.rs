//! Read-only views of physical memory.

use std::io;
use std::ops::Deref;

use crate::error::{Result, SmbiosError};

#[cfg(unix)]
use crate::platform::Mapping;

/// Bytes of a structure table or physical memory window.
///
/// A mapped view is released when the value is dropped.
pub enum TableBytes<'a> {
    #[cfg(unix)]
    Mapped(Mapping),
    Borrowed(&'a [u8]),
    Owned(Vec<u8>),
}

impl Deref for TableBytes<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            #[cfg(unix)]
            TableBytes::Mapped(mapping) => mapping.as_slice(),
            TableBytes::Borrowed(bytes) => bytes,
            TableBytes::Owned(bytes) => bytes,
        }
    }
}

impl std::fmt::Debug for TableBytes<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            #[cfg(unix)]
            TableBytes::Mapped(_) => "Mapped",
            TableBytes::Borrowed(_) => "Borrowed",
            TableBytes::Owned(_) => "Owned",
        };
        write!(f, "TableBytes::{}({} bytes)", kind, self.len())
    }
}

/// Source of physical memory contents.
pub trait PhysicalMemory {
    /// Returns a view whose first byte is the byte at physical `address`.
    fn read(&self, address: u64, length: usize) -> Result<TableBytes<'_>>;
}

/// Physical memory device such as `/dev/mem`, accessed through `mmap`.
#[cfg(unix)]
pub struct DevMem {
    file: std::fs::File,
}

#[cfg(unix)]
impl DevMem {
    pub fn open(path: &std::path::Path) -> Result<DevMem> {
        let file = std::fs::File::open(path)?;
        Ok(DevMem { file })
    }
}

#[cfg(unix)]
impl PhysicalMemory for DevMem {
    fn read(&self, address: u64, length: usize) -> Result<TableBytes<'_>> {
        if length == 0 {
            return Ok(TableBytes::Borrowed(&[]));
        }
        let mapping = Mapping::map_readonly(&self.file, address, length)?;
        Ok(TableBytes::Mapped(mapping))
    }
}

/// A captured image of physical memory starting at `base`.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    base: u64,
    bytes: Vec<u8>,
}

impl MemoryImage {
    pub fn new(base: u64, bytes: Vec<u8>) -> Self {
        MemoryImage { base, bytes }
    }
}

impl PhysicalMemory for MemoryImage {
    fn read(&self, address: u64, length: usize) -> Result<TableBytes<'_>> {
        let start = address
            .checked_sub(self.base)
            .and_then(|off| usize::try_from(off).ok());
        let window = start.and_then(|start| self.bytes.get(start..start.checked_add(length)?));
        match window {
            Some(bytes) => Ok(TableBytes::Borrowed(bytes)),
            None => Err(SmbiosError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{:#x}+{:#x} outside memory image", address, length),
            ))),
        }
    }
}
