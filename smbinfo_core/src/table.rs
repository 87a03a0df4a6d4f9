//! Walks the structure table as a sequence of raw records.
//!
//! Each record is a 4-byte header (`type`, `length`, `handle`), the rest of
//! its formatted area, then a string set terminated by two NUL bytes.

use log::{debug, warn};

use crate::error::{Result, SmbiosError};
use crate::strings::StringTable;

pub const END_OF_TABLE: u8 = 127;
pub const HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    pub kind: u8,
    /// Length of the formatted area, header included.
    pub length: u8,
    pub handle: u16,
    /// The formatted area; `body.len() == length`.
    pub body: &'a [u8],
    pub strings: StringTable<'a>,
}

impl<'a> RawRecord<'a> {
    pub fn byte(&self, offset: usize) -> Option<u8> {
        self.body.get(offset).copied()
    }

    pub fn word(&self, offset: usize) -> Option<u16> {
        let bytes = self.body.get(offset..offset + 2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn dword(&self, offset: usize) -> Option<u32> {
        let bytes = self.body.get(offset..offset + 4)?;
        Some(u32::from_le_bytes(bytes.try_into().ok()?))
    }

    pub fn qword(&self, offset: usize) -> Option<u64> {
        let bytes = self.body.get(offset..offset + 8)?;
        Some(u64::from_le_bytes(bytes.try_into().ok()?))
    }

    /// Resolves the string whose index is stored at `offset`.
    pub fn string(&self, offset: usize) -> Option<String> {
        self.byte(offset).map(|index| self.strings.get(index))
    }
}

/// Parses the record at `offset`, returning it with the offset of the next
/// record, or `None` if its string set is not terminated within `buf`.
pub fn parse_record(buf: &[u8], offset: usize) -> Result<(RawRecord<'_>, Option<usize>)> {
    let malformed = || SmbiosError::MalformedRecord { offset };

    let header = buf.get(offset..offset + HEADER_LEN).ok_or_else(malformed)?;
    let length = header[1];
    if (length as usize) < HEADER_LEN {
        return Err(malformed());
    }
    let body_end = offset + length as usize;
    let body = buf.get(offset..body_end).ok_or_else(malformed)?;

    let tail = &buf[body_end..];
    let (region, next) = match tail.windows(2).position(|w| w[0] == 0 && w[1] == 0) {
        Some(end) => (&tail[..end], Some(body_end + end + 2)),
        None => (tail, None),
    };

    let record = RawRecord {
        kind: header[0],
        length,
        handle: u16::from_le_bytes([header[2], header[3]]),
        body,
        strings: StringTable::new(region),
    };
    Ok((record, next))
}

/// Lazy iterator over the records of a structure table.
///
/// Ends after the End-of-Table record, at the end of the buffer, or at the
/// first record that does not fit the buffer.
#[derive(Debug, Clone)]
pub struct Records<'a> {
    buf: &'a [u8],
    pos: usize,
    done: bool,
    malformed: Option<usize>,
}

impl<'a> Records<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Records { buf, pos: 0, done: false, malformed: None }
    }

    /// Why the walk stopped early, if it did.
    pub fn malformed(&self) -> Option<SmbiosError> {
        self.malformed.map(|offset| SmbiosError::MalformedRecord { offset })
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = RawRecord<'a>;

    fn next(&mut self) -> Option<RawRecord<'a>> {
        if self.done || self.pos >= self.buf.len() {
            self.done = true;
            return None;
        }

        match parse_record(self.buf, self.pos) {
            Ok((record, next)) => {
                match next {
                    Some(next) if record.kind != END_OF_TABLE => self.pos = next,
                    Some(_) => self.done = true,
                    None => {
                        if record.kind != END_OF_TABLE {
                            debug!("unterminated string set at offset {:#x}", self.pos);
                            self.malformed = Some(self.pos);
                        }
                        self.done = true;
                    }
                }
                Some(record)
            }
            Err(err) => {
                warn!("{}, stopping table walk", err);
                self.malformed = Some(self.pos);
                self.done = true;
                None
            }
        }
    }
}

pub fn records(buf: &[u8]) -> Records<'_> {
    Records::new(buf)
}
