//! Builders for synthetic entry points, records and tables used by tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::entry_point::{checksum, EPS_SIZE};

/// A valid SMBIOS 2.8 entry point pointing at `table_address`.
pub fn entry_point_block(table_address: u32, table_length: u16) -> [u8; EPS_SIZE] {
    let mut eps = [0u8; EPS_SIZE];
    eps[0x00..0x04].copy_from_slice(b"_SM_");
    eps[0x05] = EPS_SIZE as u8;
    eps[0x06] = 2;
    eps[0x07] = 8;
    eps[0x08..0x0A].copy_from_slice(&0x100u16.to_le_bytes());
    eps[0x10..0x15].copy_from_slice(b"_DMI_");
    eps[0x16..0x18].copy_from_slice(&table_length.to_le_bytes());
    eps[0x18..0x1C].copy_from_slice(&table_address.to_le_bytes());
    eps[0x1C..0x1E].copy_from_slice(&4u16.to_le_bytes());
    eps[0x1E] = 0x28;

    eps[0x15] = 0u8.wrapping_sub(checksum(&eps[0x10..]));
    eps[0x04] = 0u8.wrapping_sub(checksum(&eps));
    eps
}

/// One record: header, `fields` (the formatted area after the header) and
/// its string set.
pub fn record(kind: u8, handle: u16, fields: &[u8], strings: &[&str]) -> Vec<u8> {
    let mut out = vec![kind, (fields.len() + 4) as u8];
    out.extend_from_slice(&handle.to_le_bytes());
    out.extend_from_slice(fields);
    if strings.is_empty() {
        out.extend_from_slice(&[0, 0]);
    } else {
        for s in strings {
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        out.push(0);
    }
    out
}

/// Formatted area of `len` bytes (header included) for field poking.
pub fn fields(len: usize) -> Vec<u8> {
    vec![0u8; len - 4]
}

pub fn put_u8(fields: &mut [u8], offset: usize, value: u8) {
    fields[offset - 4] = value;
}

pub fn put_u16(fields: &mut [u8], offset: usize, value: u16) {
    fields[offset - 4..offset - 2].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u32(fields: &mut [u8], offset: usize, value: u32) {
    fields[offset - 4..offset].copy_from_slice(&value.to_le_bytes());
}

pub fn put_u64(fields: &mut [u8], offset: usize, value: u64) {
    fields[offset - 4..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn table(records: &[Vec<u8>]) -> Vec<u8> {
    records.concat()
}

/// Writes `contents` to a fresh file in the temp directory.
pub fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!("smbinfo-{}-{}-{}", std::process::id(), n, name));
    std::fs::write(&path, contents).unwrap();
    path
}

/// Creates a fresh, empty directory in the temp directory.
pub fn temp_dir(name: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!("smbinfo-{}-d{}-{}", std::process::id(), n, name));
    let _ = std::fs::remove_dir_all(&path);
    std::fs::create_dir_all(&path).unwrap();
    path
}
