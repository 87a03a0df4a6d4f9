//! Locating and validating the 32-bit SMBIOS entry point structure.

use std::io;
use std::path::Path;

use log::debug;

use crate::error::{Result, SmbiosError};
use crate::memory::PhysicalMemory;

/// Size of the 32-bit entry point structure.
pub const EPS_SIZE: usize = 0x1F;

pub const ANCHOR: &[u8; 4] = b"_SM_";
pub const INTERMEDIATE_ANCHOR: &[u8; 5] = b"_DMI_";

const INTERMEDIATE_OFFSET: usize = 0x10;
const TABLE_LENGTH_OFFSET: usize = 0x16;
const TABLE_ADDRESS_OFFSET: usize = 0x18;

/// Legacy BIOS area searched for the anchor on paragraph boundaries.
pub const LEGACY_WINDOW_START: u64 = 0xF0000;
pub const LEGACY_WINDOW_LEN: usize = 0x10000;
const PARAGRAPH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoint {
    /// Physical address the entry point was read from.
    pub address: u64,
    pub major: u8,
    pub minor: u8,
    pub checksum: u8,
    pub intermediate_checksum: u8,
    pub table_length: u16,
    pub table_address: u32,
}

/// Byte sum modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Both checksums sum to zero and the intermediate anchor is in place.
pub fn is_valid(eps: &[u8]) -> bool {
    eps.len() >= EPS_SIZE
        && checksum(&eps[..EPS_SIZE]) == 0
        && &eps[INTERMEDIATE_OFFSET..INTERMEDIATE_OFFSET + 5] == INTERMEDIATE_ANCHOR
        && checksum(&eps[INTERMEDIATE_OFFSET..EPS_SIZE]) == 0
}

impl EntryPoint {
    /// Validates `eps` and extracts the table location from it.
    pub fn parse(eps: &[u8], address: u64) -> Option<EntryPoint> {
        if !is_valid(eps) {
            return None;
        }
        Some(EntryPoint {
            address,
            major: eps[0x06],
            minor: eps[0x07],
            checksum: eps[0x04],
            intermediate_checksum: eps[0x15],
            table_length: u16::from_le_bytes([eps[TABLE_LENGTH_OFFSET], eps[TABLE_LENGTH_OFFSET + 1]]),
            table_address: u32::from_le_bytes([
                eps[TABLE_ADDRESS_OFFSET],
                eps[TABLE_ADDRESS_OFFSET + 1],
                eps[TABLE_ADDRESS_OFFSET + 2],
                eps[TABLE_ADDRESS_OFFSET + 3],
            ]),
        })
    }

    /// Physical address and length of the structure table.
    pub fn table(&self) -> (u64, usize) {
        (self.table_address as u64, self.table_length as usize)
    }
}

fn parse_address(value: &str) -> Option<u64> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse::<u64>().ok(),
    }
}

/// Finds the entry point address published under `key` in a `key=value` listing.
pub fn table_pointer(listing: &str, key: &str) -> Result<u64> {
    for line in listing.lines() {
        let parts: Vec<&str> = line.split('=').collect();
        if parts.len() != 2 || parts[0].trim() != key {
            continue;
        }
        return parse_address(parts[1]).ok_or_else(|| {
            SmbiosError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid {} address '{}'", key, parts[1].trim()),
            ))
        });
    }
    Err(SmbiosError::NotFound)
}

/// Reads the entry point through the address the firmware published in `systab`.
pub fn locate_firmware_pointer<M>(memory: &M, systab: &Path, key: &str) -> Result<EntryPoint>
where
    M: PhysicalMemory + ?Sized,
{
    let listing = std::fs::read_to_string(systab)?;
    let address = table_pointer(&listing, key)?;
    debug!("{} entry point published at {:#x}", key, address);

    let eps = memory.read(address, EPS_SIZE)?;
    EntryPoint::parse(&eps, address).ok_or(SmbiosError::NotFound)
}

/// Scans the legacy BIOS area for the first valid entry point.
pub fn locate_legacy<M>(memory: &M) -> Result<EntryPoint>
where
    M: PhysicalMemory + ?Sized,
{
    let window = memory.read(LEGACY_WINDOW_START, LEGACY_WINDOW_LEN)?;
    scan(&window, LEGACY_WINDOW_START)
}

/// Searches `window` (starting at physical `base`) on paragraph boundaries.
pub fn scan(window: &[u8], base: u64) -> Result<EntryPoint> {
    if window.len() < EPS_SIZE {
        return Err(SmbiosError::NotFound);
    }
    for offset in (0..=window.len() - EPS_SIZE).step_by(PARAGRAPH) {
        if &window[offset..offset + ANCHOR.len()] != ANCHOR {
            continue;
        }
        let address = base + offset as u64;
        match EntryPoint::parse(&window[offset..offset + EPS_SIZE], address) {
            Some(eps) => return Ok(eps),
            None => debug!("rejecting anchor at {:#x}: bad checksum", address),
        }
    }
    Err(SmbiosError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{entry_point_block, temp_file};
    use crate::memory::MemoryImage;

    #[test]
    fn valid_block_checksums_to_zero() {
        let eps = entry_point_block(0x000E_1000, 0x0A40);
        assert_eq!(checksum(&eps), 0);
        assert_eq!(checksum(&eps[0x10..]), 0);

        let parsed = EntryPoint::parse(&eps, 0xF5000).unwrap();
        assert_eq!(parsed.table(), (0x000E_1000, 0x0A40));
        assert_eq!(parsed.address, 0xF5000);
        assert_eq!((parsed.major, parsed.minor), (2, 8));
    }

    #[test]
    fn any_single_byte_corruption_is_rejected() {
        let eps = entry_point_block(0x7FFF_0000, 0x1234);
        for i in 0..EPS_SIZE {
            let mut bad = eps;
            bad[i] = bad[i].wrapping_add(1);
            assert!(!is_valid(&bad), "corrupted byte {:#x} accepted", i);
            assert!(EntryPoint::parse(&bad, 0).is_none());
        }
    }

    #[test]
    fn rejects_missing_intermediate_anchor() {
        let mut eps = entry_point_block(0x1000, 0x10);
        // swap two anchor bytes so both sums still hold
        eps.swap(0x10, 0x11);
        assert_eq!(checksum(&eps), 0);
        assert!(!is_valid(&eps));
    }

    #[test]
    fn rejects_short_block() {
        let eps = entry_point_block(0x1000, 0x10);
        assert!(!is_valid(&eps[..EPS_SIZE - 1]));
    }

    #[test]
    fn table_pointer_parses_hex_and_decimal() {
        let listing = "ACPI20=0x7ffe0014\nSMBIOS=0x7fec6000\nSMBIOS3=0x7fec5000\n";
        assert_eq!(table_pointer(listing, "SMBIOS").unwrap(), 0x7fec_6000);
        assert_eq!(table_pointer("SMBIOS=983040\n", "SMBIOS").unwrap(), 0xF0000);
    }

    #[test]
    fn table_pointer_missing_or_garbled() {
        assert!(matches!(table_pointer("ACPI=0x1000\n", "SMBIOS"), Err(SmbiosError::NotFound)));
        assert!(matches!(table_pointer("SMBIOS=banana\n", "SMBIOS"), Err(SmbiosError::Io(_))));
    }

    #[test]
    fn legacy_scan_finds_paragraph_aligned_anchor() {
        let mut window = vec![0u8; LEGACY_WINDOW_LEN];
        let eps = entry_point_block(0x000F_8000, 0x200);
        // a stray anchor off a paragraph boundary is ignored
        window[0x103..0x103 + EPS_SIZE].copy_from_slice(&entry_point_block(0xBAD, 1));
        // an anchor with a broken checksum is skipped
        let mut broken = eps;
        broken[0x18] ^= 0xFF;
        window[0x200..0x200 + EPS_SIZE].copy_from_slice(&broken);
        window[0x5A0..0x5A0 + EPS_SIZE].copy_from_slice(&eps);

        let image = MemoryImage::new(LEGACY_WINDOW_START, window);
        let found = locate_legacy(&image).unwrap();
        assert_eq!(found.address, LEGACY_WINDOW_START + 0x5A0);
        assert_eq!(found.table(), (0x000F_8000, 0x200));
    }

    #[test]
    fn legacy_scan_accepts_last_paragraph_that_fits() {
        let mut window = vec![0u8; LEGACY_WINDOW_LEN];
        let offset = LEGACY_WINDOW_LEN - 0x20;
        window[offset..offset + EPS_SIZE].copy_from_slice(&entry_point_block(0x1000, 0x40));
        assert_eq!(scan(&window, 0).unwrap().address, offset as u64);
    }

    #[test]
    fn legacy_scan_without_anchor_is_not_found() {
        let image = MemoryImage::new(LEGACY_WINDOW_START, vec![0u8; LEGACY_WINDOW_LEN]);
        assert!(matches!(locate_legacy(&image), Err(SmbiosError::NotFound)));
    }

    #[test]
    fn firmware_pointer_reads_published_address() {
        let eps = entry_point_block(0x9000, 0x80);
        let mut image = vec![0u8; 0x100];
        image[0x40..0x40 + EPS_SIZE].copy_from_slice(&eps);
        let memory = MemoryImage::new(0x7000, image);
        let systab = temp_file("systab", b"ACPI20=0x7ffe0014\nSMBIOS=0x7040\n");

        let found = locate_firmware_pointer(&memory, &systab, "SMBIOS").unwrap();
        assert_eq!(found.address, 0x7040);
        assert_eq!(found.table(), (0x9000, 0x80));
        let _ = std::fs::remove_file(systab);
    }

    #[test]
    fn firmware_pointer_to_garbage_is_not_found() {
        let memory = MemoryImage::new(0x7000, vec![0u8; 0x100]);
        let systab = temp_file("systab-bad", b"SMBIOS=0x7040\n");
        assert!(matches!(
            locate_firmware_pointer(&memory, &systab, "SMBIOS"),
            Err(SmbiosError::NotFound)
        ));
        let _ = std::fs::remove_file(systab);
    }

    #[test]
    fn firmware_pointer_without_listing_is_io_error() {
        let memory = MemoryImage::new(0, Vec::new());
        let result = locate_firmware_pointer(&memory, Path::new("/nonexistent/systab"), "SMBIOS");
        assert!(matches!(result, Err(SmbiosError::Io(_))));
    }
}
