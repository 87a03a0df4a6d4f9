// Structure table sources, tried in order, and the top-level collection.
// DMTF DSP0134:
// https://www.dmtf.org/sites/default/files/standards/documents/DSP0134_3.7.0.pdf

use cfg_if::cfg_if;
use log::{debug, info, warn};

use crate::config::SourceConfig;
use crate::decode::decode_table;
use crate::error::{Result, SmbiosError};
use crate::facts::{Facts, FALLBACK_MEMORY_TYPE};
use crate::memory::{PhysicalMemory, TableBytes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Entry point address published by the firmware in the EFI systab.
    #[cfg(not(windows))]
    FirmwarePointer,
    /// Paragraph scan of the legacy BIOS area.
    #[cfg(not(windows))]
    LegacyScan,
    /// Table exported by the kernel as a single file.
    #[cfg(not(windows))]
    Snapshot,
    /// Table reassembled from the kernel's per-structure exports.
    #[cfg(not(windows))]
    SysfsEntries,
    /// Table returned by the firmware table provider API.
    #[cfg(windows)]
    FirmwareTable,
}

cfg_if! {
    if #[cfg(windows)] {
        pub const STRATEGIES: &[Strategy] = &[Strategy::FirmwareTable];
    } else {
        pub const STRATEGIES: &[Strategy] = &[
            Strategy::FirmwarePointer,
            Strategy::LegacyScan,
            Strategy::Snapshot,
            Strategy::SysfsEntries,
        ];
    }
}

#[cfg(not(windows))]
mod sources {
    use std::io;

    use log::debug;

    use crate::entry_point::EntryPoint;
    use crate::error::{Result, SmbiosError};
    use crate::memory::{PhysicalMemory, TableBytes};
    use crate::table::END_OF_TABLE;

    pub fn device<'m, M: PhysicalMemory + ?Sized>(memory: Option<&'m M>) -> Result<&'m M> {
        memory.ok_or_else(|| {
            SmbiosError::Io(io::Error::new(io::ErrorKind::NotFound, "physical memory device unavailable"))
        })
    }

    /// Maps the table an entry point describes; an empty table counts as not found.
    pub fn map_table<'m, M: PhysicalMemory + ?Sized>(memory: &'m M, eps: EntryPoint) -> Result<TableBytes<'m>> {
        let (address, length) = eps.table();
        debug!("SMBIOS {}.{} table at {:#x}, {} bytes", eps.major, eps.minor, address, length);
        if length == 0 {
            return Err(SmbiosError::NotFound);
        }
        memory.read(address, length)
    }

    pub fn read_sysfs_entries(pattern: &str) -> Result<Vec<u8>> {
        use glob::glob;

        let entries = glob(pattern).map_err(|err| {
            SmbiosError::Io(io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))
        })?;

        let end_of_table = format!("{}-", END_OF_TABLE);
        let mut buf = Vec::new();
        for entry in entries.flatten() {
            // the walk stops at End-of-Table, which sorts before most types
            let is_end = entry
                .parent()
                .and_then(|dir| dir.file_name())
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(&end_of_table));
            if is_end {
                continue;
            }
            buf.extend_from_slice(&std::fs::read(&entry)?);
        }

        if buf.is_empty() {
            return Err(SmbiosError::NotFound);
        }
        Ok(buf)
    }
}

impl Strategy {
    #[cfg_attr(windows, allow(unused_variables))]
    pub fn attempt<'m, M>(self, memory: Option<&'m M>, config: &SourceConfig) -> Result<TableBytes<'m>>
    where
        M: PhysicalMemory + ?Sized,
    {
        #[cfg(not(windows))]
        use self::sources::{device, map_table, read_sysfs_entries};
        #[cfg(not(windows))]
        use crate::entry_point::{locate_firmware_pointer, locate_legacy};

        match self {
            #[cfg(not(windows))]
            Strategy::FirmwarePointer => {
                let memory = device(memory)?;
                let eps = locate_firmware_pointer(memory, &config.efi_systab, &config.table_key)?;
                map_table(memory, eps)
            }
            #[cfg(not(windows))]
            Strategy::LegacyScan => {
                let memory = device(memory)?;
                let eps = locate_legacy(memory)?;
                map_table(memory, eps)
            }
            #[cfg(not(windows))]
            Strategy::Snapshot => Ok(TableBytes::Owned(std::fs::read(&config.dmi_snapshot)?)),
            #[cfg(not(windows))]
            Strategy::SysfsEntries => Ok(TableBytes::Owned(read_sysfs_entries(&config.dmi_entries)?)),
            #[cfg(windows)]
            Strategy::FirmwareTable => {
                use crate::platform::{read_firmware_table, RAW_SMBIOS_HEADER};

                let raw = read_firmware_table()?;
                let table = raw.get(RAW_SMBIOS_HEADER..).ok_or(SmbiosError::NotFound)?;
                Ok(TableBytes::Owned(table.to_vec()))
            }
        }
    }
}

/// Tries each of [`STRATEGIES`] once, returning the first table obtained or
/// the last error.
pub fn load_table<'m, M>(memory: Option<&'m M>, config: &SourceConfig) -> Result<(Strategy, TableBytes<'m>)>
where
    M: PhysicalMemory + ?Sized,
{
    let mut last = SmbiosError::NotFound;
    for &strategy in STRATEGIES {
        match strategy.attempt(memory, config) {
            Ok(table) => return Ok((strategy, table)),
            Err(err) => {
                debug!("{:?}: {}", strategy, err);
                last = err;
            }
        }
    }
    Err(last)
}

/// Memory size from the Xen balloon driver, for guests without SMBIOS.
fn xen_memory(config: &SourceConfig) -> Option<Facts> {
    let target_kb = std::fs::read_to_string(&config.xen_target).ok()?;
    let target_kb = target_kb.trim().parse::<u64>().ok()?;

    let mut facts = Facts::default();
    facts.memory.memory_type = FALLBACK_MEMORY_TYPE.to_owned();
    facts.memory.size = target_kb / 1024;
    Some(facts)
}

/// Locates, reads and decodes the structure table using `memory` as the
/// physical memory source.
pub fn collect_from<M>(memory: Option<&M>, config: &SourceConfig) -> Result<Facts>
where
    M: PhysicalMemory + ?Sized,
{
    match load_table(memory, config) {
        Ok((strategy, table)) => {
            info!("SMBIOS table from {:?}: {} bytes", strategy, table.len());
            Ok(decode_table(&table))
        }
        Err(err) => match xen_memory(config) {
            Some(facts) => {
                info!("no SMBIOS table ({}), using Xen memory target", err);
                Ok(facts)
            }
            None => Err(err),
        },
    }
}

#[cfg(unix)]
pub fn collect_facts(config: &SourceConfig) -> Result<Facts> {
    use crate::memory::DevMem;

    let device = match DevMem::open(&config.mem_device) {
        Ok(device) => Some(device),
        Err(err) => {
            debug!("{}: {}", config.mem_device.display(), err);
            None
        }
    };
    collect_from(device.as_ref(), config)
}

#[cfg(not(unix))]
pub fn collect_facts(config: &SourceConfig) -> Result<Facts> {
    collect_from(None::<&crate::memory::MemoryImage>, config)
}

/// Like [`collect_facts`], but an unavailable table yields empty facts.
pub fn hardware_facts(config: &SourceConfig) -> Facts {
    match collect_facts(config) {
        Ok(facts) => facts,
        Err(err) => {
            warn!("SMBIOS data unavailable: {}", err);
            Facts::default()
        }
    }
}
