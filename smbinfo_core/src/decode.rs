//! Per-type record decoders and aggregation into [`Facts`].
//!
//! Field offsets follow the SMBIOS Reference Specification (DSP0134) and are
//! relative to the start of the record header.

use log::{debug, warn};
use uuid::Uuid;

use crate::facts::{
    BiosInfo, BoardInfo, ChassisInfo, Facts, MemoryDevice, ProcessorInfo, ProductInfo,
    FALLBACK_MEMORY_TYPE,
};
use crate::table::{records, RawRecord, END_OF_TABLE};

pub const BIOS: u8 = 0;
pub const SYSTEM: u8 = 1;
pub const BASEBOARD: u8 = 2;
pub const CHASSIS: u8 = 3;
pub const PROCESSOR: u8 = 4;
pub const MEMORY_DEVICE: u8 = 17;
pub const MEMORY_ARRAY_MAPPED_ADDRESS: u8 = 19;

mod bios {
    pub const VENDOR: usize = 0x04;
    pub const VERSION: usize = 0x05;
    pub const RELEASE_DATE: usize = 0x08;
    pub const ROM_SIZE: usize = 0x09;
    pub const MAJOR_RELEASE: usize = 0x14;
    pub const MINOR_RELEASE: usize = 0x15;
}

mod system {
    pub const MANUFACTURER: usize = 0x04;
    pub const PRODUCT_NAME: usize = 0x05;
    pub const VERSION: usize = 0x06;
    pub const SERIAL: usize = 0x07;
    pub const UUID: usize = 0x08;
    pub const SKU: usize = 0x19;
    pub const FAMILY: usize = 0x1A;
}

/// Shared by baseboard and chassis records.
mod enclosure {
    pub const MANUFACTURER: usize = 0x04;
    pub const PRODUCT: usize = 0x05;
    pub const CHASSIS_TYPE: usize = 0x05;
    pub const VERSION: usize = 0x06;
    pub const SERIAL: usize = 0x07;
    pub const ASSET_TAG: usize = 0x08;
}

mod processor {
    pub const SOCKET: usize = 0x04;
    pub const MANUFACTURER: usize = 0x07;
    pub const VERSION: usize = 0x10;
    pub const MAX_SPEED: usize = 0x14;
    pub const CURRENT_SPEED: usize = 0x16;
    pub const CORE_COUNT: usize = 0x23;
    pub const THREAD_COUNT: usize = 0x25;
}

mod memory_device {
    pub const DATA_WIDTH: usize = 0x0A;
    pub const SIZE: usize = 0x0C;
    pub const FORM_FACTOR: usize = 0x0E;
    pub const LOCATOR: usize = 0x10;
    pub const BANK: usize = 0x11;
    pub const MEMORY_TYPE: usize = 0x12;
    pub const TYPE_DETAIL: usize = 0x13;
    pub const SPEED: usize = 0x15;
    pub const MANUFACTURER: usize = 0x17;
    pub const SERIAL: usize = 0x18;
    pub const ASSET_TAG: usize = 0x19;
    pub const PART_NUMBER: usize = 0x1A;
    pub const EXTENDED_SIZE: usize = 0x1C;
    pub const CONFIGURED_SPEED: usize = 0x20;

    /// Minimum record lengths for the optional fields.
    pub const LEN_SPEED: u8 = 0x17;
    pub const LEN_EXTENDED_SIZE: u8 = 0x20;
    pub const LEN_CONFIGURED_SPEED: u8 = 0x22;
}

mod mapped_address {
    pub const START: usize = 0x04;
    pub const END: usize = 0x08;
    pub const EXTENDED_START: usize = 0x0F;
    pub const EXTENDED_END: usize = 0x17;

    pub const LEN_EXTENDED: u8 = 0x1F;
}

// DSP0134 7.18.2, indexed by the 1-based type code
pub static MEMORY_TYPES: [&str; 30] = [
    "Other", "Unknown", "DRAM", "EDRAM", "VRAM", "SRAM", "RAM", "ROM", "FLASH",
    "EEPROM", "FEPROM", "EPROM", "CDRAM", "3DRAM", "SDRAM", "SGRAM", "RDRAM",
    "DDR", "DDR2", "DDR2 FB-DIMM", "Reserved", "Reserved", "Reserved", "DDR3",
    "FBD2", "DDR4", "LPDDR", "LPDDR2", "LPDDR3", "LPDDR4",
];

// DSP0134 7.18.3, label i describes bit i
pub static TYPE_DETAILS: [&str; 15] = [
    "Other", "Unknown", "Fast-paged", "Static Column", "Pseudo-static",
    "RAMBus", "Synchronous", "CMOS", "EDO", "Window DRAM", "Cache DRAM",
    "Non-Volatile", "Registered (Buffered)", "Unbuffered (Unregistered)",
    "LRDIMM",
];

// DSP0134 7.18.1
pub static FORM_FACTORS: [&str; 15] = [
    "Other", "Unknown", "SIMM", "SIP", "Chip", "DIP", "ZIP", "Proprietary Card",
    "DIMM", "TSOP", "Row Of Chips", "RIMM", "SODIMM", "SRIMM", "FB-DIMM",
];

/// Looks up a 1-based code; 0 and out-of-range codes yield `None`.
pub fn lookup(names: &[&'static str], code: u8) -> Option<&'static str> {
    (code as usize).checked_sub(1).and_then(|i| names.get(i)).copied()
}

/// Labels for every set bit of a type detail word, reserved bit 0 ignored.
pub fn type_details(word: u16) -> Vec<String> {
    let word = word & 0xFFFE;
    (1..=TYPE_DETAILS.len())
        .filter(|&bit| word & (1 << bit) != 0)
        .map(|bit| TYPE_DETAILS[bit - 1].to_owned())
        .collect()
}

/// Accumulates decoded records for one table pass.
#[derive(Debug, Default)]
pub struct FactsBuilder {
    facts: Facts,
    /// Sum of mapped address ranges in MB.
    mapped_size: u64,
}

impl FactsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, rec: &RawRecord<'_>) {
        decoder_for(rec.kind)(rec, self);
    }

    pub fn finish(mut self) -> Facts {
        // Type 17 can be empty or unusable; fall back to the mapped ranges.
        if self.facts.memory.size == 0 && self.mapped_size > 0 {
            debug!("no usable memory devices, using {} MB of mapped ranges", self.mapped_size);
            self.facts.memory.memory_type = FALLBACK_MEMORY_TYPE.to_owned();
            self.facts.memory.size = self.mapped_size;
        }
        self.facts
    }
}

type Decoder = fn(&RawRecord<'_>, &mut FactsBuilder);

static DECODERS: [(u8, Decoder); 8] = [
    (BIOS, decode_bios),
    (SYSTEM, decode_system),
    (BASEBOARD, decode_baseboard),
    (CHASSIS, decode_chassis),
    (PROCESSOR, decode_processor),
    (MEMORY_DEVICE, decode_memory_device),
    (MEMORY_ARRAY_MAPPED_ADDRESS, decode_mapped_address),
    (END_OF_TABLE, skip),
];

fn decoder_for(kind: u8) -> Decoder {
    DECODERS
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|&(_, decoder)| decoder)
        .unwrap_or(skip)
}

/// Decodes every record of `buf` up to the End-of-Table record.
pub fn decode_table(buf: &[u8]) -> Facts {
    let mut builder = FactsBuilder::new();
    let mut walk = records(buf);
    for rec in walk.by_ref() {
        builder.record(&rec);
    }
    if let Some(err) = walk.malformed() {
        warn!("structure table truncated: {}", err);
    }
    builder.finish()
}

fn skip(_rec: &RawRecord<'_>, _b: &mut FactsBuilder) {}

fn string(rec: &RawRecord<'_>, offset: usize) -> String {
    rec.string(offset).unwrap_or_default()
}

fn decode_bios(rec: &RawRecord<'_>, b: &mut FactsBuilder) {
    if b.facts.bios.is_some() {
        return;
    }
    let release = match (rec.byte(bios::MAJOR_RELEASE), rec.byte(bios::MINOR_RELEASE)) {
        (Some(major), Some(minor)) if major != 0xFF && minor != 0xFF => Some((major, minor)),
        _ => None,
    };
    b.facts.bios = Some(BiosInfo {
        vendor: string(rec, bios::VENDOR),
        version: string(rec, bios::VERSION),
        date: string(rec, bios::RELEASE_DATE),
        rom_size_kb: rec.byte(bios::ROM_SIZE).map_or(0, |n| (n as u32 + 1) * 64),
        release,
    });
}

fn system_uuid(rec: &RawRecord<'_>) -> Option<Uuid> {
    let bytes: [u8; 16] = rec.body.get(system::UUID..system::UUID + 16)?.try_into().ok()?;
    // all zeroes: not present, all ones: not set
    if bytes.iter().all(|&b| b == 0) || bytes.iter().all(|&b| b == 0xFF) {
        return None;
    }
    // Assumes the SMBIOS 2.6+ layout (first three fields little-endian);
    // the snapshot and sysfs sources carry no version to check against.
    Some(Uuid::from_bytes_le(bytes))
}

fn decode_system(rec: &RawRecord<'_>, b: &mut FactsBuilder) {
    if b.facts.product.is_some() {
        return;
    }
    b.facts.product = Some(ProductInfo {
        name: string(rec, system::PRODUCT_NAME),
        vendor: string(rec, system::MANUFACTURER),
        version: string(rec, system::VERSION),
        serial: string(rec, system::SERIAL),
        uuid: system_uuid(rec),
        sku: string(rec, system::SKU),
        family: string(rec, system::FAMILY),
    });
}

fn decode_baseboard(rec: &RawRecord<'_>, b: &mut FactsBuilder) {
    if b.facts.board.is_some() {
        return;
    }
    b.facts.board = Some(BoardInfo {
        name: string(rec, enclosure::PRODUCT),
        vendor: string(rec, enclosure::MANUFACTURER),
        version: string(rec, enclosure::VERSION),
        serial: string(rec, enclosure::SERIAL),
        asset_tag: string(rec, enclosure::ASSET_TAG),
    });
}

fn decode_chassis(rec: &RawRecord<'_>, b: &mut FactsBuilder) {
    if b.facts.chassis.is_some() {
        return;
    }
    b.facts.chassis = Some(ChassisInfo {
        // bit 7 is the chassis lock flag
        kind: rec.byte(enclosure::CHASSIS_TYPE).map_or(0, |t| t & 0x7F),
        vendor: string(rec, enclosure::MANUFACTURER),
        version: string(rec, enclosure::VERSION),
        serial: string(rec, enclosure::SERIAL),
        asset_tag: string(rec, enclosure::ASSET_TAG),
    });
}

fn count(rec: &RawRecord<'_>, offset: usize) -> u32 {
    match rec.byte(offset) {
        Some(n) if n != 0 && n != 0xFF => n as u32,
        _ => 0,
    }
}

fn decode_processor(rec: &RawRecord<'_>, b: &mut FactsBuilder) {
    let current_speed = rec.word(processor::CURRENT_SPEED).unwrap_or(0);
    if b.facts.cpu_speed == 0 {
        b.facts.cpu_speed = current_speed as u32;
    }

    if b.facts.processor.is_none() {
        b.facts.processor = Some(ProcessorInfo {
            socket: string(rec, processor::SOCKET),
            manufacturer: string(rec, processor::MANUFACTURER),
            version: string(rec, processor::VERSION),
            max_speed: rec.word(processor::MAX_SPEED).unwrap_or(0),
            current_speed,
            cores: count(rec, processor::CORE_COUNT),
            threads: count(rec, processor::THREAD_COUNT),
        });
    }
}

/// Module size in MB, or `None` when no usable size is reported.
pub fn memory_device_size(rec: &RawRecord<'_>) -> Option<u64> {
    let size = rec.word(memory_device::SIZE)?;
    if size == 0 || size == 0xFFFF || size & 0x8000 != 0 {
        return None;
    }
    if size == 0x7FFF {
        if rec.length < memory_device::LEN_EXTENDED_SIZE {
            return None;
        }
        return rec.dword(memory_device::EXTENDED_SIZE).map(u64::from);
    }
    Some(size as u64)
}

fn decode_memory_device(rec: &RawRecord<'_>, b: &mut FactsBuilder) {
    let Some(size) = memory_device_size(rec) else {
        debug!("memory device {:#06x}: no module or unknown size", rec.handle);
        return;
    };

    let memory = &mut b.facts.memory;
    memory.size += size;

    let memory_type = rec
        .byte(memory_device::MEMORY_TYPE)
        .and_then(|code| lookup(&MEMORY_TYPES, code))
        .unwrap_or_default();
    if memory.memory_type.is_empty() {
        memory.memory_type = memory_type.to_owned();
    }

    let mut speed = 0;
    if rec.length >= memory_device::LEN_SPEED {
        speed = rec.word(memory_device::SPEED).unwrap_or(0) as u32;
        if memory.speed == 0 {
            memory.speed = speed;
        }
    }

    let configured_clock_speed = if rec.length >= memory_device::LEN_CONFIGURED_SPEED {
        rec.word(memory_device::CONFIGURED_SPEED).unwrap_or(0) as u32
    } else {
        0
    };

    memory.devices.push(MemoryDevice {
        memory_type: memory_type.to_owned(),
        type_detail: type_details(rec.word(memory_device::TYPE_DETAIL).unwrap_or(0)),
        speed,
        size,
        data_width: rec.word(memory_device::DATA_WIDTH).unwrap_or(0) as u32,
        factor: rec
            .byte(memory_device::FORM_FACTOR)
            .and_then(|code| lookup(&FORM_FACTORS, code))
            .unwrap_or_default()
            .to_owned(),
        locator: string(rec, memory_device::LOCATOR),
        bank: string(rec, memory_device::BANK),
        manufacturer: string(rec, memory_device::MANUFACTURER),
        serial_number: string(rec, memory_device::SERIAL),
        asset_tag: string(rec, memory_device::ASSET_TAG),
        part_number: string(rec, memory_device::PART_NUMBER),
        configured_clock_speed,
    });
}

/// Size in MB of the range described by a mapped address record.
pub fn mapped_range_size(rec: &RawRecord<'_>) -> Option<u64> {
    let start = rec.dword(mapped_address::START)?;
    let end = rec.dword(mapped_address::END)?;

    if start == u32::MAX && end == u32::MAX {
        // byte addresses in the extended fields
        if rec.length < mapped_address::LEN_EXTENDED {
            return None;
        }
        let start = rec.qword(mapped_address::EXTENDED_START)?;
        let end = rec.qword(mapped_address::EXTENDED_END)?;
        return end.checked_sub(start)?.checked_add(1).map(|len| len / 1_048_576);
    }

    // KiB addresses
    (end as u64).checked_sub(start as u64).map(|len| (len + 1) / 1024)
}

fn decode_mapped_address(rec: &RawRecord<'_>, b: &mut FactsBuilder) {
    if let Some(size) = mapped_range_size(rec) {
        b.mapped_size += size;
    }
}
