//! Hardware facts from the firmware's SMBIOS structure table: where the
//! table lives, how to read it, and what its records say about the machine.

mod config;
mod error;
mod facts;
mod hardware;
mod platform;

pub mod decode;
pub mod entry_point;
pub mod memory;
pub mod strings;
pub mod table;

#[cfg(test)]
mod fixtures;

pub use config::{load_custom_config, parse_config, SourceConfig};
pub use decode::decode_table;
pub use error::{Result, SmbiosError};
pub use facts::{
    BiosInfo, BoardInfo, ChassisInfo, Facts, Memory, MemoryDevice, ProcessorInfo, ProductInfo,
    FALLBACK_MEMORY_TYPE,
};
pub use hardware::{collect_facts, collect_from, hardware_facts, load_table, Strategy, STRATEGIES};
#[cfg(unix)]
pub use memory::DevMem;
pub use memory::{MemoryImage, PhysicalMemory, TableBytes};
