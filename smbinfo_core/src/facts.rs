use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Memory type reported when only mapped address ranges describe memory.
pub const FALLBACK_MEMORY_TYPE: &str = "DRAM";

fn is_zero<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Hardware facts decoded from one pass over the structure table.
///
/// Serializes to the collector's JSON shape: camelCase keys, empty strings,
/// zeros and empty lists left out.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Facts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bios: Option<BiosInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<BoardInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chassis: Option<ChassisInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor: Option<ProcessorInfo>,
    /// Current processor clock in MHz.
    #[serde(skip_serializing_if = "is_zero")]
    pub cpu_speed: u32,
    pub memory: Memory,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiosInfo {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vendor: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub rom_size_kb: u32,
    /// System BIOS major.minor release, when the firmware reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<(u8, u8)>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ProductInfo {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vendor: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub serial: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sku: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub family: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BoardInfo {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vendor: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub serial: String,
    #[serde(rename = "assettag", skip_serializing_if = "String::is_empty")]
    pub asset_tag: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ChassisInfo {
    #[serde(rename = "type", skip_serializing_if = "is_zero")]
    pub kind: u8,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub vendor: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub serial: String,
    #[serde(rename = "assettag", skip_serializing_if = "String::is_empty")]
    pub asset_tag: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorInfo {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub socket: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub manufacturer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub max_speed: u16,
    #[serde(skip_serializing_if = "is_zero")]
    pub current_speed: u16,
    #[serde(skip_serializing_if = "is_zero")]
    pub cores: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub threads: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Memory {
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub memory_type: String,
    /// Data rate in MT/s.
    #[serde(skip_serializing_if = "is_zero")]
    pub speed: u32,
    /// Size in MB.
    #[serde(skip_serializing_if = "is_zero")]
    pub size: u64,
    #[serde(rename = "memories", skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<MemoryDevice>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDevice {
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub memory_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub type_detail: Vec<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub speed: u32,
    #[serde(skip_serializing_if = "is_zero")]
    pub size: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub data_width: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub factor: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub locator: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bank: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub manufacturer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub serial_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub asset_tag: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub part_number: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub configured_clock_speed: u32,
}

impl Facts {
    pub fn is_empty(&self) -> bool {
        *self == Facts::default()
    }

    /// Copy with every serial number and the system UUID cleared.
    pub fn without_serials(&self) -> Facts {
        let mut facts = self.clone();
        if let Some(product) = &mut facts.product {
            product.serial.clear();
            product.uuid = None;
        }
        if let Some(board) = &mut facts.board {
            board.serial.clear();
        }
        if let Some(chassis) = &mut facts.chassis {
            chassis.serial.clear();
        }
        for device in &mut facts.memory.devices {
            device.serial_number.clear();
        }
        facts
    }

    /// Indented JSON, as the collector prints it.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Facts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(product) = &self.product {
            write!(f, "System: {} {}", product.vendor, product.name)?;
            if !product.version.is_empty() {
                write!(f, ", Version: {}", product.version)?;
            }
            if !product.serial.is_empty() {
                write!(f, ", Serial: {}", product.serial)?;
            }
            if let Some(uuid) = product.uuid {
                write!(f, ", UUID: {}", uuid)?;
            }
            writeln!(f)?;
        }

        if let Some(board) = &self.board {
            write!(f, "Board: {} {}, Version: {}", board.vendor, board.name, board.version)?;
            if !board.serial.is_empty() {
                write!(f, ", Serial: {}", board.serial)?;
            }
            writeln!(f)?;
        }

        if let Some(chassis) = &self.chassis {
            writeln!(f, "Chassis: {} (type {})", chassis.vendor, chassis.kind)?;
        }

        if let Some(bios) = &self.bios {
            writeln!(f, "BIOS: {} {} ({})", bios.vendor, bios.version, bios.date)?;
        }

        match &self.processor {
            Some(cpu) => writeln!(f, "CPU: {}, Socket {}, {} @ {}MHz (max {}MHz), Cores: {}, Threads: {}",
                                  cpu.version, cpu.socket, cpu.manufacturer,
                                  self.cpu_speed, cpu.max_speed, cpu.cores, cpu.threads)?,
            None if self.cpu_speed > 0 => writeln!(f, "CPU: {}MHz", self.cpu_speed)?,
            None => writeln!(f, "CPU: <unknown>")?,
        }

        let memory = &self.memory;
        if memory.size == 0 {
            return writeln!(f, "Memory: <none discovered>");
        }
        write!(f, "Memory: {} MB {}", memory.size, memory.memory_type)?;
        if memory.speed > 0 {
            write!(f, " @ {}MT/s", memory.speed)?;
        }
        writeln!(f)?;

        for (i, m) in memory.devices.iter().enumerate() {
            writeln!(f, "  Slot {}: {} MB {} {} @ {}MT/s (configured {}MT/s), Locator: {}, Bank: {}",
                     i + 1, m.size, m.memory_type, m.factor, m.speed, m.configured_clock_speed, m.locator, m.bank)?;
            if !m.type_detail.is_empty() {
                writeln!(f, "   Detail: {}", m.type_detail.join(", "))?;
            }
            write!(f, "   Manufacturer: {}, Part: {}", m.manufacturer, m.part_number)?;
            if !m.serial_number.is_empty() {
                write!(f, ", Serial: {}", m.serial_number)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Facts {
        Facts {
            board: Some(BoardInfo {
                name: "X570".into(),
                vendor: "ACME".into(),
                version: "1.0".into(),
                serial: "BRD-0001".into(),
                asset_tag: String::new(),
            }),
            cpu_speed: 3600,
            memory: Memory {
                memory_type: "DDR4".into(),
                speed: 3200,
                size: 16384,
                devices: vec![MemoryDevice {
                    memory_type: "DDR4".into(),
                    size: 16384,
                    serial_number: "DIMM-42".into(),
                    ..MemoryDevice::default()
                }],
            },
            ..Facts::default()
        }
    }

    #[test]
    fn default_is_empty() {
        assert!(Facts::default().is_empty());
        assert!(!sample().is_empty());
    }

    #[test]
    fn display_drops_cleared_serials() {
        let facts = sample();
        let shown = facts.to_string();
        assert!(shown.contains("Serial: BRD-0001"));
        assert!(shown.contains("Serial: DIMM-42"));
        assert!(shown.contains("Memory: 16384 MB DDR4 @ 3200MT/s"));
        assert!(shown.contains("CPU: 3600MHz"));

        let hidden = facts.without_serials();
        assert!(!hidden.is_empty());
        let shown = hidden.to_string();
        assert!(!shown.contains("BRD-0001"));
        assert!(!shown.contains("DIMM-42"));
        assert!(!shown.contains("Serial:"));
        assert_eq!(facts.board.as_ref().unwrap().serial, "BRD-0001");
    }

    #[test]
    fn without_serials_clears_uuid() {
        let facts = Facts {
            product: Some(ProductInfo {
                serial: "SN123".into(),
                uuid: Some(Uuid::from_u128(0x0011_2233_4455_6677_8899_aabb_ccdd_eeff)),
                ..ProductInfo::default()
            }),
            ..Facts::default()
        };
        let product = facts.without_serials().product.unwrap();
        assert!(product.serial.is_empty());
        assert_eq!(product.uuid, None);
    }

    #[test]
    fn json_uses_collector_keys() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();

        assert_eq!(json["cpuSpeed"], 3600);
        assert!(json.get("cpu_speed").is_none());
        assert_eq!(json["board"]["name"], "X570");
        assert!(json["board"].get("assettag").is_none());
        assert_eq!(json["memory"]["type"], "DDR4");
        assert_eq!(json["memory"]["size"], 16384);

        let dimm = &json["memory"]["memories"][0];
        assert_eq!(dimm["serialNumber"], "DIMM-42");
        assert!(dimm.get("typeDetail").is_none());
        assert!(dimm.get("manufacturer").is_none());
        assert!(dimm.get("configuredClockSpeed").is_none());
    }

    #[test]
    fn empty_facts_serialize_to_empty_memory() {
        let json: serde_json::Value = serde_json::from_str(&Facts::default().to_json().unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({ "memory": {} }));
    }

    #[test]
    fn display_without_memory() {
        let shown = Facts::default().to_string();
        assert!(shown.contains("CPU: <unknown>"));
        assert!(shown.contains("Memory: <none discovered>"));
    }
}
