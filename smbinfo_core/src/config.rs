use std::path::PathBuf;

/// Where the collector looks for the structure table and its fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Read-only physical memory device.
    pub mem_device: PathBuf,
    /// Line-oriented `key=value` firmware table listing.
    pub efi_systab: PathBuf,
    /// Key of the systab line holding the entry point address.
    pub table_key: String,
    /// Pre-exported copy of the structure table.
    pub dmi_snapshot: PathBuf,
    /// Glob matching one raw file per exported structure.
    pub dmi_entries: String,
    /// Xen balloon target, in KiB.
    pub xen_target: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            mem_device: PathBuf::from("/dev/mem"),
            efi_systab: PathBuf::from("/sys/firmware/efi/systab"),
            table_key: "SMBIOS".to_owned(),
            dmi_snapshot: PathBuf::from("/sys/firmware/dmi/tables/DMI"),
            dmi_entries: "/sys/firmware/dmi/entries/*/raw".to_owned(),
            xen_target: PathBuf::from("/sys/devices/system/xen_memory/xen_memory0/target_kb"),
        }
    }
}

pub fn load_custom_config(path: &str) -> Result<SourceConfig, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}

/// Parses `key=value` lines on top of the defaults. Blank lines and `#`
/// comments are ignored; several pairs may share a line.
pub fn parse_config(text: &str) -> Result<SourceConfig, Box<dyn std::error::Error>> {
    let mut config = SourceConfig::default();

    for (line_no, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        for token in line.split_whitespace() {
            let (key, val) = token
                .split_once('=')
                .ok_or_else(|| format!("Invalid token '{}' on line {}", token, line_no + 1))?;

            if val.is_empty() {
                return Err(format!("Empty value for '{}' on line {}", key, line_no + 1).into());
            }

            match key {
                "mem_device" => config.mem_device = PathBuf::from(val),
                "efi_systab" => config.efi_systab = PathBuf::from(val),
                "table_key" => config.table_key = val.to_owned(),
                "dmi_snapshot" => config.dmi_snapshot = PathBuf::from(val),
                "dmi_entries" => config.dmi_entries = val.to_owned(),
                "xen_target" => config.xen_target = PathBuf::from(val),
                _ => {
                    return Err(format!("Unknown key '{}' on line {}", key, line_no + 1).into());
                }
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_keeps_defaults() {
        let config = parse_config("\n# nothing here\n   \n").unwrap();
        assert_eq!(config, SourceConfig::default());
    }

    #[test]
    fn overrides_paths() {
        let text = "# snapshot only\nmem_device=/nonexistent/mem\n\
                    dmi_snapshot=/tmp/DMI table_key=SMBIOS3\n";
        let config = parse_config(text).unwrap();
        assert_eq!(config.mem_device, PathBuf::from("/nonexistent/mem"));
        assert_eq!(config.dmi_snapshot, PathBuf::from("/tmp/DMI"));
        assert_eq!(config.table_key, "SMBIOS3");
        assert_eq!(config.efi_systab, SourceConfig::default().efi_systab);
    }

    #[test]
    fn rejects_unknown_key() {
        let err = parse_config("mem_device=/dev/mem\nfoo=bar\n").unwrap_err();
        assert_eq!(err.to_string(), "Unknown key 'foo' on line 2");
    }

    #[test]
    fn rejects_bare_token() {
        let err = parse_config("mem_device").unwrap_err();
        assert_eq!(err.to_string(), "Invalid token 'mem_device' on line 1");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_custom_config("/nonexistent/smbinfo.conf").is_err());
    }
}
