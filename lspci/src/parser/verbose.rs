use log::{trace, warn};

use crate::{Device, Error, LspciOptions, NameWithId, Result, device::DeviceBuilder, hex::parse_hex};

use super::Parser;

/// Parser for the verbose machine-readable format of `lspci -vvvmm`, with one
/// `Key:<TAB>Value` line per field and blank lines between devices:
///
/// ```text
/// Slot:	00:1c.3
/// Class:	PCI bridge [0604]
/// Vendor:	Intel Corporation [8086]
/// Device:	82801 PCI Bridge [244e]
/// Rev:	d5
/// Driver:	pcieport
/// Module:	shpchp
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct VerboseParser;

fn decimal(value: &str) -> Result<u32, String> {
    value
        .parse()
        .map_err(|_| format!("invalid decimal number {value:?}"))
}

fn hex_byte(value: &str) -> Result<u8, String> {
    parse_hex(value).ok_or_else(|| format!("invalid hexadecimal byte {value:?}"))
}

/// Stores one field, or returns `false` when the key is unknown.
fn set_field(builder: &mut DeviceBuilder, key: &str, value: &str) -> Result<bool, String> {
    match key {
        "Slot" => builder.slot = Some(value.parse().map_err(|e: Error| e.to_string())?),
        "Class" => builder.cls = Some(value.into()),
        "Vendor" => builder.vendor = Some(value.into()),
        "Device" => builder.device = Some(value.into()),
        "SVendor" => builder.subsystem_vendor = Some(NameWithId::from(value)),
        "SDevice" => builder.subsystem_device = Some(NameWithId::from(value)),
        "Rev" => builder.revision = Some(hex_byte(value)?),
        "ProgIf" => builder.progif = Some(hex_byte(value)?),
        "Driver" => builder.driver = Some(value.to_owned()),
        "Module" => builder.kernel_modules.push(value.to_owned()),
        "NUMANode" => builder.numa_node = Some(decimal(value)?),
        "IOMMUGroup" => builder.iommu_group = Some(decimal(value)?),
        "PhySlot" => builder.physical_slot = Some(value.to_owned()),
        _ => return Ok(false),
    }
    Ok(true)
}

impl VerboseParser {
    /// Parses one device block. `first_line` is the line number of the
    /// block's first line, used in errors.
    fn parse_block<'a>(
        &self,
        first_line: usize,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Result<Device> {
        let mut builder = DeviceBuilder::default();

        for (offset, line) in lines.into_iter().enumerate() {
            let (key, value) = line.split_once(':').unwrap_or((line, ""));
            let (key, value) = (key.trim(), value.trim());
            let known = set_field(&mut builder, key, value)
                .map_err(|message| Error::parse(first_line + offset, format!("{key}: {message}")))?;
            if !known {
                warn!("Unsupported device field {key:?} with value {value:?}");
            }
        }

        let device = builder
            .build()
            .map_err(|field| Error::parse(first_line, format!("device has no {field} field")))?;
        trace!("Parsed {device}");
        Ok(device)
    }
}

impl Parser for VerboseParser {
    fn parse(&self, data: &str) -> Result<Vec<Device>> {
        let mut devices = Vec::new();
        let mut block: Vec<&str> = Vec::new();
        let mut block_start = 0;

        for (i, line) in data.lines().enumerate() {
            if line.trim().is_empty() {
                if !block.is_empty() {
                    devices.push(self.parse_block(block_start, block.drain(..))?);
                }
                continue;
            }
            if block.is_empty() {
                block_start = i + 1;
            }
            block.push(line);
        }
        if !block.is_empty() {
            devices.push(self.parse_block(block_start, block)?);
        }

        Ok(devices)
    }

    fn default_options(&self) -> LspciOptions {
        LspciOptions {
            verbose: true,
            kernel_drivers: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::VerboseParser;
    use crate::{Device, Error, NameWithId, Parser, Slot, testing::FakeExecutor};

    const SAMPLE_DEVICE: &str = "
Slot:\t00:1c.3
Class:\tPCI bridge [0604]
Vendor:\tIntel Corporation [8086]
Device:\t82801 PCI Bridge [244e]
SVendor:\tIntel Corporation [8086]
SDevice:\t82801 PCI Bridge [244e]
PhySlot:\t1
Rev:\td5
ProgIf:\t01
Driver:\tpcieport
Module:\tnouveau
Module:\tnvidia
NUMANode:\t0
IOMMUGroup:\t12
";

    fn check_device(dev: &Device) {
        assert_eq!(dev.slot(), &Slot::new(0, 0, 0x1c, 3));
        assert_eq!(dev.cls(), &NameWithId::new("PCI bridge", 0x0604));
        assert_eq!(dev.vendor(), &NameWithId::new("Intel Corporation", 0x8086));
        assert_eq!(dev.device(), &NameWithId::new("82801 PCI Bridge", 0x244e));
        assert_eq!(
            dev.subsystem_vendor(),
            Some(&NameWithId::new("Intel Corporation", 0x8086))
        );
        assert_eq!(
            dev.subsystem_device(),
            Some(&NameWithId::new("82801 PCI Bridge", 0x244e))
        );
        assert_eq!(dev.revision(), Some(0xd5));
        assert_eq!(dev.progif(), Some(0x01));
        assert_eq!(dev.driver(), Some("pcieport"));
        assert_eq!(dev.kernel_modules(), ["nouveau", "nvidia"]);
        assert_eq!(dev.numa_node(), Some(0));
        assert_eq!(dev.iommu_group(), Some(12));
        assert_eq!(dev.physical_slot(), Some("1"));
    }

    #[test]
    fn parse_str() {
        let devices = VerboseParser.parse(SAMPLE_DEVICE).unwrap();
        assert_eq!(devices.len(), 1);
        check_device(&devices[0]);
    }

    #[test]
    fn minimal_device() {
        let devices = VerboseParser
            .parse("Slot:\t00:00.0\nClass:\tHost bridge\nVendor:\tIntel\nDevice:\tSky Lake\n")
            .unwrap();
        let dev = &devices[0];
        assert_eq!(dev.subsystem_vendor(), None);
        assert_eq!(dev.revision(), None);
        assert!(dev.kernel_modules().is_empty());
        assert_eq!(dev.numa_node(), None);
    }

    #[test]
    fn blocks_separated_by_whitespace_lines() {
        let data = format!("{SAMPLE_DEVICE}\n  \t\n\n{SAMPLE_DEVICE}\n\n");
        let devices = VerboseParser.parse(&data).unwrap();
        assert_eq!(devices.len(), 2);
        devices.iter().for_each(check_device);
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let devices = VerboseParser
            .parse(&format!("{SAMPLE_DEVICE}NewField:\tValue\nGarbage without colon"))
            .unwrap();
        assert_eq!(devices.len(), 1);
        check_device(&devices[0]);
    }

    #[test]
    fn invalid_values_report_their_line() {
        let data = format!("{SAMPLE_DEVICE}\nSlot:\t00:00.0\nRev:\tnope\n");
        match VerboseParser.parse(&data) {
            Err(Error::Parse { line, message }) => {
                assert_eq!(line, 18);
                assert_eq!(message, "Rev: invalid hexadecimal byte \"nope\"");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_mandatory_field() {
        match VerboseParser.parse("Slot:\t00:00.0\nClass:\tHost bridge\nDevice:\tx\n") {
            Err(Error::Parse { line, message }) => {
                assert_eq!(line, 1);
                assert_eq!(message, "device has no Vendor field");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn run_asks_for_kernel_drivers() {
        let executor = FakeExecutor::new(format!("{SAMPLE_DEVICE}\n\n{SAMPLE_DEVICE}"));
        let devices = VerboseParser.run(&executor).unwrap();
        assert_eq!(devices.len(), 2);
        devices.iter().for_each(check_device);
        assert_eq!(executor.single_call_args(), ["-mm", "-vvv", "-k", "-nn"]);
    }
}
