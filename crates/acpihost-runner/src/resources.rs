//! Self-contained raw resource-template battery.
//!
//! Selected with the `resource-tests` invocation keyword. Runs entirely
//! against fixed byte templates; no interpreter or table chain is involved.

use acpihost_tables::resource::{encode, parse, Resource};

use crate::run::RunError;

/// The embedded-controller style template the battery asserts against: IRQ 9,
/// the EC data/command ports, one MMIO window, end tag.
const TEMPLATE: &[u8] = &[
    0x22, 0x00, 0x02, // IRQ 9
    0x47, 0x01, 0x62, 0x00, 0x62, 0x00, 0x01, 0x01, // I/O port 0x62
    0x47, 0x01, 0x66, 0x00, 0x66, 0x00, 0x01, 0x01, // I/O port 0x66
    0x86, 0x09, 0x00, 0x01, 0x00, 0x00, 0x0D, 0xFE, 0x00, 0x04, 0x00, 0x00, // 1KiB MMIO
    0x79, 0x00, // end tag
];

fn expected_descriptors() -> Vec<Resource> {
    vec![
        Resource::Irq { mask: 1 << 9 },
        Resource::IoPort {
            decode16: true,
            min: 0x62,
            max: 0x62,
            alignment: 1,
            length: 1,
        },
        Resource::IoPort {
            decode16: true,
            min: 0x66,
            max: 0x66,
            alignment: 1,
            length: 1,
        },
        Resource::FixedMemory32 {
            writable: true,
            base: 0xFE0D_0000,
            length: 0x400,
        },
        Resource::EndTag { checksum: 0 },
    ]
}

/// Run the battery. Any mismatch between the wire template and its decoded
/// or re-encoded form fails the run.
pub fn run_battery() -> Result<(), RunError> {
    let decoded = parse(TEMPLATE)
        .ok_or_else(|| RunError::Resources("fixed template failed to decode".to_owned()))?;
    let expected = expected_descriptors();
    if decoded != expected {
        return Err(RunError::Resources(format!(
            "decoded descriptors {decoded:?} don't match expected {expected:?}"
        )));
    }

    let reencoded = encode(&expected);
    if reencoded != TEMPLATE {
        return Err(RunError::Resources(
            "re-encoded template differs from the wire form".to_owned(),
        ));
    }

    // Truncating the template mid-descriptor must be detected.
    if parse(&TEMPLATE[..TEMPLATE.len() - 1]).is_some() {
        return Err(RunError::Resources(
            "truncated template unexpectedly decoded".to_owned(),
        ));
    }

    tracing::info!("resource template battery passed ({} descriptors)", expected.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_passes() {
        run_battery().unwrap();
    }
}
