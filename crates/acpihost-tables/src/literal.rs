//! Fixed synthetic SSDTs embedded in the harness.
//!
//! Both tables are complete, structurally valid images (header, declared
//! length, checksum) because the interpreter under test parses them like any
//! firmware-provided table. Keep the bytes exact; the unit tests below pin the
//! structure down.

/// Identity string the harness plants in the namespace and expects to read
/// back after loading [`RUNNER_ID_TABLE`].
pub const RUNNER_ID: &str = "acpihost";

/// Absolute path of the identification object defined by [`RUNNER_ID_TABLE`].
pub const RUNNER_ID_PATH: &str = "\\_SI.TID";

/// Replacement table the installation policy substitutes for any candidate
/// carrying the override OEM table id.
///
/// ```text
/// DefinitionBlock ("x.aml", "SSDT", 1, "AHOST", "OVERRIDE", 0xF0F0F0F0)
/// {
///     Name (VAL, "acpihost")
/// }
/// ```
pub const TABLE_OVERRIDE: &[u8] = &[
    0x53, 0x53, 0x44, 0x54, 0x33, 0x00, 0x00, 0x00, //
    0x01, 0xec, 0x41, 0x48, 0x4f, 0x53, 0x54, 0x20, //
    0x4f, 0x56, 0x45, 0x52, 0x52, 0x49, 0x44, 0x45, //
    0xf0, 0xf0, 0xf0, 0xf0, 0x41, 0x48, 0x53, 0x54, //
    0x01, 0x00, 0x00, 0x00, 0x08, 0x56, 0x41, 0x4c, //
    0x5f, 0x0d, 0x61, 0x63, 0x70, 0x69, 0x68, 0x6f, //
    0x73, 0x74, 0x00,
];

/// Identification table installed before namespace load in test mode. Defines
/// `\_SI.TID` so the run can confirm its own table made it into the namespace,
/// and prints a marker through the interpreter's debug object while loading.
///
/// ```text
/// DefinitionBlock ("x.aml", "SSDT", 1, "AHOST", "RUNRIDTB", 0xF0F0F0F0)
/// {
///     Name (\_SI.TID, "acpihost")
///     Printf ("acpihost ID SSDT loaded!")
/// }
/// ```
pub const RUNNER_ID_TABLE: &[u8] = &[
    0x53, 0x53, 0x44, 0x54, 0x56, 0x00, 0x00, 0x00, //
    0x01, 0xc4, 0x41, 0x48, 0x4f, 0x53, 0x54, 0x20, //
    0x52, 0x55, 0x4e, 0x52, 0x49, 0x44, 0x54, 0x42, //
    0xf0, 0xf0, 0xf0, 0xf0, 0x41, 0x48, 0x53, 0x54, //
    0x01, 0x00, 0x00, 0x00, 0x08, 0x5c, 0x2e, 0x5f, //
    0x53, 0x49, 0x5f, 0x54, 0x49, 0x44, 0x5f, 0x0d, //
    0x61, 0x63, 0x70, 0x69, 0x68, 0x6f, 0x73, 0x74, //
    0x00, 0x70, 0x0d, 0x61, 0x63, 0x70, 0x69, 0x68, //
    0x6f, 0x73, 0x74, 0x20, 0x49, 0x44, 0x20, 0x53, //
    0x53, 0x44, 0x54, 0x20, 0x6c, 0x6f, 0x61, 0x64, //
    0x65, 0x64, 0x21, 0x00, 0x5b, 0x31,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{checksum8, TableHeader};

    fn assert_valid_ssdt(bytes: &[u8], oem_table_id: &[u8; 8]) {
        let hdr = TableHeader::parse(bytes).unwrap();
        assert_eq!(hdr.signature, *b"SSDT");
        assert_eq!(hdr.length as usize, bytes.len());
        assert_eq!(&hdr.oem_table_id, oem_table_id);
        assert_eq!(checksum8(bytes), 0);
    }

    #[test]
    fn override_table_is_structurally_valid() {
        assert_valid_ssdt(TABLE_OVERRIDE, b"OVERRIDE");
    }

    #[test]
    fn runner_id_table_is_structurally_valid() {
        assert_valid_ssdt(RUNNER_ID_TABLE, b"RUNRIDTB");
    }

    #[test]
    fn runner_id_table_carries_the_identity_string() {
        assert!(RUNNER_ID_TABLE
            .windows(RUNNER_ID.len())
            .any(|w| w == RUNNER_ID.as_bytes()));
    }
}
