//! Byte-level ACPI table fabrication and parsing for the acpihost harness.
//!
//! Everything in this crate works on raw table images: system description
//! table headers and checksums, the synthetic XSDT/RSDP chain the harness
//! publishes to the interpreter under test, the fixed literal SSDTs used by
//! the table-override and runner-identification tests, a minimal AML
//! encoder/decoder, and raw resource-template descriptors.

pub mod aml;
pub mod resource;

mod chain;
mod header;
mod literal;

pub use chain::{
    build_rsdp, build_xsdt, parse_rsdp, parse_xsdt_entries, DSDT_SIGNATURE, RSDP_LEN,
    SSDT_SIGNATURE, XSDT_SIGNATURE,
};
pub use header::{
    build_header, build_table, build_table_with_oem_id, checksum8, checksum_byte,
    finalize_checksum, TableHeader, CREATOR_ID, HEADER_LEN, OEM_ID, OEM_TABLE_ID,
};
pub use literal::{RUNNER_ID, RUNNER_ID_PATH, RUNNER_ID_TABLE, TABLE_OVERRIDE};
