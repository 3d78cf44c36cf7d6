//! The synthetic root-pointer/XSDT chain the harness hands to an interpreter.
//!
//! The chain is deliberately minimal: an ACPI 2.0 RSDP whose XSDT pointer is
//! the only populated address, and an XSDT whose entries point straight at the
//! DSDT and SSDT blobs owned by the current run. Entry addresses are the
//! in-process addresses of those blobs, which the interpreter treats as opaque
//! physical addresses until it maps them back through the host.

use crate::header::{
    build_header, checksum8, checksum_byte, finalize_checksum, TableHeader, HEADER_LEN, OEM_ID,
};

pub const XSDT_SIGNATURE: [u8; 4] = *b"XSDT";
pub const DSDT_SIGNATURE: [u8; 4] = *b"DSDT";
pub const SSDT_SIGNATURE: [u8; 4] = *b"SSDT";

/// Size of the ACPI 2.0 root system description pointer.
pub const RSDP_LEN: usize = 36;

const RSDP_SIGNATURE: &[u8; 8] = b"RSD PTR ";

/// Build an XSDT whose entries are `entries`, in order.
pub fn build_xsdt(entries: &[u64]) -> Vec<u8> {
    let mut table = Vec::with_capacity(HEADER_LEN + entries.len() * 8);
    table.extend_from_slice(&build_header(&XSDT_SIGNATURE, 1, entries.len() * 8));
    for &addr in entries {
        table.extend_from_slice(&addr.to_le_bytes());
    }
    finalize_checksum(&mut table);
    table
}

/// Decode and validate an XSDT image, returning its entry addresses.
pub fn parse_xsdt_entries(bytes: &[u8]) -> Option<Vec<u64>> {
    let hdr = TableHeader::parse(bytes)?;
    let length = hdr.length as usize;
    if hdr.signature != XSDT_SIGNATURE || length < HEADER_LEN || length > bytes.len() {
        return None;
    }
    if checksum8(&bytes[..length]) != 0 {
        return None;
    }
    let body = &bytes[HEADER_LEN..length];
    if body.len() % 8 != 0 {
        return None;
    }
    Some(
        body.chunks_exact(8)
            .map(|entry| u64::from_le_bytes(entry.try_into().unwrap()))
            .collect(),
    )
}

/// Build an ACPI 2.0 RSDP pointing at `xsdt_addr`.
///
/// The legacy RSDT address is left zero; the harness only publishes an XSDT.
pub fn build_rsdp(xsdt_addr: u64) -> [u8; RSDP_LEN] {
    let mut rsdp = [0u8; RSDP_LEN];
    rsdp[0..8].copy_from_slice(RSDP_SIGNATURE);
    rsdp[9..15].copy_from_slice(&OEM_ID);
    rsdp[15] = 2; // revision
    rsdp[20..24].copy_from_slice(&(RSDP_LEN as u32).to_le_bytes());
    rsdp[24..32].copy_from_slice(&xsdt_addr.to_le_bytes());

    // v1 checksum covers the first 20 bytes, the extended checksum all 36.
    rsdp[8] = checksum_byte(&rsdp[0..20]);
    rsdp[32] = checksum_byte(&rsdp);
    debug_assert_eq!(checksum8(&rsdp[0..20]), 0);
    debug_assert_eq!(checksum8(&rsdp), 0);
    rsdp
}

/// Decode and validate an RSDP image, returning the XSDT address.
pub fn parse_rsdp(bytes: &[u8]) -> Option<u64> {
    if bytes.len() < RSDP_LEN || &bytes[0..8] != RSDP_SIGNATURE {
        return None;
    }
    if checksum8(&bytes[0..20]) != 0 || checksum8(&bytes[0..RSDP_LEN]) != 0 {
        return None;
    }
    if bytes[15] < 2 {
        return None;
    }
    Some(u64::from_le_bytes(bytes[24..32].try_into().unwrap()))
}
