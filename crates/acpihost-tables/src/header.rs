//! ACPI system description table headers and checksums.

/// Size of the common system description table header.
pub const HEADER_LEN: usize = 36;

pub const OEM_ID: [u8; 6] = *b"AHOST ";
pub const OEM_TABLE_ID: [u8; 8] = *b"AHOSTTBL";
pub const CREATOR_ID: [u8; 4] = *b"AHST";

/// Sum of every byte in `bytes`, modulo 256. A valid ACPI structure sums to 0.
pub fn checksum8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, b| sum.wrapping_add(*b))
}

/// Value for a checksum byte that makes the whole structure sum to 0.
pub fn checksum_byte(bytes: &[u8]) -> u8 {
    0u8.wrapping_sub(checksum8(bytes))
}

/// Decoded form of the 36-byte system description table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHeader {
    pub signature: [u8; 4],
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: [u8; 4],
    pub creator_revision: u32,
}

impl TableHeader {
    /// Decode a header from the front of `bytes`. Returns `None` if fewer than
    /// [`HEADER_LEN`] bytes are available; field contents are not validated.
    pub fn parse(bytes: &[u8]) -> Option<TableHeader> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        Some(TableHeader {
            signature: bytes[0..4].try_into().unwrap(),
            length: u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            revision: bytes[8],
            checksum: bytes[9],
            oem_id: bytes[10..16].try_into().unwrap(),
            oem_table_id: bytes[16..24].try_into().unwrap(),
            oem_revision: u32::from_le_bytes(bytes[24..28].try_into().unwrap()),
            creator_id: bytes[28..32].try_into().unwrap(),
            creator_revision: u32::from_le_bytes(bytes[32..36].try_into().unwrap()),
        })
    }
}

/// Build a header for a table with `body_len` payload bytes. The checksum byte
/// is left zero; patch it with [`finalize_checksum`] once the payload is in
/// place.
pub fn build_header(signature: &[u8; 4], revision: u8, body_len: usize) -> [u8; HEADER_LEN] {
    build_header_with_oem_id(signature, revision, OEM_TABLE_ID, body_len)
}

fn build_header_with_oem_id(
    signature: &[u8; 4],
    revision: u8,
    oem_table_id: [u8; 8],
    body_len: usize,
) -> [u8; HEADER_LEN] {
    let mut hdr = [0u8; HEADER_LEN];
    hdr[0..4].copy_from_slice(signature);
    hdr[4..8].copy_from_slice(&((HEADER_LEN + body_len) as u32).to_le_bytes());
    hdr[8] = revision;
    hdr[9] = 0; // checksum patched later
    hdr[10..16].copy_from_slice(&OEM_ID);
    hdr[16..24].copy_from_slice(&oem_table_id);
    hdr[24..28].copy_from_slice(&1u32.to_le_bytes()); // OEM revision
    hdr[28..32].copy_from_slice(&CREATOR_ID);
    hdr[32..36].copy_from_slice(&1u32.to_le_bytes()); // creator revision
    hdr
}

/// Patch the checksum byte so the table sums to zero.
pub fn finalize_checksum(table: &mut [u8]) {
    debug_assert!(table.len() >= HEADER_LEN);
    table[9] = 0;
    table[9] = checksum_byte(table);
    debug_assert_eq!(checksum8(table), 0);
}

/// Assemble a complete table image: header, payload, valid checksum.
pub fn build_table(signature: &[u8; 4], revision: u8, payload: &[u8]) -> Vec<u8> {
    build_table_with_oem_id(signature, revision, OEM_TABLE_ID, payload)
}

/// Like [`build_table`] but with a caller-chosen OEM table id. The harness's
/// installation policy keys on this field, so tests that exercise the
/// deny/override paths need control over it.
pub fn build_table_with_oem_id(
    signature: &[u8; 4],
    revision: u8,
    oem_table_id: [u8; 8],
    payload: &[u8],
) -> Vec<u8> {
    let mut table = Vec::with_capacity(HEADER_LEN + payload.len());
    table.extend_from_slice(&build_header_with_oem_id(
        signature,
        revision,
        oem_table_id,
        payload.len(),
    ));
    table.extend_from_slice(payload);
    finalize_checksum(&mut table);
    table
}
