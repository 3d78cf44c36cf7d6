//! Minimal AML encoder/decoder helpers.
//!
//! This module purposefully implements only the small subset of AML the
//! harness needs: enough to hand-assemble test tables (named literals, a
//! method returning a constant, a debug print) and to decode the same
//! constructs when walking a table. It is not a general AML library.

pub const AML_OP_NAME: u8 = 0x08;
pub const AML_OP_SCOPE: u8 = 0x10;
pub const AML_OP_METHOD: u8 = 0x14;
pub const AML_OP_STORE: u8 = 0x70;
pub const AML_OP_RETURN: u8 = 0xA4;

pub const AML_EXT_OP_PREFIX: u8 = 0x5B;
pub const AML_EXT_OP_DEBUG: u8 = 0x31;

pub const AML_OP_ZERO: u8 = 0x00;
pub const AML_OP_ONE: u8 = 0x01;
pub const AML_OP_ONES: u8 = 0xFF;

pub const AML_OP_BYTE_PREFIX: u8 = 0x0A;
pub const AML_OP_WORD_PREFIX: u8 = 0x0B;
pub const AML_OP_DWORD_PREFIX: u8 = 0x0C;
pub const AML_OP_STRING_PREFIX: u8 = 0x0D;
pub const AML_OP_QWORD_PREFIX: u8 = 0x0E;

pub const AML_NAME_DUAL_PREFIX: u8 = 0x2E;
pub const AML_NAME_MULTI_PREFIX: u8 = 0x2F;
pub const AML_NAME_ROOT_PREFIX: u8 = 0x5C;
pub const AML_NAME_NULL: u8 = 0x00;

/// Pad a segment name to the fixed 4-byte AML form.
pub fn name_seg(name: &str) -> [u8; 4] {
    let bytes = name.as_bytes();
    assert!(
        !bytes.is_empty() && bytes.len() <= 4,
        "AML name segment must be 1-4 bytes, got {name:?}"
    );
    let mut out = [b'_'; 4];
    out[..bytes.len()].copy_from_slice(bytes);
    out
}

/// Encode a path like `\_SI.TID` or `MAIN` as an AML NameString.
pub fn name_string(path: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = path;
    if let Some(stripped) = rest.strip_prefix('\\') {
        out.push(AML_NAME_ROOT_PREFIX);
        rest = stripped;
    }
    while let Some(stripped) = rest.strip_prefix('^') {
        out.push(b'^');
        rest = stripped;
    }

    if rest.is_empty() {
        out.push(AML_NAME_NULL);
        return out;
    }

    let segs: Vec<[u8; 4]> = rest.split('.').map(name_seg).collect();
    match segs.len() {
        1 => {}
        2 => out.push(AML_NAME_DUAL_PREFIX),
        n => {
            out.push(AML_NAME_MULTI_PREFIX);
            out.push(n as u8);
        }
    }
    for seg in &segs {
        out.extend_from_slice(seg);
    }
    out
}

/// Encode a PkgLength for a package holding `payload_len` bytes.
///
/// The encoded value includes the PkgLength bytes themselves, so the width of
/// the encoding feeds back into the value it must carry.
pub fn pkg_length(payload_len: usize) -> Vec<u8> {
    for follow_bytes in 0..=3usize {
        let total = payload_len + 1 + follow_bytes;
        let fits = match follow_bytes {
            0 => total < (1 << 6),
            1 => total < (1 << 12),
            2 => total < (1 << 20),
            _ => total < (1 << 28),
        };
        if !fits {
            continue;
        }

        if follow_bytes == 0 {
            return vec![total as u8];
        }
        let mut out = Vec::with_capacity(1 + follow_bytes);
        out.push(((follow_bytes as u8) << 6) | (total & 0xF) as u8);
        let mut rest = total >> 4;
        for _ in 0..follow_bytes {
            out.push((rest & 0xFF) as u8);
            rest >>= 8;
        }
        return out;
    }
    panic!("AML package too large: {payload_len} bytes");
}

/// Encode an integer constant in its smallest AML form.
pub fn integer(value: u64) -> Vec<u8> {
    match value {
        0 => vec![AML_OP_ZERO],
        1 => vec![AML_OP_ONE],
        u64::MAX => vec![AML_OP_ONES],
        v if v <= u8::MAX as u64 => vec![AML_OP_BYTE_PREFIX, v as u8],
        v if v <= u16::MAX as u64 => {
            let mut out = vec![AML_OP_WORD_PREFIX];
            out.extend_from_slice(&(v as u16).to_le_bytes());
            out
        }
        v if v <= u32::MAX as u64 => {
            let mut out = vec![AML_OP_DWORD_PREFIX];
            out.extend_from_slice(&(v as u32).to_le_bytes());
            out
        }
        v => {
            let mut out = vec![AML_OP_QWORD_PREFIX];
            out.extend_from_slice(&v.to_le_bytes());
            out
        }
    }
}

/// Encode a NUL-terminated AML string constant.
pub fn string(text: &str) -> Vec<u8> {
    assert!(
        text.bytes().all(|b| b != 0 && b.is_ascii()),
        "AML strings must be ASCII without embedded NULs"
    );
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(AML_OP_STRING_PREFIX);
    out.extend_from_slice(text.as_bytes());
    out.push(0);
    out
}

/// Encode `Name (path, data)`.
pub fn name(path: &str, data: &[u8]) -> Vec<u8> {
    let mut out = vec![AML_OP_NAME];
    out.extend_from_slice(&name_string(path));
    out.extend_from_slice(data);
    out
}

/// Encode `Method (path, 0) { body }`.
pub fn method(path: &str, body: &[u8]) -> Vec<u8> {
    let name = name_string(path);
    let payload_len = name.len() + 1 + body.len();

    let mut out = vec![AML_OP_METHOD];
    out.extend_from_slice(&pkg_length(payload_len));
    out.extend_from_slice(&name);
    out.push(0); // method flags: no arguments, not serialized
    out.extend_from_slice(body);
    out
}

/// Encode `Return (data)`.
pub fn return_value(data: &[u8]) -> Vec<u8> {
    let mut out = vec![AML_OP_RETURN];
    out.extend_from_slice(data);
    out
}

/// Encode `Store (text, Debug)`, the expansion of a load-time `Printf`.
pub fn debug_store(text: &str) -> Vec<u8> {
    let mut out = vec![AML_OP_STORE];
    out.extend_from_slice(&string(text));
    out.push(AML_EXT_OP_PREFIX);
    out.push(AML_EXT_OP_DEBUG);
    out
}

/// Decode a PkgLength at `offset`, returning the payload length (excluding the
/// PkgLength bytes) and the number of bytes the encoding occupies.
pub fn parse_pkg_length(bytes: &[u8], offset: usize) -> Option<(usize, usize)> {
    let b0 = *bytes.get(offset)?;
    let follow_bytes = (b0 >> 6) as usize;
    let mut len: usize = (b0 & 0x3F) as usize;
    if follow_bytes > 0 {
        // With follow bytes present only the low nibble of the lead byte holds
        // length bits.
        len &= 0xF;
    }
    for i in 0..follow_bytes {
        let b = *bytes.get(offset + 1 + i)?;
        len |= (b as usize) << (4 + i * 8);
    }
    let pkg_len_bytes = 1 + follow_bytes;
    // The encoded length covers the PkgLength field itself; callers want the
    // payload that follows it.
    len = len.checked_sub(pkg_len_bytes)?;
    Some((len, pkg_len_bytes))
}

/// Decode an integer constant at `offset`, returning the value and the number
/// of bytes consumed.
pub fn parse_integer(bytes: &[u8], offset: usize) -> Option<(u64, usize)> {
    match *bytes.get(offset)? {
        AML_OP_ZERO => Some((0, 1)),
        AML_OP_ONE => Some((1, 1)),
        AML_OP_ONES => Some((u64::MAX, 1)),
        AML_OP_BYTE_PREFIX => Some((*bytes.get(offset + 1)? as u64, 2)),
        AML_OP_WORD_PREFIX => Some((
            u16::from_le_bytes(bytes.get(offset + 1..offset + 3)?.try_into().ok()?) as u64,
            3,
        )),
        AML_OP_DWORD_PREFIX => Some((
            u32::from_le_bytes(bytes.get(offset + 1..offset + 5)?.try_into().ok()?) as u64,
            5,
        )),
        AML_OP_QWORD_PREFIX => Some((
            u64::from_le_bytes(bytes.get(offset + 1..offset + 9)?.try_into().ok()?),
            9,
        )),
        _ => None,
    }
}

/// Decode a string constant at `offset`, returning the text and the number of
/// bytes consumed (prefix, text, terminator).
pub fn parse_string(bytes: &[u8], offset: usize) -> Option<(String, usize)> {
    if *bytes.get(offset)? != AML_OP_STRING_PREFIX {
        return None;
    }
    let rest = bytes.get(offset + 1..)?;
    let nul = rest.iter().position(|&b| b == 0)?;
    let text = std::str::from_utf8(&rest[..nul]).ok()?;
    Some((text.to_owned(), 1 + nul + 1))
}

/// A decoded AML NameString.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Path begins with the root prefix `\`.
    pub absolute: bool,
    pub segs: Vec<[u8; 4]>,
    /// Bytes the encoding occupies.
    pub consumed: usize,
}

fn is_name_seg(bytes: &[u8]) -> bool {
    bytes.len() == 4
        && (bytes[0].is_ascii_uppercase() || bytes[0] == b'_')
        && bytes[1..]
            .iter()
            .all(|&b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// Decode a NameString at `offset`. Parent prefixes (`^`) are not supported;
/// nothing the harness assembles uses them.
pub fn parse_name_string(bytes: &[u8], offset: usize) -> Option<ParsedName> {
    let mut pos = offset;
    let mut absolute = false;
    if *bytes.get(pos)? == AML_NAME_ROOT_PREFIX {
        absolute = true;
        pos += 1;
    }

    let seg_count = match *bytes.get(pos)? {
        AML_NAME_NULL => {
            return Some(ParsedName {
                absolute,
                segs: Vec::new(),
                consumed: pos + 1 - offset,
            });
        }
        AML_NAME_DUAL_PREFIX => {
            pos += 1;
            2
        }
        AML_NAME_MULTI_PREFIX => {
            let count = *bytes.get(pos + 1)?;
            pos += 2;
            count as usize
        }
        _ => 1,
    };

    let mut segs = Vec::with_capacity(seg_count);
    for _ in 0..seg_count {
        let seg = bytes.get(pos..pos + 4)?;
        if !is_name_seg(seg) {
            return None;
        }
        segs.push(seg.try_into().unwrap());
        pos += 4;
    }
    Some(ParsedName {
        absolute,
        segs,
        consumed: pos - offset,
    })
}
