//! Raw resource-template descriptors.
//!
//! Covers the handful of descriptor kinds the resource battery asserts
//! against: the small IRQ and I/O port descriptors, the large 32-bit fixed
//! memory descriptor, and the end tag. Layouts follow the ACPI
//! resource-template wire format (small items: tag byte with an embedded
//! length; large items: tag byte plus a 16-bit length).

const SMALL_ITEM_IRQ: u8 = 0x04;
const SMALL_ITEM_IO_PORT: u8 = 0x08;
const SMALL_ITEM_END_TAG: u8 = 0x0F;
const LARGE_ITEM_FIXED_MEMORY32: u8 = 0x86;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Small IRQ descriptor (2-byte form): one bit per wired interrupt line.
    Irq { mask: u16 },
    /// Small I/O port descriptor.
    IoPort {
        decode16: bool,
        min: u16,
        max: u16,
        alignment: u8,
        length: u8,
    },
    /// Large 32-bit fixed memory range descriptor.
    FixedMemory32 {
        writable: bool,
        base: u32,
        length: u32,
    },
    /// End tag. The checksum byte is conventionally zero ("ignore").
    EndTag { checksum: u8 },
}

fn small_tag(item: u8, len: usize) -> u8 {
    debug_assert!(len < 8);
    (item << 3) | len as u8
}

/// Encode a template: descriptors in order, each in its wire form.
pub fn encode(resources: &[Resource]) -> Vec<u8> {
    let mut out = Vec::new();
    for resource in resources {
        match *resource {
            Resource::Irq { mask } => {
                out.push(small_tag(SMALL_ITEM_IRQ, 2));
                out.extend_from_slice(&mask.to_le_bytes());
            }
            Resource::IoPort {
                decode16,
                min,
                max,
                alignment,
                length,
            } => {
                out.push(small_tag(SMALL_ITEM_IO_PORT, 7));
                out.push(decode16 as u8);
                out.extend_from_slice(&min.to_le_bytes());
                out.extend_from_slice(&max.to_le_bytes());
                out.push(alignment);
                out.push(length);
            }
            Resource::FixedMemory32 {
                writable,
                base,
                length,
            } => {
                out.push(LARGE_ITEM_FIXED_MEMORY32);
                out.extend_from_slice(&9u16.to_le_bytes());
                out.push(writable as u8);
                out.extend_from_slice(&base.to_le_bytes());
                out.extend_from_slice(&length.to_le_bytes());
            }
            Resource::EndTag { checksum } => {
                out.push(small_tag(SMALL_ITEM_END_TAG, 1));
                out.push(checksum);
            }
        }
    }
    out
}

/// Decode a template. Stops after the end tag; anything unrecognized, any
/// length mismatch, or a missing end tag yields `None`.
pub fn parse(bytes: &[u8]) -> Option<Vec<Resource>> {
    let mut out = Vec::new();
    let mut offset = 0;
    loop {
        let tag = *bytes.get(offset)?;
        if tag & 0x80 != 0 {
            // Large item: 16-bit length follows the tag byte.
            let len =
                u16::from_le_bytes(bytes.get(offset + 1..offset + 3)?.try_into().ok()?) as usize;
            let body = bytes.get(offset + 3..offset + 3 + len)?;
            match tag {
                LARGE_ITEM_FIXED_MEMORY32 if len == 9 => {
                    out.push(Resource::FixedMemory32 {
                        writable: body[0] & 1 != 0,
                        base: u32::from_le_bytes(body[1..5].try_into().unwrap()),
                        length: u32::from_le_bytes(body[5..9].try_into().unwrap()),
                    });
                }
                _ => return None,
            }
            offset += 3 + len;
            continue;
        }

        let item = tag >> 3;
        let len = (tag & 0x7) as usize;
        let body = bytes.get(offset + 1..offset + 1 + len)?;
        match item {
            SMALL_ITEM_IRQ if len == 2 => {
                out.push(Resource::Irq {
                    mask: u16::from_le_bytes(body.try_into().unwrap()),
                });
            }
            SMALL_ITEM_IO_PORT if len == 7 => {
                out.push(Resource::IoPort {
                    decode16: body[0] & 1 != 0,
                    min: u16::from_le_bytes(body[1..3].try_into().unwrap()),
                    max: u16::from_le_bytes(body[3..5].try_into().unwrap()),
                    alignment: body[5],
                    length: body[6],
                });
            }
            SMALL_ITEM_END_TAG if len == 1 => {
                out.push(Resource::EndTag { checksum: body[0] });
                return Some(out);
            }
            _ => return None,
        }
        offset += 1 + len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_port_wire_layout() {
        let encoded = encode(&[Resource::IoPort {
            decode16: true,
            min: 0x62,
            max: 0x62,
            alignment: 1,
            length: 1,
        }]);
        assert_eq!(encoded, [0x47, 0x01, 0x62, 0x00, 0x62, 0x00, 0x01, 0x01]);
    }

    #[test]
    fn parse_requires_an_end_tag() {
        let encoded = encode(&[Resource::Irq { mask: 1 << 9 }]);
        assert_eq!(parse(&encoded), None);
    }

    #[test]
    fn parse_rejects_unknown_items() {
        // Small vendor-defined item (0x0E) is not supported.
        assert_eq!(parse(&[0x71, 0x00, 0x79, 0x00]), None);
    }

    #[test]
    fn template_decodes_to_its_descriptors() {
        let template = [
            0x22, 0x00, 0x02, // IRQ 9
            0x86, 0x09, 0x00, 0x01, 0x00, 0x00, 0x0D, 0xFE, 0x00, 0x04, 0x00, 0x00, // memory
            0x79, 0x00, // end tag
        ];
        assert_eq!(
            parse(&template).unwrap(),
            vec![
                Resource::Irq { mask: 1 << 9 },
                Resource::FixedMemory32 {
                    writable: true,
                    base: 0xFE0D_0000,
                    length: 0x400,
                },
                Resource::EndTag { checksum: 0 },
            ]
        );
    }
}
