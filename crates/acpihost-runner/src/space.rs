//! The synthetic firmware table space owned by one run.
//!
//! `TableSpace` loads the DSDT and SSDT images into stable heap buffers,
//! fabricates an XSDT whose entries are those buffers' addresses and an RSDP
//! pointing at the XSDT, and serves the interpreter's mapping requests back
//! out of that registry. The addresses are synthetic physical addresses: they
//! only mean something to this process, and only for the lifetime of the run
//! that owns them.

use std::cell::Cell;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use acpihost_interp::{HostMemory, InterpResult, Status};
use acpihost_tables::{build_rsdp, build_xsdt, TableHeader, HEADER_LEN, RSDP_LEN};

/// Where one table image comes from.
#[derive(Debug, Clone)]
pub enum TableSource {
    Path(PathBuf),
    Literal(&'static [u8]),
}

impl From<PathBuf> for TableSource {
    fn from(path: PathBuf) -> Self {
        TableSource::Path(path)
    }
}

impl From<&'static [u8]> for TableSource {
    fn from(bytes: &'static [u8]) -> Self {
        TableSource::Literal(bytes)
    }
}

impl TableSource {
    fn describe(&self) -> String {
        match self {
            TableSource::Path(path) => path.display().to_string(),
            TableSource::Literal(bytes) => format!("<literal table, {} bytes>", bytes.len()),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read table source {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("table source {path} is too short for an ACPI header ({len} bytes)")]
    TooShort { path: String, len: usize },
    #[error("table source {path} declares length {declared} but holds {actual} bytes")]
    BadDeclaredLength {
        path: String,
        declared: usize,
        actual: usize,
    },
}

fn load_blob(source: &TableSource) -> Result<Box<[u8]>, BuildError> {
    let bytes = match source {
        TableSource::Path(path) => std::fs::read(path).map_err(|source| BuildError::Read {
            path: path.display().to_string(),
            source,
        })?,
        TableSource::Literal(bytes) => bytes.to_vec(),
    };

    let path = source.describe();
    let header = TableHeader::parse(&bytes).ok_or(BuildError::TooShort {
        path: path.clone(),
        len: bytes.len(),
    })?;
    let declared = header.length as usize;
    if declared < HEADER_LEN || declared > bytes.len() {
        return Err(BuildError::BadDeclaredLength {
            path,
            declared,
            actual: bytes.len(),
        });
    }
    Ok(bytes.into_boxed_slice())
}

/// The table chain for one run: DSDT and SSDT blobs, the XSDT over their
/// addresses, and the RSDP. Implements the interpreter-facing [`HostMemory`]
/// mapping over the owned buffers.
#[derive(Debug)]
pub struct TableSpace {
    /// DSDT first, then SSDTs in caller order.
    blobs: Vec<Box<[u8]>>,
    xsdt: Box<[u8]>,
    rsdp: Box<[u8; RSDP_LEN]>,
    /// While set, every mapping request must resolve to a buffer owned by
    /// this run; the boot sequence clears it once all tables are staged and
    /// later requests are expected to carry real physical addresses.
    expect_synthetic: Cell<bool>,
}

impl TableSpace {
    /// Load all sources and fabricate the pointer chain.
    pub fn build(dsdt: TableSource, ssdts: &[TableSource]) -> Result<TableSpace, BuildError> {
        let mut blobs = Vec::with_capacity(1 + ssdts.len());
        blobs.push(load_blob(&dsdt)?);
        for ssdt in ssdts {
            blobs.push(load_blob(ssdt)?);
        }

        let entries: Vec<u64> = blobs.iter().map(|blob| blob.as_ptr() as u64).collect();
        let xsdt = build_xsdt(&entries).into_boxed_slice();
        let rsdp = Box::new(build_rsdp(xsdt.as_ptr() as u64));

        tracing::debug!(
            "built table space: {} table(s), XSDT at {:#x}, RSDP at {:#x}",
            entries.len(),
            xsdt.as_ptr() as u64,
            rsdp.as_ptr() as u64,
        );

        Ok(TableSpace {
            blobs,
            xsdt,
            rsdp,
            expect_synthetic: Cell::new(true),
        })
    }

    /// Flip whether mapping requests are expected to be synthetic addresses
    /// owned by this run. Order-dependent on purpose: the boot sequence
    /// clears this exactly once, after staging every table.
    pub fn expect_synthetic_addresses(&self, expect: bool) {
        self.expect_synthetic.set(expect);
    }

    /// Number of owned table blobs (DSDT plus SSDTs).
    pub fn table_count(&self) -> usize {
        self.blobs.len()
    }

    /// Addresses of the owned table blobs, in XSDT entry order.
    pub fn table_addresses(&self) -> Vec<u64> {
        self.blobs.iter().map(|blob| blob.as_ptr() as u64).collect()
    }

    /// The fabricated XSDT image.
    pub fn xsdt_bytes(&self) -> &[u8] {
        &self.xsdt
    }

    fn resolve(&self, addr: u64, len: usize) -> Option<&[u8]> {
        let regions = std::iter::once(&self.rsdp[..])
            .chain(std::iter::once(&self.xsdt[..]))
            .chain(self.blobs.iter().map(|blob| &blob[..]));
        for region in regions {
            let base = region.as_ptr() as u64;
            if addr < base {
                continue;
            }
            let offset = (addr - base) as usize;
            if offset <= region.len() && len <= region.len() - offset {
                return Some(&region[offset..offset + len]);
            }
        }
        None
    }
}

impl HostMemory for TableSpace {
    fn rsdp(&self) -> u64 {
        self.rsdp.as_ptr() as u64
    }

    fn map(&self, addr: u64, len: usize) -> InterpResult<&[u8]> {
        match self.resolve(addr, len) {
            Some(bytes) => Ok(bytes),
            None if self.expect_synthetic.get() => {
                tracing::warn!(
                    "mapping request {addr:#x}+{len} does not resolve to a table owned by this run"
                );
                Err(Status::InvalidArgument)
            }
            None => {
                // Real physical addresses (post-staging AML traffic) have no
                // backing in the harness.
                tracing::debug!("refusing to map real physical address {addr:#x}+{len}");
                Err(Status::Unimplemented)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acpihost_tables::{aml, build_table, parse_xsdt_entries, RUNNER_ID_TABLE};
    use std::io::Write;

    fn dsdt_source() -> TableSource {
        TableSource::Literal(Box::leak(
            build_table(b"DSDT", 2, &aml::name("VAL_", &aml::integer(1))).into_boxed_slice(),
        ))
    }

    #[test]
    fn xsdt_lists_dsdt_first_then_ssdts_in_order() {
        let space = TableSpace::build(
            dsdt_source(),
            &[
                TableSource::Literal(RUNNER_ID_TABLE),
                TableSource::Literal(acpihost_tables::TABLE_OVERRIDE),
            ],
        )
        .unwrap();

        assert_eq!(space.table_count(), 3);
        let entries = parse_xsdt_entries(space.xsdt_bytes()).unwrap();
        assert_eq!(entries, space.table_addresses());
    }

    #[test]
    fn mapping_resolves_blobs_and_subranges() {
        let space = TableSpace::build(dsdt_source(), &[]).unwrap();
        let addr = space.table_addresses()[0];

        let header = space.map(addr, HEADER_LEN).unwrap();
        assert_eq!(&header[0..4], b"DSDT");

        // Subrange into the same blob.
        let tail = space.map(addr + 4, 4).unwrap();
        assert_eq!(tail, &header[4..8]);
    }

    #[test]
    fn unknown_addresses_fail_by_mapping_phase() {
        let space = TableSpace::build(dsdt_source(), &[]).unwrap();

        assert_eq!(space.map(0x1234, 4), Err(Status::InvalidArgument));
        space.expect_synthetic_addresses(false);
        assert_eq!(space.map(0x1234, 4), Err(Status::Unimplemented));
    }

    #[test]
    fn unreadable_path_is_a_read_error() {
        let err = TableSpace::build(
            TableSource::Path(PathBuf::from("/nonexistent/dsdt.aml")),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::Read { .. }));
    }

    #[test]
    fn truncated_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; HEADER_LEN - 1]).unwrap();

        let err =
            TableSpace::build(TableSource::Path(file.path().to_path_buf()), &[]).unwrap_err();
        assert!(matches!(err, BuildError::TooShort { .. }));
    }

    #[test]
    fn declared_length_beyond_file_is_rejected() {
        let mut table = build_table(b"DSDT", 2, &[0u8; 4]);
        let declared = table.len() as u32 + 1;
        table[4..8].copy_from_slice(&declared.to_le_bytes());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&table).unwrap();

        let err =
            TableSpace::build(TableSource::Path(file.path().to_path_buf()), &[]).unwrap_err();
        assert!(matches!(err, BuildError::BadDeclaredLength { .. }));
    }
}
