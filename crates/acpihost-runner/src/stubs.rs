//! The fixed capability set registered with the interpreter for every run.

use acpihost_interp::{
    GpeDisposition, HostHandlers, InstallDisposition, InterpResult, RegionOp, RegionReply, Status,
};
use acpihost_tables::{TableHeader, TABLE_OVERRIDE};

/// OEM table id that makes the installation policy reject a candidate table.
pub const DENY_TABLE_ID: &[u8; 8] = b"DENYTABL";

/// OEM table id that makes the installation policy substitute
/// [`TABLE_OVERRIDE`] for the candidate.
pub const OVERRIDE_TABLE_ID: &[u8; 8] = b"OVERTABL";

/// Fixed-behavior handlers: a logging notify receiver, an embedded-controller
/// style region handler whose reads always yield zero, the deny/override
/// table-installation policy, and a GPE handler that immediately re-arms.
pub struct RunnerHandlers;

impl HostHandlers for RunnerHandlers {
    fn on_notify(&self, path: &str, value: u64) -> InterpResult<()> {
        tracing::info!("received a notification from {path} {value:#x}");
        Ok(())
    }

    fn on_region_op(&self, op: RegionOp) -> InterpResult<RegionReply> {
        match op {
            RegionOp::Read { .. } => Ok(RegionReply::Value(0)),
            RegionOp::Attach | RegionOp::Detach | RegionOp::Write { .. } => Ok(RegionReply::Done),
            RegionOp::Other(code) => {
                tracing::warn!("unsupported region operation {code}");
                Err(Status::InvalidArgument)
            }
        }
    }

    fn on_table_install(&self, header: &TableHeader) -> InstallDisposition {
        if &header.oem_table_id == DENY_TABLE_ID {
            return InstallDisposition::Deny;
        }
        if &header.oem_table_id != OVERRIDE_TABLE_ID {
            return InstallDisposition::Allow;
        }
        InstallDisposition::Override(TABLE_OVERRIDE)
    }

    fn on_gpe(&self, _gpe: u16) -> GpeDisposition {
        GpeDisposition::HANDLED | GpeDisposition::REENABLE
    }
}
