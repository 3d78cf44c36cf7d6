//! The fixed boot sequence driven against the interpreter.
//!
//! The order below is a contract: every step must succeed before the next
//! runs, and the first non-success status aborts the run with that status as
//! the failure reason. The only fork is test mode versus emulation-only mode.

use std::rc::Rc;

use acpihost_interp::{
    AddressSpace, GpeTrigger, HostHandlers, InitFlags, InterfaceKind, Interpreter, ObjectType,
    Status,
};
use acpihost_tables::{DSDT_SIGNATURE, RUNNER_ID, RUNNER_ID_PATH, RUNNER_ID_TABLE, SSDT_SIGNATURE};

use crate::run::{RunError, RunMode, RunOptions};
use crate::space::TableSpace;
use crate::{checks, dump, validate};

/// Scratch handed to the interpreter for pre-namespace table access.
pub const EARLY_TABLE_SCRATCH_LEN: usize = 4096;

/// The GPE number used to exercise install/enable/disable/uninstall symmetry.
pub const TEST_GPE_NUMBER: u16 = 123;

/// Top-level method evaluated in test mode.
pub const MAIN_PATH: &str = "\\MAIN";

/// Feature interface the harness advertises about itself.
const RUNNER_INTERFACE: &str = RUNNER_ID;

/// Predefined interface whose uninstall semantics the sequence probes: the
/// first uninstall must succeed, the second must report not-found.
const DOOMED_INTERFACE: &str = "Windows 2006";

pub(crate) fn drive<I: Interpreter>(
    interp: &mut I,
    space: &TableSpace,
    handlers: &Rc<dyn HostHandlers>,
    opts: &RunOptions,
) -> Result<(), RunError> {
    interp.set_loop_timeout(opts.loop_timeout_secs);
    interp.set_log_level(opts.log_level);

    interp.setup_early_table_access(EARLY_TABLE_SCRATCH_LEN)?;

    let dsdt = interp.table_find(DSDT_SIGNATURE)?;
    if dsdt.header.signature != DSDT_SIGNATURE {
        return Err(RunError::BrokenEarlyAccess {
            signature: String::from_utf8_lossy(&dsdt.header.signature).into_owned(),
        });
    }
    interp.table_unref(&dsdt)?;

    interp.initialize(InitFlags::NO_ACPI_MODE)?;

    // Bump every AML table's reference count so they are all mapped before
    // namespace load. Mapping requests after this point are expected to carry
    // real physical addresses (from operation regions or other AML traffic),
    // not the synthetic addresses of the tables this run fabricated.
    let _ = interp.table_find(DSDT_SIGNATURE)?;
    let mut cursor = interp.table_find(SSDT_SIGNATURE);
    loop {
        match cursor {
            Ok(table) => {
                interp.table_ref(&table)?;
                cursor = interp.table_find_next(&table);
            }
            Err(Status::NotFound) => break,
            Err(status) => return Err(status.into()),
        }
    }
    space.expect_synthetic_addresses(false);

    interp.install_notify_handler(Rc::clone(handlers))?;
    interp.set_table_install_handler(Rc::clone(handlers))?;

    interp.install_interface(RUNNER_INTERFACE, InterfaceKind::Feature)?;

    interp.uninstall_interface(DOOMED_INTERFACE)?;
    match interp.uninstall_interface(DOOMED_INTERFACE) {
        Err(Status::NotFound) => {}
        Ok(()) => {
            return Err(RunError::UninstallNotIdempotent {
                interface: DOOMED_INTERFACE,
                got: "success".to_owned(),
            });
        }
        Err(status) => {
            return Err(RunError::UninstallNotIdempotent {
                interface: DOOMED_INTERFACE,
                got: status.to_string(),
            });
        }
    }

    interp.enable_host_interface(acpihost_interp::HostInterface::ThermalModel30)?;
    interp.enable_host_interface(acpihost_interp::HostInterface::ModuleDevice)?;

    let test_mode = matches!(opts.mode, RunMode::Test { .. });
    if test_mode {
        interp.table_install(RUNNER_ID_TABLE)?;
    }

    interp.namespace_load()?;

    if test_mode {
        let id = interp.eval_typed(RUNNER_ID_PATH, ObjectType::String)?;
        if id.as_str() != Some(RUNNER_ID) {
            return Err(RunError::BadRunnerId {
                got: format!("{id:?}"),
            });
        }
    }

    interp.install_region_handler(AddressSpace::EmbeddedController, Rc::clone(handlers))?;

    interp.install_gpe_handler(TEST_GPE_NUMBER, GpeTrigger::Edge, Rc::clone(handlers))?;
    interp.enable_gpe(TEST_GPE_NUMBER)?;
    interp.disable_gpe(TEST_GPE_NUMBER)?;
    interp.uninstall_gpe_handler(TEST_GPE_NUMBER)?;

    interp.namespace_initialize()?;

    if opts.dump_namespace {
        dump::namespace(interp);
    }

    let expected = match &opts.mode {
        RunMode::Emulate => return Ok(()),
        RunMode::Test { expected } => expected,
    };

    match expected.value.as_str() {
        checks::OBJECT_API_KEYWORD => return checks::object_api(interp),
        checks::ADDRESS_SPACES_KEYWORD => return checks::address_spaces(interp, handlers),
        _ => {}
    }

    let ret = interp.eval(MAIN_PATH)?.ok_or(RunError::NoReturnValue)?;
    validate::check(&ret, expected)?;
    Ok(())
}
