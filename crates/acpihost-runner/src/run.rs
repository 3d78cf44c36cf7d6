//! One harness run: options, teardown guard, and the top-level entry point.

use std::rc::Rc;

use thiserror::Error;

use acpihost_interp::{HostHandlers, Interpreter, LogLevel, Status};

use crate::sequence;
use crate::space::{BuildError, TableSpace};
use crate::stubs::RunnerHandlers;
use crate::validate::{Expected, ValidationError};

pub const DEFAULT_LOOP_TIMEOUT_SECS: u32 = 3;

#[derive(Debug, Clone)]
pub enum RunMode {
    /// Load and initialize the namespace, evaluate nothing.
    Emulate,
    /// Evaluate the main test method and validate the result.
    Test { expected: Expected },
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    pub dump_namespace: bool,
    pub loop_timeout_secs: u32,
    pub log_level: LogLevel,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            mode: RunMode::Emulate,
            dump_namespace: false,
            loop_timeout_secs: DEFAULT_LOOP_TIMEOUT_SECS,
            log_level: LogLevel::Trace,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Build(#[from] BuildError),

    /// An interpreter call returned non-success; the status is surfaced
    /// verbatim.
    #[error("interpreter call failed: {0}")]
    Status(#[from] Status),

    #[error("broken early table access: DSDT lookup returned signature {signature:?}")]
    BrokenEarlyAccess { signature: String },

    #[error("second uninstall of interface {interface:?} should report not-found, got {got}")]
    UninstallNotIdempotent {
        interface: &'static str,
        got: String,
    },

    #[error("runner identification object read back as {got}")]
    BadRunnerId { got: String },

    #[error("\\MAIN didn't return a value")]
    NoReturnValue,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("object-api check: {0}")]
    ObjectApi(String),

    #[error("address-space check: {0}")]
    AddressSpaces(String),

    #[error("resource template battery: {0}")]
    Resources(String),
}

/// Teardown guard: resets interpreter state before the table space is
/// released, on every exit path. The field order matters — `interp` drops
/// (releasing its handle on the space) before `space` does.
struct TestRun<I: Interpreter> {
    interp: I,
    space: Rc<TableSpace>,
}

impl<I: Interpreter> Drop for TestRun<I> {
    fn drop(&mut self) {
        // The interpreter may still hold mapped references into the table
        // space until the reset completes.
        self.interp.state_reset();
    }
}

/// Drive one full run. `interp` must have been constructed over `space` (the
/// space serves the interpreter's root-pointer and mapping requests).
pub fn run<I: Interpreter>(
    interp: I,
    space: Rc<TableSpace>,
    opts: &RunOptions,
) -> Result<(), RunError> {
    let handlers: Rc<dyn HostHandlers> = Rc::new(RunnerHandlers);
    let mut run = TestRun { interp, space };
    sequence::drive(&mut run.interp, &run.space, &handlers, opts)
}
