//! The acpihost harness core.
//!
//! A run fabricates a synthetic firmware table chain ([`TableSpace`]),
//! registers the fixed capability set ([`RunnerHandlers`]), drives the
//! interpreter through the boot sequence, and validates the result of
//! evaluating `\MAIN` against the expected type/value pair. Teardown (state
//! reset, then table release, in that order) is tied to the run's lifetime
//! and happens on every exit path.

mod checks;
mod dump;
mod run;
mod sequence;
mod space;
mod stubs;
mod validate;

pub mod resources;

pub use run::{run, RunError, RunMode, RunOptions, DEFAULT_LOOP_TIMEOUT_SECS};
pub use sequence::{EARLY_TABLE_SCRATCH_LEN, MAIN_PATH, TEST_GPE_NUMBER};
pub use space::{BuildError, TableSource, TableSpace};
pub use stubs::{RunnerHandlers, DENY_TABLE_ID, OVERRIDE_TABLE_ID};
pub use validate::{Expected, ExpectedType, ValidationError};
