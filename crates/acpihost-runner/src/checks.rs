//! Dedicated check paths selected through magic expected-value keywords.

use std::rc::Rc;

use acpihost_interp::{
    AddressSpace, HostHandlers, Interpreter, ObjectType, RegionOp, RegionReply, Status,
};
use acpihost_tables::{RUNNER_ID, RUNNER_ID_PATH};

use crate::run::RunError;

pub(crate) const OBJECT_API_KEYWORD: &str = "check-object-api-works";
pub(crate) const ADDRESS_SPACES_KEYWORD: &str = "check-address-spaces-work";

/// Exercise typed evaluation and the object accessors against the
/// identification object.
pub(crate) fn object_api<I: Interpreter>(interp: &mut I) -> Result<(), RunError> {
    let id = interp.eval_typed(RUNNER_ID_PATH, ObjectType::String)?;
    if id.object_type() != ObjectType::String {
        return Err(RunError::ObjectApi(format!(
            "typed eval returned a {} object",
            id.object_type()
        )));
    }
    if id.as_str() != Some(RUNNER_ID) {
        return Err(RunError::ObjectApi(format!(
            "identification object read back as {id:?}"
        )));
    }
    if id.as_integer().is_some() {
        return Err(RunError::ObjectApi(
            "string object also claims an integer value".to_owned(),
        ));
    }

    // Asking for the wrong type must fail with a type-mismatch status, not
    // succeed or fall through to some other error.
    match interp.eval_typed(RUNNER_ID_PATH, ObjectType::Integer) {
        Err(Status::TypeMismatch) => Ok(()),
        other => Err(RunError::ObjectApi(format!(
            "wrong-type eval returned {other:?}"
        ))),
    }
}

/// Exercise region-handler install/uninstall semantics and the zero-read
/// contract.
pub(crate) fn address_spaces<I: Interpreter>(
    interp: &mut I,
    handlers: &Rc<dyn HostHandlers>,
) -> Result<(), RunError> {
    // The boot sequence already installed the embedded-controller handler; a
    // duplicate must be rejected.
    match interp.install_region_handler(AddressSpace::EmbeddedController, Rc::clone(handlers)) {
        Err(Status::AlreadyExists) => {}
        other => {
            return Err(RunError::AddressSpaces(format!(
                "duplicate install returned {other:?}"
            )));
        }
    }

    interp.install_region_handler(AddressSpace::SystemIo, Rc::clone(handlers))?;
    interp.uninstall_region_handler(AddressSpace::SystemIo)?;
    match interp.uninstall_region_handler(AddressSpace::SystemIo) {
        Err(Status::NotFound) => {}
        other => {
            return Err(RunError::AddressSpaces(format!(
                "double uninstall returned {other:?}"
            )));
        }
    }

    match handlers.on_region_op(RegionOp::Read {
        offset: 0,
        byte_width: 1,
    }) {
        Ok(RegionReply::Value(0)) => Ok(()),
        other => Err(RunError::AddressSpaces(format!(
            "region read returned {other:?}"
        ))),
    }
}
