//! Interpreter-facing interface of the acpihost harness.
//!
//! The harness drives an ACPI interpreter exclusively through the
//! [`Interpreter`] trait, and the interpreter reaches back into the harness
//! through [`HostMemory`] (root pointer + physical-memory mapping) and
//! [`HostHandlers`] (the notify/region/table-install/GPE capability set).
//! A real interpreter integrates by implementing [`Interpreter`]; the bundled
//! [`mini::MiniInterpreter`] covers exactly the surface the boot sequence
//! drives so the harness can be exercised without one.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use thiserror::Error;

pub use acpihost_tables::TableHeader;

pub mod mini;

pub type InterpResult<T> = std::result::Result<T, Status>;

/// Non-success statuses an interpreter call can return.
///
/// The display strings are stable; run failures surface them verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Status {
    #[error("not found")]
    NotFound,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("already exists")]
    AlreadyExists,
    #[error("type mismatch")]
    TypeMismatch,
    #[error("out of memory")]
    OutOfMemory,
    #[error("denied")]
    Denied,
    #[error("invalid table")]
    InvalidTable,
    #[error("no handler")]
    NoHandler,
    #[error("unimplemented")]
    Unimplemented,
}

/// Runtime type tag of a namespace object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Uninitialized,
    Integer,
    String,
    Method,
    Device,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectType::Uninitialized => "Uninitialized",
            ObjectType::Integer => "Integer",
            ObjectType::String => "String",
            ObjectType::Method => "Method",
            ObjectType::Device => "Device",
        })
    }
}

/// A value produced by evaluating a namespace path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Integer(u64),
    String(String),
}

impl Object {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Object::Integer(_) => ObjectType::Integer,
            Object::String(_) => ObjectType::String,
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Object::Integer(value) => Some(*value),
            Object::String(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Object::Integer(_) => None,
            Object::String(text) => Some(text),
        }
    }
}

/// Per-node information surfaced by namespace enumeration.
#[derive(Debug, Clone)]
pub struct NodeInfo {
    /// Absolute dotted path, e.g. `\_SI_.TID_`.
    pub path: String,
    /// Distance from the namespace root.
    pub depth: u32,
    pub object_type: ObjectType,
    /// Declared argument count for methods.
    pub method_args: Option<u8>,
}

/// Handle to an installed table, as returned by the find calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef {
    pub index: usize,
    pub header: TableHeader,
}

bitflags! {
    /// Flags accepted by [`Interpreter::initialize`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InitFlags: u32 {
        /// Do not switch the machine into ACPI mode during initialization.
        const NO_ACPI_MODE = 1 << 0;
    }
}

bitflags! {
    /// What a GPE handler did with an event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GpeDisposition: u8 {
        const HANDLED = 1 << 0;
        const REENABLE = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Trace,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    Vendor,
    Feature,
}

/// Optional host capabilities advertised through `_OSI`-style queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HostInterface {
    ModuleDevice,
    ProcessorDevice,
    ThermalModel30,
    ScpExtensions30,
    ProcessorAggregatorDevice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AddressSpace {
    SystemMemory,
    SystemIo,
    PciConfig,
    EmbeddedController,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpeTrigger {
    Edge,
    Level,
}

/// One operation-region request, dispatched as an explicit tagged variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionOp {
    Attach,
    Detach,
    Read { offset: u64, byte_width: u8 },
    Write { offset: u64, byte_width: u8, value: u64 },
    /// An operation code the host does not recognize.
    Other(u32),
}

/// Successful outcome of a region operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionReply {
    Done,
    Value(u64),
}

/// What the host wants done with a candidate table offered for installation.
#[derive(Debug, Clone, Copy)]
pub enum InstallDisposition {
    Allow,
    Deny,
    /// Install this table instead of the one offered.
    Override(&'static [u8]),
}

/// The capability set a host registers with the interpreter, one object per
/// run.
pub trait HostHandlers {
    /// A namespace node received a notification.
    fn on_notify(&self, path: &str, value: u64) -> InterpResult<()>;

    /// An operation region wants servicing.
    fn on_region_op(&self, op: RegionOp) -> InterpResult<RegionReply>;

    /// A table is about to be installed; the host may veto or substitute it.
    fn on_table_install(&self, header: &TableHeader) -> InstallDisposition;

    /// A general-purpose event fired.
    fn on_gpe(&self, gpe: u16) -> GpeDisposition;
}

/// Memory access the interpreter needs from its host.
pub trait HostMemory {
    /// Physical address of the root system description pointer.
    fn rsdp(&self) -> u64;

    /// Map `len` bytes of physical memory at `addr`.
    fn map(&self, addr: u64, len: usize) -> InterpResult<&[u8]>;
}

/// The entry points the harness drives on an ACPI interpreter.
pub trait Interpreter {
    fn set_loop_timeout(&mut self, seconds: u32);
    fn set_log_level(&mut self, level: LogLevel);

    /// Make tables reachable before full initialization, using at most
    /// `scratch_len` bytes of early scratch memory.
    fn setup_early_table_access(&mut self, scratch_len: usize) -> InterpResult<()>;
    fn initialize(&mut self, flags: InitFlags) -> InterpResult<()>;
    /// Return all process-wide interpreter state to its pre-boot form.
    fn state_reset(&mut self);

    fn table_find(&mut self, signature: [u8; 4]) -> InterpResult<TableRef>;
    fn table_find_next(&mut self, prev: &TableRef) -> InterpResult<TableRef>;
    fn table_ref(&mut self, table: &TableRef) -> InterpResult<()>;
    fn table_unref(&mut self, table: &TableRef) -> InterpResult<()>;
    fn table_install(&mut self, bytes: &[u8]) -> InterpResult<()>;

    fn install_notify_handler(&mut self, handlers: Rc<dyn HostHandlers>) -> InterpResult<()>;
    fn set_table_install_handler(&mut self, handlers: Rc<dyn HostHandlers>) -> InterpResult<()>;
    fn install_region_handler(
        &mut self,
        space: AddressSpace,
        handlers: Rc<dyn HostHandlers>,
    ) -> InterpResult<()>;
    fn uninstall_region_handler(&mut self, space: AddressSpace) -> InterpResult<()>;
    fn install_gpe_handler(
        &mut self,
        gpe: u16,
        trigger: GpeTrigger,
        handlers: Rc<dyn HostHandlers>,
    ) -> InterpResult<()>;
    fn enable_gpe(&mut self, gpe: u16) -> InterpResult<()>;
    fn disable_gpe(&mut self, gpe: u16) -> InterpResult<()>;
    fn uninstall_gpe_handler(&mut self, gpe: u16) -> InterpResult<()>;

    fn install_interface(&mut self, name: &str, kind: InterfaceKind) -> InterpResult<()>;
    fn uninstall_interface(&mut self, name: &str) -> InterpResult<()>;
    fn enable_host_interface(&mut self, interface: HostInterface) -> InterpResult<()>;

    fn namespace_load(&mut self) -> InterpResult<()>;
    fn namespace_initialize(&mut self) -> InterpResult<()>;

    /// Evaluate `path`. Methods that complete without a return value yield
    /// `None`.
    fn eval(&mut self, path: &str) -> InterpResult<Option<Object>>;
    /// Evaluate `path` and require the result to have type `expected`.
    fn eval_typed(&mut self, path: &str, expected: ObjectType) -> InterpResult<Object>;

    /// Visit every namespace node in stable (sorted-path) order.
    fn for_each_node(&self, visit: &mut dyn FnMut(&NodeInfo));
}
