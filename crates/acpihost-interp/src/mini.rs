//! A minimal table-walking interpreter bundled with the harness.
//!
//! `MiniInterpreter` implements exactly the [`Interpreter`] surface the boot
//! sequence drives: it walks the RSDP/XSDT chain through [`HostMemory`],
//! validates table structure, keeps an installed-table list with reference
//! counts, and loads a deliberately tiny AML subset into a flat namespace —
//! `Name` with literal data, `Method` whose body is a single `Return` of a
//! literal, and load-time `Store` of a string to the Debug object. Anything
//! beyond that subset is [`Status::Unimplemented`]; evaluating general AML is
//! out of scope for the harness.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use acpihost_tables::{
    aml, checksum8, parse_rsdp, parse_xsdt_entries, TableHeader, DSDT_SIGNATURE, HEADER_LEN,
    RSDP_LEN,
};

use crate::{
    AddressSpace, GpeDisposition, GpeTrigger, HostHandlers, HostInterface, HostMemory, InitFlags,
    InstallDisposition, InterfaceKind, InterpResult, Interpreter, LogLevel, NodeInfo, Object,
    ObjectType, Status, TableRef,
};

/// OSI strings pre-installed at initialization, mirroring the set a desktop
/// host would report.
const PREDEFINED_INTERFACES: &[&str] = &[
    "Windows 2000",
    "Windows 2001",
    "Windows 2001 SP1",
    "Windows 2001.1",
    "Windows 2006",
    "Windows 2006 SP1",
    "Windows 2009",
    "Windows 2012",
    "Windows 2013",
    "Windows 2015",
];

/// Scopes that exist before any table is loaded.
const PREDEFINED_SCOPES: &[&str] = &["\\_GPE", "\\_PR_", "\\_SB_", "\\_SI_", "\\_TZ_"];

/// Early-access scratch consumed per staged table.
const EARLY_SLOT_LEN: usize = 32;

#[derive(Debug, Clone)]
enum Node {
    Scope,
    Value(Object),
    Method { arg_count: u8, body: Vec<u8> },
}

impl Node {
    fn object_type(&self) -> ObjectType {
        match self {
            Node::Scope => ObjectType::Uninitialized,
            Node::Value(object) => object.object_type(),
            Node::Method { .. } => ObjectType::Method,
        }
    }
}

struct InstalledTable {
    header: TableHeader,
    bytes: Vec<u8>,
    refcount: u32,
}

struct GpeEntry {
    handlers: Rc<dyn HostHandlers>,
    trigger: GpeTrigger,
    enabled: bool,
}

pub struct MiniInterpreter {
    host: Rc<dyn HostMemory>,
    loop_timeout_secs: u32,
    log_level: LogLevel,

    early_access: bool,
    early_capacity: usize,
    initialized: bool,
    namespace_loaded: bool,
    devices_initialized: bool,

    tables: Vec<InstalledTable>,
    namespace: BTreeMap<String, Node>,
    interfaces: BTreeSet<String>,
    host_interfaces: BTreeSet<HostInterface>,

    notify_handler: Option<Rc<dyn HostHandlers>>,
    install_handler: Option<Rc<dyn HostHandlers>>,
    region_handlers: BTreeMap<AddressSpace, Rc<dyn HostHandlers>>,
    gpes: BTreeMap<u16, GpeEntry>,
}

impl MiniInterpreter {
    pub fn new(host: Rc<dyn HostMemory>) -> Self {
        MiniInterpreter {
            host,
            loop_timeout_secs: 0,
            log_level: LogLevel::Info,
            early_access: false,
            early_capacity: 0,
            initialized: false,
            namespace_loaded: false,
            devices_initialized: false,
            tables: Vec::new(),
            namespace: BTreeMap::new(),
            interfaces: BTreeSet::new(),
            host_interfaces: BTreeSet::new(),
            notify_handler: None,
            install_handler: None,
            region_handlers: BTreeMap::new(),
            gpes: BTreeMap::new(),
        }
    }

    pub fn loop_timeout(&self) -> u32 {
        self.loop_timeout_secs
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn host_interface_enabled(&self, interface: HostInterface) -> bool {
        self.host_interfaces.contains(&interface)
    }

    /// Dispatch a notification for `path` through the installed notify
    /// handler.
    pub fn fire_notify(&self, path: &str, value: u64) -> InterpResult<()> {
        let handler = self.notify_handler.as_ref().ok_or(Status::NoHandler)?;
        let key = normalize_path(path)?;
        if !self.namespace.contains_key(&key) {
            return Err(Status::NotFound);
        }
        handler.on_notify(&key, value)
    }

    /// Raise GPE `gpe`. The event must have a handler installed and be
    /// enabled; the handler's disposition is returned.
    pub fn fire_gpe(&self, gpe: u16) -> InterpResult<GpeDisposition> {
        let entry = self.gpes.get(&gpe).ok_or(Status::NoHandler)?;
        if !entry.enabled {
            return Err(Status::InvalidArgument);
        }
        Ok(entry.handlers.on_gpe(gpe))
    }

    /// Read the table chain published by the host: RSDP, XSDT, then every
    /// entry. The first entry must be the DSDT.
    fn load_chain(&mut self) -> InterpResult<()> {
        let host = Rc::clone(&self.host);

        let rsdp = host.map(host.rsdp(), RSDP_LEN)?.to_vec();
        let xsdt_addr = parse_rsdp(&rsdp).ok_or(Status::InvalidTable)?;

        let xsdt_header =
            TableHeader::parse(host.map(xsdt_addr, HEADER_LEN)?).ok_or(Status::InvalidTable)?;
        let xsdt = host.map(xsdt_addr, xsdt_header.length as usize)?.to_vec();
        let entries = parse_xsdt_entries(&xsdt).ok_or(Status::InvalidTable)?;
        if entries.is_empty() {
            return Err(Status::InvalidTable);
        }

        for (i, &addr) in entries.iter().enumerate() {
            let header =
                TableHeader::parse(host.map(addr, HEADER_LEN)?).ok_or(Status::InvalidTable)?;
            let length = header.length as usize;
            if length < HEADER_LEN {
                return Err(Status::InvalidTable);
            }
            let bytes = host.map(addr, length)?.to_vec();
            if checksum8(&bytes) != 0 {
                return Err(Status::InvalidTable);
            }
            if i == 0 && header.signature != DSDT_SIGNATURE {
                return Err(Status::InvalidTable);
            }
            tracing::debug!(
                "staged table {} ({} bytes)",
                String::from_utf8_lossy(&header.signature),
                length
            );
            self.tables.push(InstalledTable {
                header,
                bytes,
                refcount: 1,
            });
        }
        Ok(())
    }

    fn absolute_path(&self, name: &aml::ParsedName) -> InterpResult<String> {
        let mut segs = Vec::with_capacity(name.segs.len());
        for seg in &name.segs {
            segs.push(std::str::from_utf8(seg).map_err(|_| Status::InvalidTable)?);
        }
        // Relative names resolve against the root; the loader keeps no scope
        // stack.
        Ok(format!("\\{}", segs.join(".")))
    }

    fn insert_node(&mut self, path: String, node: Node) {
        if path != "\\" {
            let parts: Vec<&str> = path[1..].split('.').collect();
            for i in 1..parts.len() {
                let ancestor = format!("\\{}", parts[..i].join("."));
                self.namespace.entry(ancestor).or_insert(Node::Scope);
            }
        }
        if self.namespace.insert(path.clone(), node).is_some() {
            tracing::debug!("redefined namespace object {path}");
        }
    }

    /// Walk a table's AML payload and populate the namespace.
    fn load_aml(&mut self, payload: &[u8]) -> InterpResult<()> {
        let mut offset = 0;
        while offset < payload.len() {
            match payload[offset] {
                aml::AML_OP_NAME => {
                    let name = aml::parse_name_string(payload, offset + 1)
                        .ok_or(Status::InvalidTable)?;
                    let data_off = offset + 1 + name.consumed;
                    let (object, consumed) = parse_data_object(payload, data_off)?;
                    let path = self.absolute_path(&name)?;
                    self.insert_node(path, Node::Value(object));
                    offset = data_off + consumed;
                }
                aml::AML_OP_METHOD => {
                    let (pkg_len, pkg_bytes) =
                        aml::parse_pkg_length(payload, offset + 1).ok_or(Status::InvalidTable)?;
                    let pkg_start = offset + 1 + pkg_bytes;
                    let pkg_end = pkg_start + pkg_len;
                    if pkg_end > payload.len() {
                        return Err(Status::InvalidTable);
                    }
                    let name = aml::parse_name_string(payload, pkg_start)
                        .ok_or(Status::InvalidTable)?;
                    let flags = *payload
                        .get(pkg_start + name.consumed)
                        .ok_or(Status::InvalidTable)?;
                    let body = payload[pkg_start + name.consumed + 1..pkg_end].to_vec();
                    let path = self.absolute_path(&name)?;
                    self.insert_node(
                        path,
                        Node::Method {
                            arg_count: flags & 0x7,
                            body,
                        },
                    );
                    offset = pkg_end;
                }
                aml::AML_OP_STORE => {
                    // Load-time `Printf`: Store (string, Debug).
                    let (text, consumed) =
                        aml::parse_string(payload, offset + 1).ok_or(Status::Unimplemented)?;
                    let debug_off = offset + 1 + consumed;
                    if payload.get(debug_off..debug_off + 2)
                        != Some(&[aml::AML_EXT_OP_PREFIX, aml::AML_EXT_OP_DEBUG][..])
                    {
                        return Err(Status::Unimplemented);
                    }
                    tracing::info!("AML: {text}");
                    offset = debug_off + 2;
                }
                opcode => {
                    tracing::warn!("unsupported AML opcode {opcode:#04x} at offset {offset}");
                    return Err(Status::Unimplemented);
                }
            }
        }
        Ok(())
    }

    fn execute_method(&self, body: &[u8]) -> InterpResult<Option<Object>> {
        if body.is_empty() {
            return Ok(None);
        }
        if body[0] != aml::AML_OP_RETURN {
            return Err(Status::Unimplemented);
        }
        let (object, consumed) = parse_data_object(body, 1)?;
        if 1 + consumed != body.len() {
            return Err(Status::Unimplemented);
        }
        Ok(Some(object))
    }
}

fn parse_data_object(bytes: &[u8], offset: usize) -> InterpResult<(Object, usize)> {
    if let Some((value, consumed)) = aml::parse_integer(bytes, offset) {
        return Ok((Object::Integer(value), consumed));
    }
    if let Some((text, consumed)) = aml::parse_string(bytes, offset) {
        return Ok((Object::String(text), consumed));
    }
    Err(Status::Unimplemented)
}

/// Canonicalize an absolute dotted path: every segment is padded to the fixed
/// 4-byte form, so `\_SI.TID` and `\_SI_.TID_` name the same node.
fn normalize_path(path: &str) -> InterpResult<String> {
    let rest = path.strip_prefix('\\').ok_or(Status::InvalidArgument)?;
    if rest.is_empty() {
        return Ok("\\".to_owned());
    }
    let mut out = String::with_capacity(path.len());
    out.push('\\');
    for (i, seg) in rest.split('.').enumerate() {
        let bytes = seg.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 {
            return Err(Status::InvalidArgument);
        }
        let lead_ok = bytes[0].is_ascii_uppercase() || bytes[0] == b'_';
        let rest_ok = bytes[1..]
            .iter()
            .all(|&b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
        if !lead_ok || !rest_ok {
            return Err(Status::InvalidArgument);
        }
        if i > 0 {
            out.push('.');
        }
        for &b in bytes {
            out.push(b as char);
        }
        for _ in bytes.len()..4 {
            out.push('_');
        }
    }
    Ok(out)
}

fn validate_table_image(bytes: &[u8]) -> InterpResult<(TableHeader, Vec<u8>)> {
    let header = TableHeader::parse(bytes).ok_or(Status::InvalidTable)?;
    let length = header.length as usize;
    if length < HEADER_LEN || length > bytes.len() {
        return Err(Status::InvalidTable);
    }
    let image = bytes[..length].to_vec();
    if checksum8(&image) != 0 {
        return Err(Status::InvalidTable);
    }
    Ok((header, image))
}

impl Interpreter for MiniInterpreter {
    fn set_loop_timeout(&mut self, seconds: u32) {
        self.loop_timeout_secs = seconds;
    }

    fn set_log_level(&mut self, level: LogLevel) {
        tracing::debug!("log level set to {level:?}");
        self.log_level = level;
    }

    fn setup_early_table_access(&mut self, scratch_len: usize) -> InterpResult<()> {
        if self.early_access || self.initialized {
            return Err(Status::AlreadyExists);
        }
        self.early_capacity = scratch_len / EARLY_SLOT_LEN;
        self.load_chain()?;
        if self.tables.len() > self.early_capacity {
            self.tables.clear();
            return Err(Status::OutOfMemory);
        }
        self.early_access = true;
        Ok(())
    }

    fn initialize(&mut self, flags: InitFlags) -> InterpResult<()> {
        if self.initialized {
            return Err(Status::AlreadyExists);
        }
        if self.tables.is_empty() {
            self.load_chain()?;
        }
        if !flags.contains(InitFlags::NO_ACPI_MODE) {
            tracing::debug!("entering ACPI mode");
        }
        for interface in PREDEFINED_INTERFACES {
            self.interfaces.insert((*interface).to_owned());
        }
        self.namespace.insert("\\".to_owned(), Node::Scope);
        for scope in PREDEFINED_SCOPES {
            self.namespace.insert((*scope).to_owned(), Node::Scope);
        }
        self.initialized = true;
        Ok(())
    }

    fn state_reset(&mut self) {
        tracing::debug!("interpreter state reset");
        let host = Rc::clone(&self.host);
        *self = MiniInterpreter::new(host);
    }

    fn table_find(&mut self, signature: [u8; 4]) -> InterpResult<TableRef> {
        if !self.early_access && !self.initialized {
            return Err(Status::InvalidArgument);
        }
        self.tables
            .iter()
            .position(|t| t.header.signature == signature)
            .map(|index| TableRef {
                index,
                header: self.tables[index].header,
            })
            .ok_or(Status::NotFound)
    }

    fn table_find_next(&mut self, prev: &TableRef) -> InterpResult<TableRef> {
        self.tables
            .iter()
            .enumerate()
            .skip(prev.index + 1)
            .find(|(_, t)| t.header.signature == prev.header.signature)
            .map(|(index, t)| TableRef {
                index,
                header: t.header,
            })
            .ok_or(Status::NotFound)
    }

    fn table_ref(&mut self, table: &TableRef) -> InterpResult<()> {
        let entry = self
            .tables
            .get_mut(table.index)
            .ok_or(Status::InvalidArgument)?;
        entry.refcount += 1;
        Ok(())
    }

    fn table_unref(&mut self, table: &TableRef) -> InterpResult<()> {
        let entry = self
            .tables
            .get_mut(table.index)
            .ok_or(Status::InvalidArgument)?;
        if entry.refcount == 0 {
            return Err(Status::InvalidArgument);
        }
        entry.refcount -= 1;
        Ok(())
    }

    fn table_install(&mut self, bytes: &[u8]) -> InterpResult<()> {
        if !self.initialized {
            return Err(Status::InvalidArgument);
        }
        let (header, image) = validate_table_image(bytes)?;
        let (header, image) = match self
            .install_handler
            .as_ref()
            .map(|h| h.on_table_install(&header))
        {
            Some(InstallDisposition::Deny) => {
                tracing::info!(
                    "host denied installation of table {}",
                    String::from_utf8_lossy(&header.oem_table_id)
                );
                return Err(Status::Denied);
            }
            Some(InstallDisposition::Override(replacement)) => {
                tracing::info!(
                    "host overrode installation of table {}",
                    String::from_utf8_lossy(&header.oem_table_id)
                );
                validate_table_image(replacement)?
            }
            Some(InstallDisposition::Allow) | None => (header, image),
        };
        self.tables.push(InstalledTable {
            header,
            bytes: image,
            refcount: 1,
        });
        Ok(())
    }

    fn install_notify_handler(&mut self, handlers: Rc<dyn HostHandlers>) -> InterpResult<()> {
        if self.notify_handler.is_some() {
            return Err(Status::AlreadyExists);
        }
        self.notify_handler = Some(handlers);
        Ok(())
    }

    fn set_table_install_handler(&mut self, handlers: Rc<dyn HostHandlers>) -> InterpResult<()> {
        if self.install_handler.is_some() {
            return Err(Status::AlreadyExists);
        }
        self.install_handler = Some(handlers);
        Ok(())
    }

    fn install_region_handler(
        &mut self,
        space: AddressSpace,
        handlers: Rc<dyn HostHandlers>,
    ) -> InterpResult<()> {
        use std::collections::btree_map::Entry;
        match self.region_handlers.entry(space) {
            Entry::Occupied(_) => Err(Status::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(handlers);
                Ok(())
            }
        }
    }

    fn uninstall_region_handler(&mut self, space: AddressSpace) -> InterpResult<()> {
        self.region_handlers
            .remove(&space)
            .map(|_| ())
            .ok_or(Status::NotFound)
    }

    fn install_gpe_handler(
        &mut self,
        gpe: u16,
        trigger: GpeTrigger,
        handlers: Rc<dyn HostHandlers>,
    ) -> InterpResult<()> {
        use std::collections::btree_map::Entry;
        match self.gpes.entry(gpe) {
            Entry::Occupied(_) => Err(Status::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(GpeEntry {
                    handlers,
                    trigger,
                    enabled: false,
                });
                Ok(())
            }
        }
    }

    fn enable_gpe(&mut self, gpe: u16) -> InterpResult<()> {
        let entry = self.gpes.get_mut(&gpe).ok_or(Status::NotFound)?;
        tracing::debug!("enabling GPE {gpe} ({:?} triggered)", entry.trigger);
        entry.enabled = true;
        Ok(())
    }

    fn disable_gpe(&mut self, gpe: u16) -> InterpResult<()> {
        let entry = self.gpes.get_mut(&gpe).ok_or(Status::NotFound)?;
        entry.enabled = false;
        Ok(())
    }

    fn uninstall_gpe_handler(&mut self, gpe: u16) -> InterpResult<()> {
        self.gpes.remove(&gpe).map(|_| ()).ok_or(Status::NotFound)
    }

    fn install_interface(&mut self, name: &str, kind: InterfaceKind) -> InterpResult<()> {
        if !self.interfaces.insert(name.to_owned()) {
            return Err(Status::AlreadyExists);
        }
        tracing::debug!("installed {kind:?} interface {name:?}");
        Ok(())
    }

    fn uninstall_interface(&mut self, name: &str) -> InterpResult<()> {
        if self.interfaces.remove(name) {
            Ok(())
        } else {
            Err(Status::NotFound)
        }
    }

    fn enable_host_interface(&mut self, interface: HostInterface) -> InterpResult<()> {
        self.host_interfaces.insert(interface);
        Ok(())
    }

    fn namespace_load(&mut self) -> InterpResult<()> {
        if !self.initialized || self.namespace_loaded {
            return Err(Status::InvalidArgument);
        }
        let payloads: Vec<Vec<u8>> = self
            .tables
            .iter()
            .map(|t| t.bytes[HEADER_LEN..].to_vec())
            .collect();
        for payload in &payloads {
            self.load_aml(payload)?;
        }
        self.namespace_loaded = true;
        Ok(())
    }

    fn namespace_initialize(&mut self) -> InterpResult<()> {
        if !self.namespace_loaded || self.devices_initialized {
            return Err(Status::InvalidArgument);
        }
        tracing::debug!("namespace initialized");
        self.devices_initialized = true;
        Ok(())
    }

    fn eval(&mut self, path: &str) -> InterpResult<Option<Object>> {
        if !self.namespace_loaded {
            return Err(Status::InvalidArgument);
        }
        let key = normalize_path(path)?;
        match self.namespace.get(&key).ok_or(Status::NotFound)? {
            Node::Value(object) => Ok(Some(object.clone())),
            Node::Method { body, .. } => {
                let body = body.clone();
                self.execute_method(&body)
            }
            Node::Scope => Err(Status::InvalidArgument),
        }
    }

    fn eval_typed(&mut self, path: &str, expected: ObjectType) -> InterpResult<Object> {
        match self.eval(path)? {
            Some(object) if object.object_type() == expected => Ok(object),
            _ => Err(Status::TypeMismatch),
        }
    }

    fn for_each_node(&self, visit: &mut dyn FnMut(&NodeInfo)) {
        for (path, node) in &self.namespace {
            let depth = if path == "\\" {
                0
            } else {
                1 + path.matches('.').count() as u32
            };
            visit(&NodeInfo {
                path: path.clone(),
                depth,
                object_type: node.object_type(),
                method_args: match node {
                    Node::Method { arg_count, .. } => Some(*arg_count),
                    _ => None,
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_normalize_to_padded_segments() {
        assert_eq!(normalize_path("\\").unwrap(), "\\");
        assert_eq!(normalize_path("\\MAIN").unwrap(), "\\MAIN");
        assert_eq!(normalize_path("\\_SI.TID").unwrap(), "\\_SI_.TID_");
        assert_eq!(normalize_path("\\_SB_.PCI0.A").unwrap(), "\\_SB_.PCI0.A___");
    }

    #[test]
    fn bad_paths_are_rejected() {
        for path in ["MAIN", "\\TOOLONG", "\\lower", "\\A..B", "\\9ABC", ""] {
            assert_eq!(normalize_path(path), Err(Status::InvalidArgument), "{path}");
        }
    }

    #[test]
    fn truncated_or_corrupt_images_are_rejected() {
        let table = acpihost_tables::build_table(b"SSDT", 1, &aml::name("VAL_", &aml::integer(7)));
        assert!(validate_table_image(&table).is_ok());

        assert_eq!(
            validate_table_image(&table[..table.len() - 1]),
            Err(Status::InvalidTable)
        );

        let mut corrupt = table.clone();
        corrupt[40] ^= 0xFF;
        assert_eq!(validate_table_image(&corrupt), Err(Status::InvalidTable));
    }
}
