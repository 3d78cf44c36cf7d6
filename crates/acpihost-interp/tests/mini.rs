//! Behavior of the bundled mini interpreter against a scripted table host.

use std::cell::RefCell;
use std::rc::Rc;

use acpihost_interp::mini::MiniInterpreter;
use acpihost_interp::{
    GpeDisposition, GpeTrigger, HostHandlers, HostInterface, HostMemory, InitFlags,
    InstallDisposition, InterfaceKind, InterpResult, Interpreter, LogLevel, Object, ObjectType,
    RegionOp, RegionReply, Status, TableHeader,
};
use acpihost_tables::{
    aml, build_rsdp, build_table, build_table_with_oem_id, build_xsdt, RUNNER_ID_TABLE,
    SSDT_SIGNATURE, TABLE_OVERRIDE,
};

/// Minimal in-test host: owns the table images and serves mapping requests.
struct TestSpace {
    blobs: Vec<Box<[u8]>>,
    xsdt: Box<[u8]>,
    rsdp: [u8; acpihost_tables::RSDP_LEN],
}

impl TestSpace {
    fn new(tables: Vec<Vec<u8>>) -> TestSpace {
        let blobs: Vec<Box<[u8]>> = tables.into_iter().map(Vec::into_boxed_slice).collect();
        let entries: Vec<u64> = blobs.iter().map(|blob| blob.as_ptr() as u64).collect();
        let xsdt = build_xsdt(&entries).into_boxed_slice();
        let rsdp = build_rsdp(xsdt.as_ptr() as u64);
        TestSpace { blobs, xsdt, rsdp }
    }
}

impl HostMemory for TestSpace {
    fn rsdp(&self) -> u64 {
        self.rsdp.as_ptr() as u64
    }

    fn map(&self, addr: u64, len: usize) -> InterpResult<&[u8]> {
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
                return Ok(&region[offset..offset + len]);
            }
        }
        Err(Status::InvalidArgument)
    }
}

/// Test capability set: deny/override policy plus notification recording.
#[derive(Default)]
struct TestHandlers {
    notifications: RefCell<Vec<(String, u64)>>,
}

impl HostHandlers for TestHandlers {
    fn on_notify(&self, path: &str, value: u64) -> InterpResult<()> {
        self.notifications.borrow_mut().push((path.to_owned(), value));
        Ok(())
    }

    fn on_region_op(&self, _op: RegionOp) -> InterpResult<RegionReply> {
        Ok(RegionReply::Done)
    }

    fn on_table_install(&self, header: &TableHeader) -> InstallDisposition {
        match &header.oem_table_id {
            b"DENYTABL" => InstallDisposition::Deny,
            b"OVERTABL" => InstallDisposition::Override(TABLE_OVERRIDE),
            _ => InstallDisposition::Allow,
        }
    }

    fn on_gpe(&self, _gpe: u16) -> GpeDisposition {
        GpeDisposition::HANDLED | GpeDisposition::REENABLE
    }
}

fn simple_dsdt() -> Vec<u8> {
    let mut payload = aml::name("VAL_", &aml::integer(7));
    payload.extend_from_slice(&aml::method(
        "MAIN",
        &aml::return_value(&aml::integer(42)),
    ));
    build_table(b"DSDT", 2, &payload)
}

fn booted(tables: Vec<Vec<u8>>) -> MiniInterpreter {
    let mut interp = MiniInterpreter::new(Rc::new(TestSpace::new(tables)));
    interp.initialize(InitFlags::NO_ACPI_MODE).unwrap();
    interp
}

#[test]
fn walks_the_chain_and_evaluates_the_subset() {
    let mut interp = booted(vec![simple_dsdt()]);
    interp.namespace_load().unwrap();

    assert_eq!(
        interp.eval("\\MAIN").unwrap(),
        Some(Object::Integer(42))
    );
    assert_eq!(interp.eval("\\VAL").unwrap(), Some(Object::Integer(7)));
    assert_eq!(interp.eval("\\NOPE"), Err(Status::NotFound));
}

#[test]
fn early_table_access_respects_the_scratch_capacity() {
    let mut interp = MiniInterpreter::new(Rc::new(TestSpace::new(vec![simple_dsdt()])));
    assert_eq!(
        interp.setup_early_table_access(16),
        Err(Status::OutOfMemory)
    );

    let mut interp = MiniInterpreter::new(Rc::new(TestSpace::new(vec![simple_dsdt()])));
    interp.setup_early_table_access(4096).unwrap();
    let dsdt = interp.table_find(*b"DSDT").unwrap();
    assert_eq!(dsdt.header.signature, *b"DSDT");
}

#[test]
fn find_next_walks_same_signature_tables() {
    let ssdt_a = build_table(b"SSDT", 1, &aml::name("AAAA", &aml::integer(1)));
    let ssdt_b = build_table(b"SSDT", 1, &aml::name("BBBB", &aml::integer(2)));
    let mut interp = booted(vec![simple_dsdt(), ssdt_a, ssdt_b]);

    let first = interp.table_find(SSDT_SIGNATURE).unwrap();
    let second = interp.table_find_next(&first).unwrap();
    assert_ne!(first.index, second.index);
    assert_eq!(interp.table_find_next(&second), Err(Status::NotFound));
}

#[test]
fn refcounts_cannot_go_negative() {
    let mut interp = booted(vec![simple_dsdt()]);
    let dsdt = interp.table_find(*b"DSDT").unwrap();

    interp.table_ref(&dsdt).unwrap();
    interp.table_unref(&dsdt).unwrap();
    interp.table_unref(&dsdt).unwrap(); // the staging reference
    assert_eq!(interp.table_unref(&dsdt), Err(Status::InvalidArgument));
}

#[test]
fn install_policy_denies_and_overrides() {
    let mut interp = booted(vec![simple_dsdt()]);
    interp
        .set_table_install_handler(Rc::new(TestHandlers::default()))
        .unwrap();

    let denied = build_table_with_oem_id(b"SSDT", 1, *b"DENYTABL", &aml::name("BAD_", &aml::integer(1)));
    assert_eq!(interp.table_install(&denied), Err(Status::Denied));

    let candidate =
        build_table_with_oem_id(b"SSDT", 1, *b"OVERTABL", &aml::name("NOPE", &aml::integer(1)));
    interp.table_install(&candidate).unwrap();
    interp.namespace_load().unwrap();

    // The replacement table's contents are visible, the candidate's are not.
    assert_eq!(
        interp.eval("\\VAL").unwrap(),
        Some(Object::String("acpihost".to_owned()))
    );
    assert_eq!(interp.eval("\\NOPE"), Err(Status::NotFound));
}

#[test]
fn runner_id_table_defines_the_identity_object() {
    let mut interp = booted(vec![simple_dsdt()]);
    interp.table_install(RUNNER_ID_TABLE).unwrap();
    interp.namespace_load().unwrap();

    let id = interp
        .eval_typed("\\_SI.TID", ObjectType::String)
        .unwrap();
    assert_eq!(id.as_str(), Some("acpihost"));
    assert_eq!(
        interp.eval_typed("\\_SI.TID", ObjectType::Integer),
        Err(Status::TypeMismatch)
    );
}

#[test]
fn corrupted_table_images_do_not_install() {
    let mut interp = booted(vec![simple_dsdt()]);

    let mut corrupt = RUNNER_ID_TABLE.to_vec();
    corrupt[40] ^= 0xFF;
    assert_eq!(interp.table_install(&corrupt), Err(Status::InvalidTable));
}

#[test]
fn interface_registry_semantics() {
    let mut interp = booted(vec![simple_dsdt()]);

    interp
        .install_interface("acpihost", InterfaceKind::Feature)
        .unwrap();
    assert_eq!(
        interp.install_interface("acpihost", InterfaceKind::Feature),
        Err(Status::AlreadyExists)
    );

    interp.uninstall_interface("Windows 2006").unwrap();
    assert_eq!(
        interp.uninstall_interface("Windows 2006"),
        Err(Status::NotFound)
    );
}

#[test]
fn gpe_lifecycle_symmetry() {
    let mut interp = booted(vec![simple_dsdt()]);
    let handlers = Rc::new(TestHandlers::default());

    assert_eq!(interp.enable_gpe(123), Err(Status::NotFound));
    interp
        .install_gpe_handler(123, GpeTrigger::Edge, handlers)
        .unwrap();
    interp.enable_gpe(123).unwrap();

    let disposition = interp.fire_gpe(123).unwrap();
    assert!(disposition.contains(GpeDisposition::HANDLED));

    interp.disable_gpe(123).unwrap();
    assert_eq!(interp.fire_gpe(123), Err(Status::InvalidArgument));

    interp.uninstall_gpe_handler(123).unwrap();
    assert_eq!(interp.uninstall_gpe_handler(123), Err(Status::NotFound));
}

#[test]
fn notifications_reach_the_handler_with_absolute_paths() {
    let mut interp = booted(vec![simple_dsdt()]);
    let handlers = Rc::new(TestHandlers::default());
    interp
        .install_notify_handler(Rc::clone(&handlers) as Rc<dyn HostHandlers>)
        .unwrap();
    interp.namespace_load().unwrap();

    interp.fire_notify("\\_SI", 0x80).unwrap();
    assert_eq!(
        handlers.notifications.borrow().as_slice(),
        &[("\\_SI_".to_owned(), 0x80)]
    );

    assert_eq!(interp.fire_notify("\\GONE", 1), Err(Status::NotFound));
}

#[test]
fn state_reset_returns_to_preboot() {
    let mut interp = booted(vec![simple_dsdt()]);
    interp.set_loop_timeout(9);
    interp.namespace_load().unwrap();

    interp.state_reset();
    assert_eq!(interp.loop_timeout(), 0);
    assert_eq!(interp.table_find(*b"DSDT"), Err(Status::InvalidArgument));
    assert_eq!(interp.eval("\\MAIN"), Err(Status::InvalidArgument));
}

#[test]
fn knobs_are_recorded() {
    let mut interp = MiniInterpreter::new(Rc::new(TestSpace::new(vec![simple_dsdt()])));
    interp.set_loop_timeout(5);
    interp.set_log_level(LogLevel::Warning);
    assert_eq!(interp.loop_timeout(), 5);
    assert_eq!(interp.log_level(), LogLevel::Warning);

    assert!(!interp.host_interface_enabled(HostInterface::ModuleDevice));
    interp
        .enable_host_interface(HostInterface::ModuleDevice)
        .unwrap();
    assert!(interp.host_interface_enabled(HostInterface::ModuleDevice));
}

#[test]
fn namespace_enumeration_is_sorted_and_depth_tagged() {
    let mut interp = booted(vec![simple_dsdt()]);
    interp.table_install(RUNNER_ID_TABLE).unwrap();
    interp.namespace_load().unwrap();

    let mut paths = Vec::new();
    interp.for_each_node(&mut |node| paths.push((node.path.clone(), node.depth)));

    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
    assert!(paths.contains(&("\\".to_owned(), 0)));
    assert!(paths.contains(&("\\MAIN".to_owned(), 1)));
    assert!(paths.contains(&("\\_SI_.TID_".to_owned(), 2)));
}
