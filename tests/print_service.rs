use std::{
    sync::{Arc, Mutex},
    thread,
};

use dymo_label::{
    encode, Bitmap, Catalog, DeviceInfo, Error, HidHandle, HidTransport, JobState, PrintService,
    PrinterProfile, Result, Tape, ValidationError, REPORT_ID, REPORT_SIZE,
};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct Bus {
    devices: Vec<DeviceInfo>,
    removed: Vec<String>,
    writes: Vec<(u8, Vec<u8>)>,
    opens: usize,
    closes: usize,
    open_handles: usize,
    max_open_handles: usize,
    fail_write_at: Option<usize>,
    deny_open: bool,
    status_reply: Vec<u8>,
}

#[derive(Clone, Default)]
struct MockTransport {
    bus: Arc<Mutex<Bus>>,
}

struct MockHandle {
    bus: Arc<Mutex<Bus>>,
    open: bool,
}

impl MockTransport {
    fn with_devices(devices: Vec<DeviceInfo>) -> Self {
        let transport = MockTransport::default();
        transport.bus.lock().unwrap().devices = devices;
        transport
    }

    fn bus(&self) -> std::sync::MutexGuard<'_, Bus> {
        self.bus.lock().unwrap()
    }

    fn written(&self) -> Vec<u8> {
        self.bus()
            .writes
            .iter()
            .flat_map(|(_, frame)| frame.clone())
            .collect()
    }
}

impl HidTransport for MockTransport {
    type Handle = MockHandle;

    fn enumerate(&self) -> Result<Vec<DeviceInfo>> {
        Ok(self.bus().devices.clone())
    }

    fn open(&self, device: &DeviceInfo) -> Result<MockHandle> {
        let mut bus = self.bus();
        if bus.deny_open {
            return Err(Error::PermissionDenied {
                path: device.path.clone(),
            });
        }
        bus.opens += 1;
        bus.open_handles += 1;
        bus.max_open_handles = bus.max_open_handles.max(bus.open_handles);
        Ok(MockHandle {
            bus: self.bus.clone(),
            open: true,
        })
    }

    fn is_connected(&self, path: &str) -> bool {
        !self.bus().removed.iter().any(|removed| removed == path)
    }
}

impl HidHandle for MockHandle {
    fn write_report(&mut self, report_id: u8, data: &[u8]) -> Result<()> {
        let mut bus = self.bus.lock().unwrap();
        assert!(self.open, "write on closed handle");
        if bus.fail_write_at == Some(bus.writes.len()) {
            return Err(Error::IncompleteWrite {
                written: 0,
                expected: data.len(),
            });
        }
        bus.writes.push((report_id, data.to_vec()));
        Ok(())
    }

    fn read_report(&mut self, buf: &mut [u8]) -> Result<usize> {
        let bus = self.bus.lock().unwrap();
        let n = bus.status_reply.len().min(buf.len());
        buf[..n].copy_from_slice(&bus.status_reply[..n]);
        Ok(n)
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            let mut bus = self.bus.lock().unwrap();
            bus.open_handles -= 1;
            bus.closes += 1;
        }
    }
}

fn device(path: &str, serial: &str, vendor_id: u16, product_id: u16) -> DeviceInfo {
    DeviceInfo {
        path: path.to_string(),
        serial_number: Some(serial.to_string()),
        access_denied: false,
        vendor_id,
        product_id,
    }
}

fn pnp(path: &str, serial: &str) -> DeviceInfo {
    device(path, serial, 0x0922, 0x1002)
}

fn unreadable(path: &str) -> DeviceInfo {
    DeviceInfo {
        serial_number: None,
        access_denied: true,
        ..pnp(path, "")
    }
}

fn service(devices: Vec<DeviceInfo>) -> (PrintService<MockTransport>, MockTransport) {
    let transport = MockTransport::with_devices(devices);
    (
        PrintService::new(Catalog::default(), transport.clone()),
        transport,
    )
}

fn label(width: u32, height: u32) -> Bitmap {
    Bitmap::from_fn(width, height, |x, y| (x * 3 + y) % 7 < 3)
}

#[test]
fn unknown_devices_are_not_listed() {
    let (service, _) = service(vec![
        device("usb:001:002", "KEYBOARD", 0x046d, 0xc31c),
        pnp("usb:001:003", "abc123"),
        device("usb:001:004", "OTHER", 0x0922, 0x1001),
    ]);

    let printers = service.list_printers().unwrap();

    assert_eq!(printers.len(), 1);
    assert_eq!(printers[0].serial_number(), "abc123");
    assert_eq!(printers[0].path(), "usb:001:003");
    assert_eq!(printers[0].name(), "DYMO LabelManager PnP");
    assert_eq!(printers[0].label_heights().get(&Tape::D1_9mm), Some(&48));
}

#[test]
fn serial_lookup_ignores_case() {
    let (service, _) = service(vec![pnp("usb:001:003", "abc123")]);

    let printer = service.find_printer("ABC123").unwrap();
    assert_eq!(printer.serial_number(), "abc123");
}

#[test]
fn prints_in_report_sized_frames() {
    let (service, transport) = service(vec![pnp("usb:001:003", "abc123")]);
    let image = label(90, 64);

    service.print_label("ABC123", Tape::D1_12mm, &image).unwrap();

    let expected = encode(&PrinterProfile::label_manager_pnp(), Tape::D1_12mm, &image);
    assert_eq!(transport.written(), expected);

    let bus = transport.bus();
    let (last, full) = bus.writes.split_last().unwrap();
    assert!(full.iter().all(|(_, frame)| frame.len() == REPORT_SIZE));
    assert_eq!(last.1.len(), expected.len() % REPORT_SIZE);
    assert!(bus.writes.iter().all(|(id, _)| *id == REPORT_ID));
    assert_eq!((bus.opens, bus.closes, bus.open_handles), (1, 1, 0));
    drop(bus);

    assert_eq!(service.state("abc123"), JobState::Idle);
}

#[test]
fn missing_printer_is_reported() {
    let (service, transport) = service(vec![
        pnp("usb:001:003", "abc123"),
        device("usb:001:004", "zzz", 0x1234, 0x5678),
    ]);

    match service.print_label("zzz", Tape::D1_12mm, &label(10, 64)) {
        Err(Error::PrinterNotFound(serial)) => assert_eq!(serial, "zzz"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(transport.bus().opens, 0);
    assert_eq!(service.state("zzz"), JobState::Failed);
}

#[test]
fn rejected_jobs_never_open_the_device() {
    let transport = MockTransport::with_devices(vec![pnp("usb:001:003", "abc123")]);
    let small = PrinterProfile::new("DYMO LabelManager PnP", 0x0922, 0x1002)
        .left_margin(112)
        .tape(Tape::D1_6mm, 4)
        .tape(Tape::D1_9mm, 6);
    let service = PrintService::new(Catalog::new(vec![small]).unwrap(), transport.clone());

    match service.print_label("abc123", Tape::D1_12mm, &label(10, 64)) {
        Err(Error::Validation(ValidationError::UnsupportedTape { tape })) => {
            assert_eq!(tape, Tape::D1_12mm)
        }
        other => panic!("unexpected {:?}", other),
    }

    match service.print_label("abc123", Tape::D1_9mm, &label(10, 64)) {
        Err(Error::Validation(ValidationError::HeightMismatch { expected, actual })) => {
            assert_eq!((expected, actual), (48, 64))
        }
        other => panic!("unexpected {:?}", other),
    }

    let bus = transport.bus();
    assert_eq!(bus.opens, 0);
    assert!(bus.writes.is_empty());
}

#[test]
fn failed_write_leaves_device_open_until_next_job() {
    let (service, transport) = service(vec![pnp("usb:001:003", "abc123")]);
    transport.bus().fail_write_at = Some(1);

    let result = service.print_label("abc123", Tape::D1_12mm, &label(90, 64));
    assert!(matches!(result, Err(Error::IncompleteWrite { .. })));
    assert_eq!(service.state("abc123"), JobState::Failed);
    assert_eq!(transport.bus().open_handles, 1);

    transport.bus().fail_write_at = None;
    service.print_label("abc123", Tape::D1_12mm, &label(90, 64)).unwrap();

    let bus = transport.bus();
    assert_eq!(bus.opens, 2);
    assert_eq!(bus.closes, 2);
    assert_eq!(bus.open_handles, 0);
    assert_eq!(bus.max_open_handles, 1);
}

#[test]
fn explicit_close_after_failure() {
    let (service, transport) = service(vec![pnp("usb:001:003", "abc123")]);
    transport.bus().fail_write_at = Some(0);

    assert!(service
        .print_label("abc123", Tape::D1_12mm, &label(4, 64))
        .is_err());
    service.close("ABC123");
    service.close("ABC123");

    let bus = transport.bus();
    assert_eq!(bus.open_handles, 0);
    assert_eq!(bus.closes, 1);
}

#[test]
fn permission_denied_is_distinct() {
    let (service, transport) = service(vec![pnp("usb:001:003", "abc123")]);
    transport.bus().deny_open = true;

    match service.print_label("abc123", Tape::D1_12mm, &label(4, 64)) {
        Err(Error::PermissionDenied { path }) => assert_eq!(path, "usb:001:003"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn unreadable_serial_reports_permission_denied() {
    let (service, transport) = service(vec![
        device("usb:001:002", "KEYBOARD", 0x046d, 0xc31c),
        unreadable("usb:001:003"),
    ]);

    assert!(service.list_printers().unwrap().is_empty());
    match service.print_label("abc123", Tape::D1_12mm, &label(4, 64)) {
        Err(Error::PermissionDenied { path }) => assert_eq!(path, "usb:001:003"),
        other => panic!("unexpected {:?}", other),
    }
    match service.find_printer("") {
        Err(Error::PermissionDenied { path }) => assert_eq!(path, "usb:001:003"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(transport.bus().opens, 0);
}

#[test]
fn readable_printer_wins_over_unreadable_one() {
    let (service, _) = service(vec![unreadable("usb:001:002"), pnp("usb:001:003", "abc123")]);

    let printer = service.find_printer("ABC123").unwrap();
    assert_eq!(printer.path(), "usb:001:003");

    match service.find_printer("other") {
        Err(Error::PermissionDenied { path }) => assert_eq!(path, "usb:001:002"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn missing_serial_number_never_matches() {
    let mut no_serial = pnp("usb:001:003", "");
    no_serial.serial_number = None;
    let (service, _) = service(vec![no_serial]);

    assert!(service.list_printers().unwrap().is_empty());
    assert!(matches!(
        service.find_printer(""),
        Err(Error::PrinterNotFound(_))
    ));
}

#[test]
fn job_state_is_kept_per_printer() {
    let (service, transport) = service(vec![
        pnp("usb:001:003", "abc123"),
        pnp("usb:001:004", "def456"),
    ]);
    transport.bus().fail_write_at = Some(0);

    assert!(service
        .print_label("abc123", Tape::D1_12mm, &label(4, 64))
        .is_err());
    transport.bus().fail_write_at = None;
    service.print_label("DEF456", Tape::D1_12mm, &label(4, 64)).unwrap();

    assert_eq!(service.state("ABC123"), JobState::Failed);
    assert_eq!(service.state("def456"), JobState::Idle);
    assert_eq!(service.state("never-used"), JobState::Idle);
}

#[test]
fn closing_unknown_printer_keeps_no_session() {
    let (service, transport) = service(vec![pnp("usb:001:003", "abc123")]);

    service.close("abc123");
    service.close("nobody");
    assert_eq!(service.session_count(), 0);

    service.print_label("abc123", Tape::D1_12mm, &label(4, 64)).unwrap();
    service.close("ABC123");
    assert_eq!(service.session_count(), 1);
    assert_eq!(transport.bus().closes, 1);
}

#[test]
fn removed_device_is_not_written() {
    let (service, transport) = service(vec![pnp("usb:001:003", "abc123")]);
    transport.bus().removed.push("usb:001:003".to_string());

    let printer = service.find_printer("abc123").unwrap();
    assert!(!service.is_connected(&printer));

    match service.print_label("abc123", Tape::D1_12mm, &label(4, 64)) {
        Err(Error::DeviceDisconnected(path)) => assert_eq!(path, "usb:001:003"),
        other => panic!("unexpected {:?}", other),
    }
    assert!(transport.bus().writes.is_empty());
}

#[test]
fn status_request_round_trip() {
    let (service, transport) = service(vec![pnp("usb:001:003", "abc123")]);
    transport.bus().status_reply = vec![0x40, 0x00, 0x12, 0x64, 0x0d, 0x85, 0x00, 0x00];

    let status = service.request_status("abc123").unwrap();

    assert_eq!(status, vec![0x40, 0x00, 0x12, 0x64, 0x0d, 0x85, 0x00, 0x00]);
    let bus = transport.bus();
    assert_eq!(bus.writes, vec![(0u8, vec![0x1Bu8, 0x41])]);
    assert_eq!(bus.open_handles, 0);
}

#[test]
fn jobs_on_one_printer_do_not_interleave() {
    let (service, transport) = service(vec![pnp("usb:001:003", "abc123")]);
    let service = Arc::new(service);
    let first = Bitmap::from_fn(200, 64, |_, _| true);
    let second = Bitmap::new(150, 64);

    let handles: Vec<_> = vec![first.clone(), second.clone()]
        .into_iter()
        .map(|image| {
            let service = service.clone();
            thread::spawn(move || service.print_label("abc123", Tape::D1_12mm, &image))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let profile = PrinterProfile::label_manager_pnp();
    let a = encode(&profile, Tape::D1_12mm, &first);
    let b = encode(&profile, Tape::D1_12mm, &second);
    let written = transport.written();
    assert!(written == [a.clone(), b.clone()].concat() || written == [b, a].concat());
    assert_eq!(transport.bus().max_open_handles, 1);
}
