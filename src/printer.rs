use log::{debug, error, info};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    bitmap::LabelBitmap,
    catalog::Catalog,
    encoder::{encode, status_request},
    error::{Error, Result},
    frames::split,
    model::PrinterProfile,
    tape::Tape,
    transport::{DeviceInfo, HidHandle, HidTransport},
    validate::validate,
    REPORT_ID, REPORT_SIZE,
};

/// A connected printer matched against the catalog.
///
/// Created fresh by every [`PrintService::list_printers`] call; the path of a
/// printer may change when it is plugged in again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPrinter {
    serial_number: String,
    path: String,
    profile: PrinterProfile,
}

impl DiscoveredPrinter {
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn profile(&self) -> &PrinterProfile {
        &self.profile
    }

    pub fn name(&self) -> &str {
        self.profile.name()
    }

    /// Image height in pixels for each tape the printer accepts.
    pub fn label_heights(&self) -> BTreeMap<Tape, u32> {
        self.profile.label_heights()
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            path: self.path.clone(),
            serial_number: Some(self.serial_number.clone()),
            access_denied: false,
            vendor_id: self.profile.vendor_id(),
            product_id: self.profile.product_id(),
        }
    }
}

/// Progress of the most recent print job on one printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    DeviceResolved,
    Validated,
    Open,
    Writing,
    Closed,
    Failed,
}

// Open handle of one printer, if any. Shared by every job for that printer.
type Session<H> = Arc<Mutex<Option<H>>>;

/// Finds printers and prints labels on them.
///
/// Jobs for the same printer are serialised; jobs for different printers run
/// independently and each printer keeps its own [`JobState`].
///
/// ```rust,no_run
/// use dymo_label::{Bitmap, Catalog, PrintService, Tape, UsbConfig, UsbTransport};
///
/// let transport = UsbTransport::new(UsbConfig::default()).unwrap();
/// let service = PrintService::new(Catalog::default(), transport);
///
/// for printer in service.list_printers().unwrap() {
///     let label = Bitmap::from_fn(200, 64, |x, _| x % 20 < 10);
///     service
///         .print_label(printer.serial_number(), Tape::D1_12mm, &label)
///         .unwrap();
/// }
/// ```
pub struct PrintService<T: HidTransport> {
    catalog: Catalog,
    transport: T,
    sessions: Mutex<HashMap<String, Session<T::Handle>>>,
    states: Mutex<HashMap<String, JobState>>,
}

impl<T: HidTransport> PrintService<T> {
    pub fn new(catalog: Catalog, transport: T) -> Self {
        PrintService {
            catalog,
            transport,
            sessions: Mutex::new(HashMap::new()),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// State reached by the last print job on the printer with this serial
    /// number. `Idle` if nothing was printed on it yet.
    pub fn state(&self, serial_number: &str) -> JobState {
        lock(&self.states)
            .get(&serial_number.to_lowercase())
            .copied()
            .unwrap_or(JobState::Idle)
    }

    /// Connected devices that match a profile of the catalog.
    ///
    /// Devices whose serial number cannot be read are left out, since no job
    /// can address them.
    pub fn list_printers(&self) -> Result<Vec<DiscoveredPrinter>> {
        let (printers, _) = self.discover()?;
        Ok(printers)
    }

    /// Printer whose serial number equals `serial_number`, ignoring case.
    ///
    /// When no printer matches but the serial number of a known model could
    /// not be read for lack of permission, that is reported as
    /// [`Error::PermissionDenied`] instead of [`Error::PrinterNotFound`].
    pub fn find_printer(&self, serial_number: &str) -> Result<DiscoveredPrinter> {
        let wanted = serial_number.to_lowercase();
        let (printers, denied) = self.discover()?;
        if let Some(printer) = printers
            .into_iter()
            .find(|printer| printer.serial_number.to_lowercase() == wanted)
        {
            return Ok(printer);
        }
        match denied.into_iter().next() {
            Some(path) => {
                let err = Error::PermissionDenied { path };
                error!("{}", err);
                Err(err)
            }
            None => Err(Error::PrinterNotFound(serial_number.to_string())),
        }
    }

    // Catalog matched printers, and paths of matched devices that refused
    // access while their serial number was read.
    fn discover(&self) -> Result<(Vec<DiscoveredPrinter>, Vec<String>)> {
        let mut printers = Vec::new();
        let mut denied = Vec::new();

        for device in self.transport.enumerate()? {
            let profile = match self.catalog.match_device(device.vendor_id, device.product_id) {
                Some(profile) => profile,
                None => continue,
            };
            match device.serial_number {
                Some(serial_number) => printers.push(DiscoveredPrinter {
                    serial_number,
                    path: device.path,
                    profile: profile.clone(),
                }),
                None if device.access_denied => denied.push(device.path),
                None => debug!("{} at {} has no serial number", profile.name(), device.path),
            }
        }

        debug!("{} printer(s) available", printers.len());
        Ok((printers, denied))
    }

    pub fn is_connected(&self, printer: &DiscoveredPrinter) -> bool {
        self.transport.is_connected(&printer.path)
    }

    /// Print one label.
    ///
    /// `image` must be exactly as high as the tape's printed column, see
    /// [`DiscoveredPrinter::label_heights`]. The job is checked before the
    /// printer is opened. A failed write leaves the printer open; it is closed
    /// by [`PrintService::close`] or before the next job on that printer.
    pub fn print_label<B: LabelBitmap + ?Sized>(
        &self,
        serial_number: &str,
        tape: Tape,
        image: &B,
    ) -> Result<()> {
        self.transition(serial_number, JobState::Idle);
        match self.run_job(serial_number, tape, image) {
            Ok(()) => {
                self.transition(serial_number, JobState::Idle);
                Ok(())
            }
            Err(err) => {
                self.transition(serial_number, JobState::Failed);
                Err(err)
            }
        }
    }

    fn run_job<B: LabelBitmap + ?Sized>(
        &self,
        serial_number: &str,
        tape: Tape,
        image: &B,
    ) -> Result<()> {
        let printer = self.find_printer(serial_number)?;
        self.transition(serial_number, JobState::DeviceResolved);

        let bytes_per_line = validate(&printer.profile, tape, image)?;
        debug!(
            "{}x{} label on {} uses {} bytes per line",
            image.width(),
            image.height(),
            tape,
            bytes_per_line
        );
        self.transition(serial_number, JobState::Validated);

        let session = self.session(&printer.serial_number);
        let mut slot = lock(&session);

        let handle = self.reopen(&printer, &mut slot).map_err(|err| {
            log_failure(&printer, &err);
            err
        })?;
        self.transition(serial_number, JobState::Open);

        if !self.transport.is_connected(&printer.path) {
            error!("Printer {} was removed", printer.path);
            return Err(Error::DeviceDisconnected(printer.path.clone()));
        }

        let data = encode(&printer.profile, tape, image);
        self.transition(serial_number, JobState::Writing);
        for (i, frame) in split(&data, REPORT_SIZE).enumerate() {
            if let Err(err) = handle.write_report(REPORT_ID, frame) {
                debug!("write failed at frame {}", i);
                log_failure(&printer, &err);
                return Err(err);
            }
        }

        handle.close();
        *slot = None;
        self.transition(serial_number, JobState::Closed);
        info!(
            "Printed {} bytes on {} ({})",
            data.len(),
            printer.name(),
            printer.serial_number
        );
        Ok(())
    }

    /// Ask the printer for its status and return the raw reply.
    pub fn request_status(&self, serial_number: &str) -> Result<Vec<u8>> {
        let printer = self.find_printer(serial_number)?;
        let session = self.session(&printer.serial_number);
        let mut slot = lock(&session);

        let handle = self.reopen(&printer, &mut slot)?;
        handle.write_report(REPORT_ID, &status_request())?;

        let mut buf = [0u8; REPORT_SIZE];
        let n = handle.read_report(&mut buf)?;
        debug!("Raw status code: {:X?}", &buf[..n]);

        handle.close();
        *slot = None;
        Ok(buf[..n].to_vec())
    }

    /// Close the printer if a previous job left it open.
    pub fn close(&self, serial_number: &str) {
        let session = match lock(&self.sessions).get(&serial_number.to_lowercase()) {
            Some(session) => session.clone(),
            None => return,
        };
        let mut slot = lock(&session);
        if let Some(mut handle) = slot.take() {
            handle.close();
        }
    }

    /// Number of printers the service holds a session for.
    pub fn session_count(&self) -> usize {
        lock(&self.sessions).len()
    }

    // Close whatever is left in `slot`, then open a fresh handle in it.
    fn reopen<'a>(
        &self,
        printer: &DiscoveredPrinter,
        slot: &'a mut Option<T::Handle>,
    ) -> Result<&'a mut T::Handle> {
        if let Some(mut stale) = slot.take() {
            debug!("closing handle left open on {}", printer.path);
            stale.close();
        }
        let handle = self.transport.open(&printer.device_info())?;
        Ok(slot.get_or_insert(handle))
    }

    fn session(&self, serial_number: &str) -> Session<T::Handle> {
        let mut sessions = lock(&self.sessions);
        sessions
            .entry(serial_number.to_lowercase())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    fn transition(&self, serial_number: &str, state: JobState) {
        debug!("job state of {}: {:?}", serial_number, state);
        lock(&self.states).insert(serial_number.to_lowercase(), state);
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn log_failure(printer: &DiscoveredPrinter, err: &Error) {
    match err {
        Error::PermissionDenied { path } => error!(
            "Permission denied! You are not allowed to access '{}'. Please grant access to HID.",
            path
        ),
        err => error!(
            "Could not print label on {}! error={}",
            printer.path, err
        ),
    }
}
