use dymo_label::{Catalog, PrintService, UsbConfig, UsbTransport};
use std::time::Duration;
//
// cargo run --example read_status
//

fn main() {
    env_logger::init();
    dotenvy::dotenv().ok();

    let config = UsbConfig::default().read_timeout(Duration::from_secs(2));
    let service = PrintService::new(Catalog::default(), UsbTransport::new(config).unwrap());

    let printers = service.list_printers().unwrap();
    let serial = std::env::var("DYMO_SERIAL")
        .ok()
        .or_else(|| printers.first().map(|p| p.serial_number().to_string()));

    match serial {
        Some(serial) => match service.request_status(&serial) {
            Ok(status) => println!("{:02X?}", status),
            Err(err) => println!("Error {:?}", err),
        },
        None => println!("No printer found"),
    }
}
