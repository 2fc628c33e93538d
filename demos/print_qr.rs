use dymo_label::{Catalog, PrintService, Tape, UsbConfig, UsbTransport};
use image::{imageops, GrayImage, Luma};
use qrcode::QrCode;
use std::env;

//
// cargo run --example print_qr [TEXT]
//
// The printer is taken from DYMO_SERIAL (environment or .env), otherwise the
// first printer found is used.
//

fn main() {
    env_logger::init();
    dotenvy::dotenv().ok();

    let text = env::args().nth(1).unwrap_or_else(|| "12345-1".to_string());
    let tape = Tape::D1_12mm;
    let height = tape.height_pixels();

    let qrcode = QrCode::new(text.as_bytes()).unwrap();
    let qrcode: GrayImage = qrcode
        .render::<Luma<u8>>()
        .quiet_zone(false)
        .max_dimensions(height, height)
        .build();

    // white canvas with the code centered vertically and some lead-in
    let mut label = GrayImage::from_pixel(qrcode.width() + 16, height, Luma([0xFF]));
    imageops::overlay(&mut label, &qrcode, 8, (height - qrcode.height()) / 2);

    let transport = UsbTransport::new(UsbConfig::default()).unwrap();
    let service = PrintService::new(Catalog::default(), transport);

    let serial = match env::var("DYMO_SERIAL") {
        Ok(serial) => serial,
        Err(_) => match service.list_printers().unwrap().into_iter().next() {
            Some(printer) => printer.serial_number().to_string(),
            None => {
                eprintln!("No printer found");
                return;
            }
        },
    };

    match service.print_label(&serial, tape, &label) {
        Ok(()) => println!("Printed '{}' on {}", text, serial),
        Err(err) => println!("ERROR {:#?}", err),
    }
}
