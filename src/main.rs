use std::{error::Error, str::FromStr};

use dymo_label::{Bitmap, Catalog, PrintService, Tape, UsbConfig, UsbTransport};

// Luma at or below this prints as ink
const THRESHOLD: u8 = 80;

//
// cargo run -- list
// cargo run -- print 0123456789 12mm label.png
// cargo run -- status 0123456789
//

fn print_usage() {
    println!("Usage: dymo-label <COMMAND>");
    println!("Commands:");
    println!("  list                           List connected printers");
    println!("  print <serial> <tape> <image>  Print an image, tape is 6mm, 9mm or 12mm");
    println!("  status <serial>                Show the raw status reply of a printer");
}

fn main() {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{}:{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                record.args()
            )
        })
        .init();

    let args: Vec<String> = std::env::args().collect();

    if let Err(err) = run(&args) {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), Box<dyn Error>> {
    let command = args.get(1).map(String::as_str);
    if command.is_none() || command == Some("--help") || command == Some("-h") {
        print_usage();
        return Ok(());
    }

    let service = PrintService::new(Catalog::default(), UsbTransport::new(UsbConfig::default())?);

    match (command, &args[2..]) {
        (Some("list"), []) => {
            let printers = service.list_printers()?;
            if printers.is_empty() {
                println!("No printer found");
            }
            for printer in printers {
                println!("{} serial={} path={}", printer.name(), printer.serial_number(), printer.path());
                for (tape, height) in printer.label_heights() {
                    println!("  {:<40} {} pixel", tape.description(), height);
                }
            }
        }
        (Some("print"), [serial, tape, file]) => {
            let tape = Tape::from_str(tape)?;
            let label = Bitmap::from_image(&image::open(file)?, THRESHOLD);
            service.print_label(serial, tape, &label)?;
            println!("Printed {} on {}", file, serial);
        }
        (Some("status"), [serial]) => {
            let status = service.request_status(serial)?;
            println!("{:02X?}", status);
        }
        _ => {
            eprintln!("Error: Unknown command '{}'", args[1..].join(" "));
            print_usage();
        }
    }
    Ok(())
}
