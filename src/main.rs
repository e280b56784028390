//! Entry point.

use crate::core::db::Connection;
use crate::core::handler::Handler;
use crate::logging::Log;
use crate::opts::{Command, Opts};
use crate::prelude::*;
use crossbeam_channel::{Receiver, Sender};
use std::io::{self, BufRead};
use std::thread;
use structopt::StructOpt;

mod core;
mod logging;
mod opts;
mod prelude;
mod settings;

fn main() -> anyhow::Result<()> {
    let opts: Opts = Opts::from_args();
    logging::init(&opts)?;

    info!("Reading settings…");
    let settings = settings::read(&opts.settings)?;
    debug!("Settings: {:?}", &settings);

    info!("Opening the database…");
    let db = Connection::open_and_initialize(&opts.db)?;
    info!("Registering device `{}`…", settings.device.id);
    db.upsert_device(&ParentDevice::from(&settings.device))?;

    match opts.command.unwrap_or(Command::Ingest) {
        Command::Ingest => ingest(db, settings.device.id),
        Command::Sensors => print_sensors(&db, &settings.device.id),
    }
}

/// Feeds the pushes from stdin into the handler until the input is closed.
fn ingest(db: Connection, device_id: String) -> anyhow::Result<()> {
    let handler = Handler::new(db, device_id.clone());
    let (tx, rx) = crossbeam_channel::unbounded();
    spawn_reader(tx)?;

    info!("[{}] Waiting for pushes…", device_id);
    run(&handler, &device_id, rx);
    info!("[{}] The input is closed.", device_id);
    Ok(())
}

fn run<S: DeviceStore>(handler: &Handler<S>, device_id: &str, rx: Receiver<WeatherPayload>) {
    for payload in rx {
        if payload.is_empty() {
            warn!("[{}] Push has no fields, ignoring.", device_id);
            continue;
        }
        debug!("[{}] Received {} fields.", device_id, payload.len());
        match handler.handle(&payload) {
            Ok(cycle) => info!(
                "[{}] Updated: {}, skipped: {}, failed: {}.",
                device_id, cycle.updated, cycle.skipped, cycle.failed
            ),
            Err(error) if error.skips_cycle() => warn!("[{}] Push is ignored: {}", device_id, error),
            Err(error) => error!("[{}] Push has failed: {}", device_id, error),
        }
    }
}

/// Spawns the thread that parses stdin lines into payloads.
fn spawn_reader(tx: Sender<WeatherPayload>) -> io::Result<()> {
    thread::Builder::new().name("my-iot-weather::reader".into()).spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line.log(|| "failed to read stdin") {
                Ok(line) => line,
                Err(_) => break,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if tx.send(WeatherPayload::from_form(line)).is_err() {
                break;
            }
        }
    })?;
    Ok(())
}

/// Station attributes and their labels.
const STATION_ATTRIBUTES: &[(&str, &str)] = &[
    ("station_type", "Station type"),
    ("model", "Model"),
    ("date", "Measured"),
    ("last_update", "Updated"),
];

fn print_sensors(db: &Connection, device_id: &str) -> anyhow::Result<()> {
    for (name, label) in STATION_ATTRIBUTES.iter() {
        if let Some(value) = db.select_device_attribute(device_id, name)? {
            println!("{}: {}", label, value);
        }
    }
    for entity in db.select_entities(device_id)? {
        println!(
            "{:<20} {:>10} {:<5} {}",
            entity.name,
            entity.value.map(|value| value.to_string()).unwrap_or_else(|| "-".into()),
            entity.unit.unwrap_or_default(),
            entity.annotation.unwrap_or_default(),
        );
    }
    Ok(())
}
