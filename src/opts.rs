use std::path::PathBuf;

use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "my-iot-weather", about)]
pub struct Opts {
    /// Show only warnings and errors
    #[structopt(short = "s", long = "silent", conflicts_with = "verbose")]
    pub silent: bool,

    /// Show all log messages
    #[structopt(short = "v", long = "verbose", conflicts_with = "silent")]
    pub verbose: bool,

    /// Suppress timestamps in logs, useful with journald
    #[structopt(long = "suppress-log-timestamps")]
    pub suppress_log_timestamps: bool,

    /// Database path
    #[structopt(long, env = "MYIOT_DB", default_value = "my-iot.sqlite3")]
    pub db: String,

    /// Settings file
    #[structopt(long, parse(from_os_str), env = "MYIOT_SETTINGS", default_value = "my-iot.toml")]
    pub settings: PathBuf,

    #[structopt(subcommand)]
    pub command: Option<Command>,
}

#[derive(StructOpt, Debug, PartialEq)]
pub enum Command {
    /// Read station pushes from stdin, one form-encoded line each (default)
    Ingest,

    /// Print the station sensors and their latest values
    Sensors,
}
