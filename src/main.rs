use std::process;

use log::{LevelFilter, Log, Metadata, Record};
use smbinfo_core::{hardware_facts, load_custom_config, SourceConfig};

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("{:<5}: {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

#[derive(Debug, Default, PartialEq, Eq)]
struct Options {
    config: Option<String>,
    hide_serials: bool,
    json: bool,
    verbosity: u8,
}

impl Options {
    fn level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Options, String> {
    let mut options = Options::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                options.config = Some(args.next().ok_or("--config needs a file argument")?);
            }
            "--hide-serials" => options.hide_serials = true,
            "--json" => options.json = true,
            "-v" => options.verbosity += 1,
            "-vv" => options.verbosity += 2,
            _ => return Err(format!("unknown argument '{}'", arg)),
        }
    }
    Ok(options)
}

fn main() {
    let options = match parse_args(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!("usage: smbinfo [--config FILE] [--hide-serials] [--json] [-v|-vv]");
            process::exit(1);
        }
    };

    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(options.level());
    }

    let config = match &options.config {
        Some(path) => match load_custom_config(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("can't load config {}: {}", path, err);
                process::exit(1);
            }
        },
        None => SourceConfig::default(),
    };

    let mut facts = hardware_facts(&config);
    if options.hide_serials {
        facts = facts.without_serials();
    }
    if facts.is_empty() {
        eprintln!("no SMBIOS data found; try running as root");
    }

    if options.json {
        match facts.to_json() {
            Ok(json) => println!("{}", json),
            Err(err) => {
                eprintln!("can't encode facts: {}", err);
                process::exit(1);
            }
        }
        return;
    }

    println!("---");
    println!("{:#?}", facts);
    println!("---");
    print!("{}", facts);
}
