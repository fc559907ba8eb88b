use std::io::Write;

use log::{LevelFilter, Record, SetLoggerError};
use serde::Serialize;

/// Hands every enabled record to each of its sinks in order
pub struct Logger<const N: usize> {
    pub sinks: [fn(&Record); N],
}

impl<const N: usize> log::Log for Logger<N> {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            for sink in &self.sinks {
                (sink)(record)
            }
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// `[target][LEVEL] message`
pub fn format_text(record: &Record) -> String {
    format!("[{}][{}] {}", record.target(), record.level(), record.args())
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    level: &'a str,
    target: &'a str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    module: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<u32>,
}

/// One JSON object per record
pub fn format_json(record: &Record) -> String {
    let data = JsonRecord {
        level: record.level().as_str(),
        target: record.target(),
        message: record.args().to_string(),
        module: record.module_path(),
        line: record.line(),
    };
    serde_json::to_string(&data).unwrap_or_else(|_| format_text(record))
}

pub fn text_sink(record: &Record) {
    let _ = writeln!(std::io::stderr().lock(), "{}", format_text(record));
}

pub fn json_sink(record: &Record) {
    let _ = writeln!(std::io::stderr().lock(), "{}", format_json(record));
}

static TEXT_LOGGER: Logger<1> = Logger { sinks: [text_sink] };
static JSON_LOGGER: Logger<1> = Logger { sinks: [json_sink] };

/// Installs a stderr logger, printing JSON lines when `json` is set.
pub fn init(level: LevelFilter, json: bool) -> Result<(), SetLoggerError> {
    log::set_logger(if json { &JSON_LOGGER } else { &TEXT_LOGGER })?;
    log::set_max_level(level);
    Ok(())
}
