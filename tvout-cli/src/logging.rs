use std::{error::Error, io};

use flexi_logger::{style, DeferredNow, Duplicate, FileSpec, Logger, LoggerHandle, Record, WriteMode};

// `tvout::solver` logs as `solver`
fn component<'a>(record: &Record<'a>) -> &'a str {
  let target = record.target();
  target.strip_prefix("tvout::").unwrap_or(target)
}

fn terminal_format(w: &mut dyn io::Write, _now: &mut DeferredNow, record: &Record) -> io::Result<()> {
  let level = record.level();
  write!(
    w,
    "{} {}: {}",
    style(level).paint(format!("{:<5}", level)),
    component(record),
    record.args()
  )
}

fn file_format(w: &mut dyn io::Write, now: &mut DeferredNow, record: &Record) -> io::Result<()> {
  write!(
    w,
    "{} {:<5} {}: {}",
    now.format("%H:%M:%S%.3f"),
    record.level(),
    component(record),
    record.args()
  )
}

/// Log lines go to stderr so stdout stays parseable. `file` adds a log file sink.
/// The returned handle flushes the file sink when dropped, keep it for the lifetime of `main`.
pub fn init(verbose: bool, file: bool) -> Result<LoggerHandle, Box<dyn Error>> {
  let logger = Logger::try_with_env_or_str(if verbose { "debug" } else { "info" })?
    .format_for_stderr(terminal_format)
    .format_for_files(file_format);

  let handle = if file {
    logger.log_to_file(FileSpec::default())
      .write_mode(WriteMode::BufferAndFlush)
      .duplicate_to_stderr(Duplicate::Warn)
      .start()?
  } else {
    logger.start()?
  };

  Ok(handle)
}
