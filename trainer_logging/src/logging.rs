use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, Local};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{LoggingConfig, LoggingMode};
use crate::constants::{DEFAULT_LOG_FILE_NAME, DEFAULT_LOG_LEVEL_CONSOLE, DEFAULT_LOG_LEVEL_FILE};

// Flushes the non-blocking file writer on drop, so it lives for the whole process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

struct Sink {
    writer: BoxMakeWriter,
    default_level: &'static str,
    ansi: bool,
    file: Option<PathBuf>,
}

/// Installs the global subscriber.  Should only be called once; later calls are no-ops.
///
/// Returns the file being logged to, if any.  A log file that cannot be opened falls back to
/// stderr.
pub fn init_logging(cfg: LoggingConfig) -> Option<PathBuf> {
    let target = match &cfg.logging_mode {
        LoggingMode::Directory(log_dir) => Some(log_file_in_dir(log_dir, &cfg.file_prefix)),
        LoggingMode::File(path) => Some(path.clone()),
        LoggingMode::Console => None,
    };

    let (sink, failure) = match target {
        None => (console_sink(), None),
        Some(path) => match file_sink(&path) {
            Ok(sink) => (sink, None),
            Err(e) => (console_sink(), Some((path, e))),
        },
    };

    let file = sink.file.clone();
    install(sink, cfg.use_json);

    if let Some((path, e)) = failure {
        error!("Error logging to file {path:?} ({e}); falling back to console logging.");
    }
    info!(version = %cfg.version, "logging initialized");
    file
}

fn install(sink: Sink, use_json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(sink.default_level))
        .unwrap_or_default();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_ansi(sink.ansi)
        .with_writer(sink.writer);

    let layer: Box<dyn Layer<Registry> + Send + Sync> = if use_json {
        fmt_layer.json().with_filter(filter).boxed()
    } else {
        fmt_layer.with_filter(filter).boxed()
    };
    let _ = tracing_subscriber::registry().with(layer).try_init();
}

fn console_sink() -> Sink {
    Sink {
        writer: BoxMakeWriter::new(std::io::stderr),
        default_level: DEFAULT_LOG_LEVEL_CONSOLE,
        ansi: true,
        file: None,
    }
}

/// Splits `path` into the directory to create and the file name to append to.
fn split_log_path(path: &Path) -> (PathBuf, OsString) {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => (parent.to_path_buf(), name.to_os_string()),
        (_, Some(name)) => (PathBuf::from("."), name.to_os_string()),
        (_, None) => (path.to_path_buf(), OsString::from(DEFAULT_LOG_FILE_NAME)),
    }
}

fn file_sink(path: &Path) -> std::io::Result<Sink> {
    let (dir, file_name) = split_log_path(path);
    std::fs::create_dir_all(&dir)?;

    // Fail now rather than on the first write from the background worker.
    let file = dir.join(&file_name);
    std::fs::OpenOptions::new().create(true).append(true).open(&file)?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, &file_name));
    let _ = FILE_GUARD.set(guard);

    Ok(Sink {
        writer: BoxMakeWriter::new(writer),
        default_level: DEFAULT_LOG_LEVEL_FILE,
        ansi: false,
        file: Some(file),
    })
}

/// Build `<prefix>_<YYYYMMDD>T<HHMMSS><mmm><+/-HHMM>_<pid>.log` in `dir`.
/// Timestamp is in local time with numeric offset (e.g., -0700), filename-safe.
pub fn log_file_in_dir(dir: impl AsRef<Path>, prefix: &str) -> PathBuf {
    let now_local: DateTime<Local> = Local::now();
    let now_fixed: DateTime<FixedOffset> = now_local.with_timezone(now_local.offset());

    let ts = now_fixed.format("%Y%m%dT%H%M%S%3f%z");

    let pid = std::process::id();
    dir.as_ref().join(format!("{prefix}_{ts}_{pid}.log"))
}

/// Parse `<prefix>_<YYYYMMDD>T<HHMMSS><mmm><+/-HHMM>_<pid>.log`
/// Works with full paths or bare filenames.
/// Returns (prefix, timestamp with fixed offset, pid).
pub fn parse_log_file_name(path: impl AsRef<Path>) -> Option<(String, DateTime<FixedOffset>, u32)> {
    let file_name = path.as_ref().file_name()?.to_str()?;
    let file_name = file_name.strip_suffix(".log")?;

    // Split from the right so the prefix may contain underscores.
    let mut parts = file_name.rsplitn(3, '_');
    let pid_str = parts.next()?;
    let ts_str = parts.next()?;
    let prefix = parts.next()?;

    let pid: u32 = pid_str.parse().ok()?;
    let ts = DateTime::parse_from_str(ts_str, "%Y%m%dT%H%M%S%3f%z").ok()?;

    Some((prefix.to_string(), ts, pid))
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn round_trip_make_and_parse() {
        let path = log_file_in_dir(Path::new("/tmp"), "trainer");
        let (base, ts, pid) = parse_log_file_name(&path).expect("parse");
        assert_eq!(base, "trainer");
        assert_eq!(pid, std::process::id());

        let fname = path.file_name().unwrap().to_str().unwrap();
        let ts_part = fname
            .strip_prefix("trainer_")
            .unwrap()
            .strip_suffix(&format!("_{pid}.log"))
            .unwrap();
        assert_eq!(ts_part, ts.format("%Y%m%dT%H%M%S%3f%z").to_string());
    }

    #[test]
    fn parse_known_file() {
        let (base, ts, pid) = parse_log_file_name("breakdown_predictor_20250915T083210123-0700_12345.log").expect("parse");
        assert_eq!(base, "breakdown_predictor");
        assert_eq!(pid, 12345);
        assert_eq!(ts.year(), 2025);
        assert_eq!(ts.month(), 9);
        assert_eq!(ts.hour(), 8);
        assert_eq!(ts.timestamp_subsec_millis(), 123);
        assert_eq!(ts.offset().local_minus_utc(), -7 * 3600);
    }

    #[test]
    fn log_paths_split_into_directory_and_file() {
        assert_eq!(
            split_log_path(Path::new("/var/log/trainer/run.log")),
            (PathBuf::from("/var/log/trainer"), OsString::from("run.log"))
        );
        assert_eq!(split_log_path(Path::new("run.log")), (PathBuf::from("."), OsString::from("run.log")));
        assert_eq!(split_log_path(Path::new("/")), (PathBuf::from("/"), OsString::from(DEFAULT_LOG_FILE_NAME)));
    }

    #[test]
    fn file_sink_creates_missing_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("trainer.log");
        let sink = file_sink(&path).unwrap();
        assert_eq!(sink.file.as_deref(), Some(path.as_path()));
        assert!(path.is_file());
        assert!(!sink.ansi);
    }

    #[test]
    fn rejects_foreign_files() {
        assert!(parse_log_file_name("notes.txt").is_none());
        assert!(parse_log_file_name("trainer_yesterday_12.log").is_none());
        assert!(parse_log_file_name("trainer_20250915T083210123-0700_pid.log").is_none());
    }
}
