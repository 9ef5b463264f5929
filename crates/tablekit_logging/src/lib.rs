//! Tracing setup for tablekit binaries.
//!
//! Events go to two places: a size-capped log file under the tablekit home
//! directory, and stderr. The file always receives the configured filter;
//! stderr only shows warnings unless the binary runs verbose, so command
//! output on stdout stays clean.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "tablekit=info,tablekit_cli=info";
const HOME_ENV: &str = "TABLEKIT_HOME";
const KEPT_LOG_FILES: usize = 3;
const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Logging options of one binary.
pub struct LogConfig<'a> {
    /// Base name of the log file.
    pub app_name: &'a str,
    /// Mirror the full filter to stderr instead of warnings only.
    pub verbose: bool,
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_logging(config: LogConfig<'_>) -> Result<()> {
    let dir = ensure_logs_dir()?;
    let writer = LogFileWriter::open(&dir, config.app_name)?;

    let console_filter = if config.verbose {
        configured_filter()
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(configured_filter()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    Ok(())
}

fn configured_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Tablekit home directory: `$TABLEKIT_HOME`, or `~/.tablekit`.
pub fn tablekit_home() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(path));
    }
    dirs::home_dir()
        .map(|home| home.join(".tablekit"))
        .context("Could not determine home directory; set TABLEKIT_HOME")
}

pub fn logs_dir() -> Result<PathBuf> {
    Ok(tablekit_home()?.join("logs"))
}

/// Create the logs directory if needed and return it.
pub fn ensure_logs_dir() -> Result<PathBuf> {
    let dir = logs_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir)
}

/// Append-only log file that starts over once it passes a size cap.
///
/// On rotation `name.log` becomes `name.log.1`, older generations shift up by
/// one, and anything past the kept count is deleted.
struct SizeCappedFile {
    path: PathBuf,
    keep: usize,
    cap: u64,
    file: File,
    written: u64,
}

impl SizeCappedFile {
    fn open(path: PathBuf, keep: usize, cap: u64) -> io::Result<Self> {
        let file = append(&path)?;
        let written = file.metadata()?.len();
        let mut log = Self {
            path,
            keep: keep.max(1),
            cap,
            file,
            written,
        };
        if log.written >= log.cap {
            log.rotate()?;
        }
        Ok(log)
    }

    fn generation(&self, n: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", n));
        PathBuf::from(name)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let oldest = self.keep - 1;
        if oldest == 0 {
            self.file = File::create(&self.path)?;
            self.written = 0;
            return Ok(());
        }

        let expired = self.generation(oldest);
        if expired.exists() {
            fs::remove_file(&expired)?;
        }
        for n in (1..oldest).rev() {
            let from = self.generation(n);
            if from.exists() {
                fs::rename(&from, self.generation(n + 1))?;
            }
        }
        fs::rename(&self.path, self.generation(1))?;

        self.file = append(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for SizeCappedFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.cap {
            self.rotate()?;
        }
        let n = self.file.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `MakeWriter` handing every event the same locked file.
#[derive(Clone)]
struct LogFileWriter {
    file: Arc<Mutex<SizeCappedFile>>,
}

impl LogFileWriter {
    fn open(dir: &Path, app_name: &str) -> Result<Self> {
        let path = dir.join(format!("{}.log", file_stem(app_name)));
        let file = SizeCappedFile::open(path.clone(), KEPT_LOG_FILES, MAX_LOG_FILE_SIZE)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogFileWriter {
    type Writer = LogFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?
            .flush()
    }
}

fn file_stem(app_name: &str) -> String {
    let stem: String = app_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        "tablekit".to_string()
    } else {
        stem
    }
}
