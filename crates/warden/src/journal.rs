//! A [`Host`] that keeps its log channels on disk.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use warden_core::{JournalConfig, UnitId};
use warden_security::{Host, LogChannel};

/// File-backed host.
///
/// Each log channel is a file `<log_dir>/<channel>`; entries are prefixed
/// with a local timestamp. With a mudlib root set, file requests the
/// mediator has authorized are served from under it.
#[derive(Debug, Clone)]
pub struct JournalHost {
    log_dir: PathBuf,
    mudlib_root: Option<PathBuf>,
    pending_shutdown: Option<Duration>,
}

impl JournalHost {
    /// Journal into `log_dir`.
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            mudlib_root: None,
            pending_shutdown: None,
        }
    }

    /// Journal where the configuration says.
    pub fn from_config(config: &JournalConfig) -> Self {
        Self::new(&config.log_dir)
    }

    /// Serve file requests from under `root`.
    pub fn with_mudlib_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.mudlib_root = Some(root.into());
        self
    }

    /// Directory holding the channel files.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// File backing a channel.
    pub fn channel_path(&self, channel: LogChannel) -> PathBuf {
        self.log_dir.join(channel.to_string())
    }

    /// Grace period of the most recently scheduled shutdown.
    pub fn pending_shutdown(&self) -> Option<Duration> {
        self.pending_shutdown
    }

    fn local_path(&self, path: &str) -> Option<PathBuf> {
        let root = self.mudlib_root.as_ref()?;
        Some(root.join(path.trim_start_matches('/')))
    }

    fn append(&self, channel: LogChannel, entry: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.log_dir)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.channel_path(channel))?;
        write!(
            file,
            "[{}] {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            entry
        )?;
        if !entry.ends_with('\n') {
            writeln!(file)?;
        }
        Ok(())
    }
}

impl Host for JournalHost {
    fn log_file(&mut self, channel: LogChannel, entry: &str) {
        if let Err(e) = self.append(channel, entry) {
            warn!(%channel, error = %e, "Failed to append to journal");
        }
    }

    fn tell(&mut self, unit: UnitId, message: &str) {
        info!(%unit, message = message.trim_end(), "Tell");
    }

    fn schedule_shutdown(&mut self, grace: Duration) {
        warn!(seconds = grace.as_secs(), "Shutdown scheduled");
        self.pending_shutdown = Some(grace);
    }

    fn write_file(&mut self, path: &str, contents: &str) -> bool {
        let Some(local) = self.local_path(path) else {
            return false;
        };
        let written = local
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(&local, contents));
        match written {
            Ok(()) => true,
            Err(e) => {
                warn!(path, error = %e, "Write failed");
                false
            }
        }
    }

    fn read_file(&mut self, path: &str) -> Option<String> {
        fs::read_to_string(self.local_path(path)?).ok()
    }
}
