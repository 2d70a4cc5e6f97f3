use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mirage_analysis::LogEntry;
use mirage_core::RasterSurface;

/// Writes presented frames as numbered PNG files.
pub struct FrameWriter {
    dir: PathBuf,
    every: u64,
    written: u64,
}

impl FrameWriter {
    pub fn create(dir: &Path, every: u64) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        tracing::info!(dir = %dir.display(), every, "writing frames");
        Ok(Self {
            dir: dir.to_path_buf(),
            every: every.max(1),
            written: 0,
        })
    }

    /// Save `frame` if it falls on the output cadence. Returns whether a file was written.
    pub fn offer(&mut self, frame: u64, surface: &RasterSurface) -> Result<bool> {
        if frame % self.every != 0 {
            return Ok(false);
        }
        let path = self.dir.join(format!("frame_{frame:06}.png"));
        surface
            .presented()
            .save(&path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.written += 1;
        Ok(true)
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

/// Dump the session log as pretty JSON next to the frames.
pub fn write_log(dir: &Path, entries: &[LogEntry]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    let path = dir.join("session_log.json");
    let json = serde_json::to_string_pretty(entries).context("failed to serialize session log")?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_analysis::LogHandle;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mirage-output-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_writes_on_cadence() {
        let dir = temp_dir("cadence");
        let mut writer = FrameWriter::create(&dir, 3).unwrap();
        let surface = RasterSurface::new(8, 4);
        let written: Vec<bool> = (1..=6).map(|f| writer.offer(f, &surface).unwrap()).collect();
        assert_eq!(written, vec![false, false, true, false, false, true]);
        assert!(dir.join("frame_000003.png").exists());
        assert_eq!(writer.written(), 2);

        let decoded = image::open(dir.join("frame_000006.png")).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_log_dump() {
        let dir = temp_dir("log");
        let log = LogHandle::new();
        log.info("System boot...");
        log.analysis("Detected pupil focus lock, classified as focus mode.");
        let path = write_log(&dir, &log.snapshot()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
        assert_eq!(parsed[1]["kind"], "analysis");
        fs::remove_dir_all(&dir).ok();
    }
}
