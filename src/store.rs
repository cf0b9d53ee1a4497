use anyhow::{Context, Result};
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// Outcome of a best-effort cleanup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ClearSummary {
    pub removed: usize,
    pub failed: usize,
}

/// Where rendered frames go. Frames are keyed by a zero-based, contiguous index.
pub trait FrameStore: Sync {
    /// Remove frames left over from a previous run. Never fails the run.
    fn clear(&self) -> ClearSummary;

    fn write_frame(&self, index: usize, frame: &RgbaImage) -> Result<()>;

    /// printf-style pattern the encoder reads the sequence from.
    fn frame_pattern(&self) -> PathBuf;

    fn frame_path(&self, index: usize) -> PathBuf;
}

/// PNG frames in a directory: `<dir>/frame<index>.png`.
pub struct DirFrameStore {
    dir: PathBuf,
}

impl DirFrameStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameStore for DirFrameStore {
    fn clear(&self) -> ClearSummary {
        let mut summary = ClearSummary::default();

        let entries: Vec<_> = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries.collect(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                log::error!("Failed to list {}. Reason: {}", self.dir.display(), err);
                summary.failed += 1;
                Vec::new()
            }
        };

        if !entries.is_empty() {
            log::info!("Deleting old frames in {}", self.dir.display());
        }

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    log::error!("Failed to read entry in {}. Reason: {}", self.dir.display(), err);
                    summary.failed += 1;
                    continue;
                }
            };

            // symlink_metadata so a link to a directory is unlinked, not followed
            let result = match std::fs::symlink_metadata(&path) {
                Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(&path),
                Ok(_) => std::fs::remove_file(&path),
                Err(err) => Err(err),
            };

            match result {
                Ok(()) => summary.removed += 1,
                Err(err) => {
                    log::error!("Failed to delete {}. Reason: {}", path.display(), err);
                    summary.failed += 1;
                }
            }
        }

        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            log::error!("Failed to create {}. Reason: {}", self.dir.display(), err);
        }

        summary
    }

    fn write_frame(&self, index: usize, frame: &RgbaImage) -> Result<()> {
        let path = self.frame_path(index);
        frame
            .save(&path)
            .with_context(|| format!("Failed to write frame {}", path.display()))
    }

    fn frame_pattern(&self) -> PathBuf {
        self.dir.join("frame%d.png")
    }

    fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("frame{}.png", index))
    }
}

/// In-memory store for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryFrameStore {
    pub frames: std::sync::Mutex<std::collections::BTreeMap<usize, RgbaImage>>,
    pub clears: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl FrameStore for MemoryFrameStore {
    fn clear(&self) -> ClearSummary {
        self.clears.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut frames = self.frames.lock().unwrap();
        let removed = frames.len();
        frames.clear();
        ClearSummary { removed, failed: 0 }
    }

    fn write_frame(&self, index: usize, frame: &RgbaImage) -> Result<()> {
        self.frames.lock().unwrap().insert(index, frame.clone());
        Ok(())
    }

    fn frame_pattern(&self) -> PathBuf {
        PathBuf::from("memory").join("frame%d.png")
    }

    fn frame_path(&self, index: usize) -> PathBuf {
        PathBuf::from("memory").join(format!("frame{}.png", index))
    }
}
