use anyhow::{Context, Result};
use std::io::BufWriter;
use std::path::Path;

use crate::pipeline::RunReport;

/// Write the run summary and per-frame notes as pretty JSON.
pub fn write_notes_json(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create notes file: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Failed to write notes file: {}", path.display()))?;
    log::info!("Wrote notes for {} frames to {}", report.frames.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::FrameNotes;
    use crate::audio::notes::Note;
    use crate::store::ClearSummary;
    use std::path::PathBuf;

    #[test]
    fn notes_json_round_trips_through_serde_value() {
        let report = RunReport {
            sample_rate: 16000,
            fps: 10,
            frame_count: 2,
            frame_offset: 1600,
            window_len: 4000,
            normalization: 812.5,
            cleared: ClearSummary::default(),
            video: Some(PathBuf::from("media/movie.mp4")),
            frames: vec![
                FrameNotes {
                    index: 0,
                    time: 0.0,
                    peak: 0.0,
                    notes: vec![],
                },
                FrameNotes {
                    index: 1,
                    time: 0.1,
                    peak: 1.0,
                    notes: vec![Note {
                        frequency: 440.0,
                        name: "A4".into(),
                        magnitude: 1.0,
                        cents: 0.0,
                    }],
                },
            ],
        };

        let dir = std::env::temp_dir().join(format!("notescope-report-{}", std::process::id()));
        let path = dir.join("notes.json");
        write_notes_json(&path, &report).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["frame_count"], 2);
        assert_eq!(value["video"], "media/movie.mp4");
        assert_eq!(value["frames"][1]["notes"][0]["name"], "A4");
        assert_eq!(value["frames"][1]["notes"][0]["frequency"], 440.0);
        assert!(value["frames"][0]["notes"].as_array().unwrap().is_empty());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
