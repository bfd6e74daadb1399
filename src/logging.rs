//! Append-only metrics sink. Scalars go into a CSV, image snapshots are
//! written as tiled PNGs keyed by the global step. Nothing here is ever read
//! back by the drivers; the counters exist so runs can report what was
//! emitted.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::export::{ExportError, write_batch_png};
use crate::post::Snapshot;

pub struct SummaryWriter {
    dir: PathBuf,
    snapshots: usize,
    scalars: usize,
}

impl SummaryWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, ExportError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            snapshots: 0,
            scalars: 0,
        })
    }

    /// Append one scalar record as `step,tag,value`.
    pub fn log_scalar(&mut self, tag: &str, value: f32, step: usize) -> Result<(), ExportError> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join("scalars.csv"))?;
        writeln!(file, "{step},{tag},{value}")?;
        self.scalars += 1;
        Ok(())
    }

    /// Emit the label/input/output image triple for one batch at the given
    /// global step. Counts as a single image-log call.
    pub fn log_snapshot(&mut self, step: usize, snapshot: &Snapshot) -> Result<(), ExportError> {
        for (tag, array) in [
            ("label", &snapshot.label),
            ("input", &snapshot.input),
            ("output", &snapshot.output),
        ] {
            write_batch_png(&self.dir.join(format!("{tag}-{step:06}.png")), array)?;
        }
        self.snapshots += 1;
        Ok(())
    }

    pub fn snapshots(&self) -> usize {
        self.snapshots
    }

    pub fn scalars(&self) -> usize {
        self.scalars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::HostArray;

    fn snapshot() -> Snapshot {
        let plane = HostArray::new([1, 2, 2, 1], vec![0.0, 1.0, 1.0, 0.0]);
        Snapshot::new(plane.clone(), plane.clone(), plane)
    }

    #[test]
    fn creates_directory_and_counts_emissions() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("log").join("train");
        let mut writer = SummaryWriter::new(&dir).unwrap();

        writer.log_snapshot(0, &snapshot()).unwrap();
        writer.log_snapshot(1, &snapshot()).unwrap();
        writer.log_scalar("loss", 0.5, 1).unwrap();

        assert_eq!(writer.snapshots(), 2);
        assert_eq!(writer.scalars(), 1);
        assert!(dir.join("label-000000.png").exists());
        assert!(dir.join("input-000001.png").exists());
        assert!(dir.join("output-000001.png").exists());

        let csv = std::fs::read_to_string(dir.join("scalars.csv")).unwrap();
        assert_eq!(csv.trim(), "1,loss,0.5");
    }

    #[test]
    fn scalar_log_is_append_only() {
        let root = tempfile::tempdir().unwrap();
        let mut writer = SummaryWriter::new(root.path()).unwrap();
        writer.log_scalar("loss", 1.0, 1).unwrap();
        writer.log_scalar("loss", 0.5, 2).unwrap();

        let csv = std::fs::read_to_string(root.path().join("scalars.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["1,loss,1", "2,loss,0.5"]);
    }
}
