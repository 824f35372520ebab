//! Filesystem destination for report tables.

use imageaudit_core::{ReportSink, Result};
use log::info;
use std::path::{Path, PathBuf};

/// Writes each table as a file inside one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    written: Vec<PathBuf>,
}

impl DirectorySink {
    /// Sink rooted at `root`; the directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: Vec::new(),
        }
    }

    /// Directory the tables land in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths written so far, in order.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ReportSink for DirectorySink {
    fn write_table(&mut self, name: &str, contents: &str) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let path = self.root.join(name);
        std::fs::write(&path, contents)?;
        info!("Report generated: {}", path.display());
        self.written.push(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageaudit_core::ScanReport;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_dir() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time")
            .as_nanos();
        std::env::temp_dir().join(format!("imageaudit-sink-{nanos}"))
    }

    #[test]
    fn writes_tables_into_new_directory() {
        let root = unique_dir().join("reports");
        let mut sink = DirectorySink::new(&root);

        sink.write_table("compliant_images.csv", "Repo name\n").expect("write");

        let contents = std::fs::read_to_string(root.join("compliant_images.csv")).expect("read");
        assert_eq!(contents, "Repo name\n");
        assert_eq!(sink.written(), &[root.join("compliant_images.csv")]);
        let _ = std::fs::remove_dir_all(root.parent().expect("parent"));
    }

    #[test]
    fn emits_all_report_tables() {
        let root = unique_dir();
        let mut sink = DirectorySink::new(&root);

        imageaudit_core::emit_tables(&mut sink, &ScanReport::default(), &[]).expect("emit");

        assert_eq!(sink.written().len(), 3);
        for name in [
            "compliant_images.csv",
            "non_compliant_images.csv",
            "build_pipeline_images.csv",
        ] {
            assert!(sink.root().join(name).exists(), "{name} missing");
        }
        let _ = std::fs::remove_dir_all(&root);
    }
}
