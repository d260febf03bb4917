#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes the canonical bilingual meeting fixture as a CSV file.
    pub fn write_meetings_csv(&self) -> PathBuf {
        self.write("meetings.csv", MEETINGS_CSV)
    }
}

/// Eight meetings across two fiscal years with bilingual headers. Column
/// layout: Year(0), Month(1), Region(2), Brand(3), ESS Name(4), offline
/// flag(5), online flag(6), cancellation(7), Event Type(8).
pub const MEETINGS_CSV: &str = "\
Year,Month,Region,Brand,ESS Name,是否需要ESS线下参会,是否需要ESS线上参会,会议取消,Event Type
2024,May,North,Alpha,An,Y,N,,Campaign
2024,May,South,Beta,Bo,N,Y,R,One Time
2024,Jun,North,Alpha,An,Y,N,,Campaign
2024,Jun,East,Beta,Cy,是,否,,Sub Event
2024,Jul,North,Alpha,Bo,Y,N,r,Campaign
2025,Jan,South,Beta,An,N,Y,,One Time
2025,Feb,East,Alpha,Cy,Y,N,,Campaign
2025,Feb,North,Beta,Bo,maybe,,X,Roadshow
";
