use std::path::PathBuf;

/// Status of processing a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// No embedded SQL needed changes.
    Unchanged,
    /// At least one literal was reformatted (or would be, in check mode).
    Changed,
    /// The file could not be read or written.
    Error,
}

/// Result of processing a single file.
#[derive(Debug, Clone)]
pub struct FileResult {
    pub path: PathBuf,
    pub status: FileStatus,
    pub error: Option<String>,
    /// Literals whose formatted SQL could not be written back.
    pub failures: Vec<String>,
}

impl FileResult {
    pub fn new(path: PathBuf, status: FileStatus) -> Self {
        Self {
            path,
            status,
            error: None,
            failures: Vec::new(),
        }
    }

    pub fn error(path: PathBuf, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::new(path, FileStatus::Error)
        }
    }
}

/// Aggregated report of formatting results.
#[derive(Debug, Default)]
pub struct Report {
    pub results: Vec<FileResult>,
}

impl Report {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
        }
    }

    pub fn add(&mut self, result: FileResult) {
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn unchanged(&self) -> usize {
        self.count(FileStatus::Unchanged)
    }

    pub fn changed(&self) -> usize {
        self.count(FileStatus::Changed)
    }

    pub fn errors(&self) -> usize {
        self.count(FileStatus::Error)
    }

    fn count(&self, status: FileStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Number of literals left untouched because of quoting conflicts.
    pub fn failures(&self) -> usize {
        self.results.iter().map(|r| r.failures.len()).sum()
    }

    pub fn has_errors(&self) -> bool {
        self.errors() > 0 || self.failures() > 0
    }

    pub fn has_changes(&self) -> bool {
        self.changed() > 0
    }

    /// Process exit code: 2 for errors or quoting failures, 1 when `check`
    /// found changes, 0 otherwise.
    pub fn exit_code(&self, check: bool) -> i32 {
        if self.has_errors() {
            2
        } else if check && self.has_changes() {
            1
        } else {
            0
        }
    }

    /// Generate a summary string.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("{} file(s) processed", self.total()));
        if self.changed() > 0 {
            parts.push(format!("{} reformatted", self.changed()));
        }
        if self.unchanged() > 0 {
            parts.push(format!("{} unchanged", self.unchanged()));
        }
        if self.failures() > 0 {
            parts.push(format!("{} literal(s) skipped", self.failures()));
        }
        if self.errors() > 0 {
            parts.push(format!("{} error(s)", self.errors()));
        }
        parts.join(", ")
    }

    /// Print error details.
    pub fn print_errors(&self) {
        for result in &self.results {
            if let Some(ref error) = result.error {
                eprintln!("error: {}: {}", result.path.display(), error);
            }
            for failure in &result.failures {
                eprintln!("error: {}: {}", result.path.display(), failure);
            }
        }
    }
}
