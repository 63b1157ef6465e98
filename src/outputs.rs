//! The fixed set of data files a run produces and commits

use std::path::{Path, PathBuf};

/// File names, relative to the data directory, staged by every run
pub const OUTPUT_FILES: [&str; 7] = [
    "studies.json",
    "studies.csv",
    "studies_history.csv",
    "changes.csv",
    "conditions.csv",
    "locations.csv",
    "interventions.csv",
];

#[derive(Debug, Clone)]
pub struct OutputSet {
    repo_root: PathBuf,
    data_dir: String,
}

impl OutputSet {
    /// `data_dir` is relative to `repo_root`
    pub fn new(repo_root: impl Into<PathBuf>, data_dir: &str) -> Self {
        Self {
            repo_root: repo_root.into(),
            data_dir: data_dir.trim_matches('/').to_string(),
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.repo_root.join(&self.data_dir)
    }

    /// Paths relative to the repository root, as git expects them
    pub fn relative_paths(&self) -> Vec<String> {
        OUTPUT_FILES
            .iter()
            .map(|name| {
                if self.data_dir.is_empty() {
                    name.to_string()
                } else {
                    format!("{}/{}", self.data_dir, name)
                }
            })
            .collect()
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.data_dir().join(name)
    }

    /// Relative paths of outputs not present on disk
    pub fn missing(&self) -> Vec<String> {
        self.relative_paths()
            .into_iter()
            .filter(|rel| !Path::new(&self.repo_root).join(rel).is_file())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths_are_under_data_dir() {
        let outputs = OutputSet::new("/repo", "data/");
        let paths = outputs.relative_paths();
        assert_eq!(paths.len(), 7);
        assert_eq!(paths[0], "data/studies.json");
        assert!(paths.contains(&"data/interventions.csv".to_string()));
    }

    #[test]
    fn test_missing_reports_absent_files() {
        let dir = tempfile::tempdir().unwrap();
        let outputs = OutputSet::new(dir.path(), "data");
        assert_eq!(outputs.missing().len(), 7);

        std::fs::create_dir_all(outputs.data_dir()).unwrap();
        for name in OUTPUT_FILES.iter().skip(1) {
            std::fs::write(outputs.path_of(name), "x").unwrap();
        }
        assert_eq!(outputs.missing(), vec!["data/studies.json".to_string()]);
    }
}
