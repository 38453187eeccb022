use std::path::{Path, PathBuf};

/// Name of the project metadata directory.
pub const MARKOV_DIR: &str = ".markov";

/// All well-known paths under `.markov/`.
#[derive(Debug, Clone)]
pub struct MarkovPaths {
    pub root: PathBuf,
    pub markov_dir: PathBuf,
    pub branches_dir: PathBuf,
    pub config_json: PathBuf,
    pub lock_file: PathBuf,
}

impl MarkovPaths {
    /// Derive all paths from a project root. Pure computation, no I/O.
    pub fn discover(project_root: impl Into<PathBuf>) -> Self {
        let root = project_root.into();
        let markov_dir = root.join(MARKOV_DIR);
        Self {
            branches_dir: markov_dir.join("branches"),
            config_json: markov_dir.join("config.json"),
            lock_file: markov_dir.join("LOCK"),
            markov_dir,
            root,
        }
    }

    /// Resolve a branch file under `.markov/branches/<name>.json`.
    pub fn branch_file(&self, name: &str) -> PathBuf {
        self.branches_dir.join(format!("{name}.json"))
    }

    /// Branch name for a path inside `branches/`, if it is a `.json` file.
    pub fn branch_name_of(path: &Path) -> Option<String> {
        if path.extension()? != "json" {
            return None;
        }
        path.file_stem()?.to_str().map(String::from)
    }

    /// Walk up from `start` looking for a directory containing `.markov/`.
    /// Returns `None` if not found.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(MARKOV_DIR).is_dir() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }
}
