use std::path::{Path, PathBuf};

/// All well-known paths under `.buildnote/`.
#[derive(Debug, Clone)]
pub struct BuildnotePaths {
    pub root: PathBuf,
    pub buildnote_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub runs_dir: PathBuf,
    pub state_dir: PathBuf,
    pub key_file: PathBuf,
    pub config_json: PathBuf,
    pub filter_json: PathBuf,
    pub lock_file: PathBuf,
}

impl BuildnotePaths {
    /// Derive all paths from a workspace root. Pure computation, no I/O.
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let buildnote_dir = root.join(".buildnote");
        let state_dir = buildnote_dir.join("state");
        Self {
            logs_dir: buildnote_dir.join("logs"),
            runs_dir: buildnote_dir.join("runs"),
            key_file: buildnote_dir.join("secret.key"),
            config_json: buildnote_dir.join("config.json"),
            filter_json: state_dir.join("filter.json"),
            lock_file: buildnote_dir.join("LOCK"),
            state_dir,
            buildnote_dir,
            root,
        }
    }

    /// Create all required directories. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        for dir in [&self.logs_dir, &self.runs_dir, &self.state_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Check whether `.buildnote/` exists.
    pub fn is_initialized(&self) -> bool {
        self.buildnote_dir.is_dir()
    }

    /// Decorated console log of one run.
    pub fn log_path(&self, run_id: &str) -> PathBuf {
        self.logs_dir.join(format!("{run_id}.log"))
    }

    /// Metadata record of one run.
    pub fn run_path(&self, run_id: &str) -> PathBuf {
        self.runs_dir.join(format!("{run_id}.json"))
    }

    /// Walk up from `start` looking for a directory containing `.buildnote/`.
    /// Returns `None` if not found.
    pub fn find_root(start: &Path) -> Option<PathBuf> {
        let mut cur = start.to_path_buf();
        loop {
            if cur.join(".buildnote").is_dir() {
                return Some(cur);
            }
            if !cur.pop() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_builds_correct_paths() {
        let p = BuildnotePaths::discover("/tmp/repo");
        assert_eq!(p.buildnote_dir, PathBuf::from("/tmp/repo/.buildnote"));
        assert_eq!(p.key_file, PathBuf::from("/tmp/repo/.buildnote/secret.key"));
        assert_eq!(
            p.filter_json,
            PathBuf::from("/tmp/repo/.buildnote/state/filter.json")
        );
        assert_eq!(p.lock_file, PathBuf::from("/tmp/repo/.buildnote/LOCK"));
        assert_eq!(
            p.log_path("run_01"),
            PathBuf::from("/tmp/repo/.buildnote/logs/run_01.log")
        );
        assert_eq!(
            p.run_path("run_01"),
            PathBuf::from("/tmp/repo/.buildnote/runs/run_01.json")
        );
    }

    #[test]
    fn ensure_layout_creates_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let p = BuildnotePaths::discover(tmp.path());
        assert!(!p.is_initialized());
        p.ensure_layout().unwrap();
        assert!(p.is_initialized());
        assert!(p.logs_dir.is_dir());
        assert!(p.runs_dir.is_dir());
        assert!(p.state_dir.is_dir());
    }

    #[test]
    fn find_root_walks_up() {
        let tmp = tempfile::tempdir().unwrap();
        let p = BuildnotePaths::discover(tmp.path());
        p.ensure_layout().unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(
            BuildnotePaths::find_root(&nested).unwrap(),
            tmp.path().to_path_buf()
        );
    }
}
