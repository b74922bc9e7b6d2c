pub mod config;
pub mod key;
pub mod lock;
pub mod paths;
pub mod runs;
pub mod state;

pub use config::{load_annotate_config, read_config, write_config};
pub use key::{load_key, load_or_create_key};
pub use lock::WorkspaceLock;
pub use paths::BuildnotePaths;
pub use runs::{list_runs, new_run_id, RunRecord};
pub use state::{load_filter, save_filter};

use std::fs;
use std::io::Write;
use std::path::Path;

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// Open an initialized workspace, failing with the usual hint when `.buildnote/` is missing.
pub fn open_workspace(repo_root: &Path) -> anyhow::Result<BuildnotePaths> {
    let paths = BuildnotePaths::discover(repo_root);
    if !paths.is_initialized() {
        anyhow::bail!("No .buildnote/ workspace found. Run `buildnote init` first.");
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sub").join("test.json");
        write_atomic(&path, b"hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn write_atomic_replaces_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn open_workspace_requires_init() {
        let tmp = tempfile::tempdir().unwrap();
        let err = open_workspace(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("buildnote init"));

        BuildnotePaths::discover(tmp.path()).ensure_layout().unwrap();
        assert!(open_workspace(tmp.path()).is_ok());
    }
}
