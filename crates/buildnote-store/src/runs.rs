use crate::paths::BuildnotePaths;
use crate::write_atomic;
use buildnote_core::Charset;
use serde::{Deserialize, Serialize};

/// Metadata for one recorded tool invocation. The decorated console output
/// lives next to it in `logs/<id>.log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub argv: Vec<String>,
    pub cwd: String,
    pub exit_code: i32,
    pub started_at: String,
    pub duration_ms: u64,
    pub annotated: bool,
    #[serde(default)]
    pub charset: Charset,
    /// Overlay notes injected into the log.
    #[serde(default)]
    pub notes: usize,
}

pub fn new_run_id() -> String {
    format!("run_{}", ulid::Ulid::new().to_string().to_lowercase())
}

pub fn now_rfc3339() -> anyhow::Result<String> {
    let now = time::OffsetDateTime::now_utc();
    Ok(now.format(&time::format_description::well_known::Rfc3339)?)
}

impl RunRecord {
    pub fn save(&self, paths: &BuildnotePaths) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(&paths.run_path(&self.id), json.as_bytes())
    }

    pub fn load(paths: &BuildnotePaths, id: &str) -> anyhow::Result<Self> {
        let path = paths.run_path(id);
        if !path.exists() {
            anyhow::bail!("run not found: {id}");
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("invalid run record {}: {e}", path.display()))
    }
}

/// All run records, oldest first. Run ids are ULIDs, so name order is time order.
pub fn list_runs(paths: &BuildnotePaths) -> anyhow::Result<Vec<RunRecord>> {
    if !paths.runs_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut ids: Vec<String> = std::fs::read_dir(&paths.runs_dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            name.strip_suffix(".json").map(str::to_string)
        })
        .collect();
    ids.sort();

    let mut runs = Vec::with_capacity(ids.len());
    for id in ids {
        match RunRecord::load(paths, &id) {
            Ok(run) => runs.push(run),
            Err(e) => tracing::warn!(run = %id, error = %e, "skipping unreadable run record"),
        }
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, exit_code: i32) -> RunRecord {
        RunRecord {
            id: id.to_string(),
            argv: vec!["make".into(), "all".into()],
            cwd: "/work".into(),
            exit_code,
            started_at: "2026-01-01T00:00:00Z".into(),
            duration_ms: 12,
            annotated: true,
            charset: Charset::Utf8,
            notes: 3,
        }
    }

    #[test]
    fn run_ids_are_prefixed_and_sortable() {
        let a = new_run_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = new_run_id();
        assert!(a.starts_with("run_"));
        assert_eq!(a.len(), 4 + 26);
        assert!(a < b);
    }

    #[test]
    fn now_is_rfc3339() {
        let ts = now_rfc3339().unwrap();
        assert!(time::OffsetDateTime::parse(&ts, &time::format_description::well_known::Rfc3339).is_ok());
    }

    #[test]
    fn save_load_and_list() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = BuildnotePaths::discover(tmp.path());
        paths.ensure_layout().unwrap();

        record("run_b", 1).save(&paths).unwrap();
        record("run_a", 0).save(&paths).unwrap();
        std::fs::write(paths.runs_dir.join("run_c.json"), "garbage").unwrap();

        assert_eq!(RunRecord::load(&paths, "run_b").unwrap(), record("run_b", 1));
        let ids: Vec<String> = list_runs(&paths).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["run_a", "run_b"]);
    }

    #[test]
    fn load_unknown_run_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = BuildnotePaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        assert!(RunRecord::load(&paths, "run_missing").is_err());
    }
}
