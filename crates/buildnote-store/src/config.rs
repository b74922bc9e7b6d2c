use crate::paths::BuildnotePaths;
use crate::write_atomic;
use buildnote_stream::AnnotateConfig;
use std::path::Path;

pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Read config from `.buildnote/config.json`. Returns empty map if file doesn't exist.
pub fn read_config(path: &Path) -> anyhow::Result<ConfigMap> {
    if !path.exists() {
        return Ok(ConfigMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    let val: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
    match val {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(ConfigMap::new()),
    }
}

/// Write config to `.buildnote/config.json`.
pub fn write_config(path: &Path, config: &ConfigMap) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    write_atomic(path, json.as_bytes())
}

/// Annotation settings for this workspace: the config file's `annotate` and
/// `charset` keys, then `BUILDNOTE_ANNOTATE` / `BUILDNOTE_CHARSET`.
pub fn load_annotate_config(paths: &BuildnotePaths) -> anyhow::Result<AnnotateConfig> {
    load_annotate_config_with(paths, |var| std::env::var(var).ok())
}

pub(crate) fn load_annotate_config_with(
    paths: &BuildnotePaths,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<AnnotateConfig> {
    let map = read_config(&paths.config_json)?;
    let config = AnnotateConfig::from_json(&serde_json::Value::Object(map));
    Ok(config.with_overrides(lookup)?)
}

/// Defaults written by `buildnote init` for keys not already present.
pub fn seed_defaults(config: &mut ConfigMap) {
    let defaults = serde_json::to_value(AnnotateConfig::default()).unwrap_or_default();
    if let serde_json::Value::Object(defaults) = defaults {
        for (k, v) in defaults {
            config.entry(k).or_insert(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildnote_core::Charset;

    fn workspace() -> (tempfile::TempDir, BuildnotePaths) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = BuildnotePaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        (tmp, paths)
    }

    #[test]
    fn missing_config_reads_as_empty() {
        let (_tmp, paths) = workspace();
        assert!(read_config(&paths.config_json).unwrap().is_empty());
    }

    #[test]
    fn write_then_read_preserves_unknown_keys() {
        let (_tmp, paths) = workspace();
        let mut map = ConfigMap::new();
        map.insert("annotate".into(), serde_json::json!(false));
        map.insert("team".into(), serde_json::json!("infra"));
        write_config(&paths.config_json, &map).unwrap();
        assert_eq!(read_config(&paths.config_json).unwrap(), map);
    }

    #[test]
    fn annotate_config_reads_file_then_overrides() {
        let (_tmp, paths) = workspace();
        let mut map = ConfigMap::new();
        map.insert("annotate".into(), serde_json::json!(false));
        map.insert("charset".into(), serde_json::json!("iso-8859-1"));
        write_config(&paths.config_json, &map).unwrap();

        let c = load_annotate_config_with(&paths, |_| None).unwrap();
        assert!(!c.enabled);
        assert_eq!(c.charset, Charset::Latin1);

        let c = load_annotate_config_with(&paths, |var| {
            (var == buildnote_stream::ENV_ANNOTATE).then(|| "true".to_string())
        })
        .unwrap();
        assert!(c.enabled);
    }

    #[test]
    fn bad_override_surfaces_as_error() {
        let (_tmp, paths) = workspace();
        let err = load_annotate_config_with(&paths, |var| {
            (var == buildnote_stream::ENV_CHARSET).then(|| "ebcdic".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("BUILDNOTE_CHARSET"));
    }

    #[test]
    fn seed_defaults_keeps_existing_values() {
        let mut map = ConfigMap::new();
        map.insert("annotate".into(), serde_json::json!(false));
        seed_defaults(&mut map);
        assert_eq!(map["annotate"], serde_json::json!(false));
        assert_eq!(map["charset"], serde_json::json!("utf-8"));
    }
}
