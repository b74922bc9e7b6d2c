use buildnote_store::config::seed_defaults;
use buildnote_store::{load_or_create_key, read_config, write_config, BuildnotePaths};
use std::path::Path;

pub fn execute(repo_root: &Path) -> anyhow::Result<()> {
    let paths = BuildnotePaths::discover(repo_root);
    let existed = paths.is_initialized();

    // Layout, key and config are each created only when missing, so a
    // partially created workspace is repaired here.
    paths.ensure_layout()?;
    let (key, created) = load_or_create_key(&paths)?;

    let mut config = read_config(&paths.config_json)?;
    let before = config.len();
    seed_defaults(&mut config);
    if config.len() != before || !paths.config_json.exists() {
        write_config(&paths.config_json, &config)?;
    }

    if existed && !created {
        println!("Already initialized at {}", paths.buildnote_dir.display());
        return Ok(());
    }

    println!("Initialized {}", paths.buildnote_dir.display());
    println!("  key {}", key.fingerprint());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use buildnote_store::load_key;

    #[test]
    fn init_creates_layout_key_and_config() {
        let tmp = tempfile::tempdir().unwrap();
        execute(tmp.path()).unwrap();

        let paths = BuildnotePaths::discover(tmp.path());
        assert!(paths.logs_dir.is_dir());
        assert!(paths.runs_dir.is_dir());
        assert!(paths.state_dir.is_dir());
        assert!(load_key(&paths).is_ok());
        let config = read_config(&paths.config_json).unwrap();
        assert_eq!(config["annotate"], serde_json::json!(true));
        assert_eq!(config["charset"], serde_json::json!("utf-8"));
    }

    #[test]
    fn init_twice_keeps_key_and_user_config() {
        let tmp = tempfile::tempdir().unwrap();
        execute(tmp.path()).unwrap();
        let paths = BuildnotePaths::discover(tmp.path());
        let first = load_key(&paths).unwrap().to_hex();

        let mut config = read_config(&paths.config_json).unwrap();
        config.insert("annotate".into(), serde_json::json!(false));
        write_config(&paths.config_json, &config).unwrap();

        execute(tmp.path()).unwrap();
        assert_eq!(load_key(&paths).unwrap().to_hex(), first);
        assert_eq!(
            read_config(&paths.config_json).unwrap()["annotate"],
            serde_json::json!(false)
        );
    }
}
