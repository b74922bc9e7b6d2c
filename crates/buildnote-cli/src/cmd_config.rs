use buildnote_store::{open_workspace, read_config, write_config};
use clap::Subcommand;
use std::path::Path;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Set a config value
    Set {
        /// Config key (e.g. annotate, charset)
        key: String,
        /// Config value (true/false/number/string)
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Set { key, value } => set(repo_root, &key, &value),
        ConfigCmd::Get { key } => get(repo_root, &key),
        ConfigCmd::List => list(repo_root),
    }
}

// ── Command Implementations ──

/// Parse a string value into an appropriate JSON value (bool/number/string).
fn parse_value(s: &str) -> serde_json::Value {
    match s {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        _ => {
            if let Ok(n) = s.parse::<i64>() {
                serde_json::Value::Number(n.into())
            } else if let Ok(f) = s.parse::<f64>() {
                serde_json::json!(f)
            } else {
                serde_json::Value::String(s.to_string())
            }
        }
    }
}

/// Reject values for the keys the annotator reads, so a typo does not
/// silently fall back to the default.
fn validate(key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    match key {
        "annotate" if !value.is_boolean() => {
            anyhow::bail!("annotate must be true or false")
        }
        "charset" => {
            let name = value.as_str().unwrap_or_default();
            name.parse::<buildnote_core::Charset>()?;
            Ok(())
        }
        _ => Ok(()),
    }
}

/// `buildnote config set <key> <value>`
pub fn set(repo_root: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let paths = open_workspace(repo_root)?;
    let parsed = parse_value(value);
    validate(key, &parsed)?;
    let mut config = read_config(&paths.config_json)?;
    config.insert(key.to_string(), parsed);
    write_config(&paths.config_json, &config)?;
    println!("{key} = {value}");
    Ok(())
}

/// `buildnote config get <key>`
pub fn get(repo_root: &Path, key: &str) -> anyhow::Result<()> {
    let paths = open_workspace(repo_root)?;
    let config = read_config(&paths.config_json)?;
    match config.get(key) {
        Some(val) => println!("{val}"),
        None => println!("(not set)"),
    }
    Ok(())
}

/// `buildnote config list`
pub fn list(repo_root: &Path) -> anyhow::Result<()> {
    let paths = open_workspace(repo_root)?;
    let config = read_config(&paths.config_json)?;
    if config.is_empty() {
        println!("(no config set)");
    } else {
        for (k, v) in &config {
            println!("{k} = {v}");
        }
    }
    Ok(())
}
