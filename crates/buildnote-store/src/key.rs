use crate::lock::WorkspaceLock;
use crate::paths::BuildnotePaths;
use crate::write_atomic;
use buildnote_core::NoteKey;

/// Read the workspace secret key. Fails if it has not been created yet.
pub fn load_key(paths: &BuildnotePaths) -> anyhow::Result<NoteKey> {
    if !paths.key_file.exists() {
        anyhow::bail!(
            "secret key missing at {}. Run `buildnote init` to create it.",
            paths.key_file.display()
        );
    }
    let content = std::fs::read_to_string(&paths.key_file)?;
    NoteKey::from_hex(&content)
        .map_err(|e| anyhow::anyhow!("invalid key in {}: {e}", paths.key_file.display()))
}

/// Read the secret key, generating and persisting a fresh one if absent.
///
/// Returns the key and whether it was created by this call.
pub fn load_or_create_key(paths: &BuildnotePaths) -> anyhow::Result<(NoteKey, bool)> {
    if paths.key_file.exists() {
        return Ok((load_key(paths)?, false));
    }

    let _lock = WorkspaceLock::acquire(paths)?;
    // Another process may have won the race before we took the lock.
    if paths.key_file.exists() {
        return Ok((load_key(paths)?, false));
    }

    let key = NoteKey::generate()?;
    write_atomic(&paths.key_file, format!("{}\n", key.to_hex()).as_bytes())?;
    restrict_permissions(&paths.key_file)?;
    tracing::debug!(key = %key.fingerprint(), "generated secret key");
    Ok((key, true))
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_load_returns_same_key() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = BuildnotePaths::discover(tmp.path());
        paths.ensure_layout().unwrap();

        let (created, fresh) = load_or_create_key(&paths).unwrap();
        assert!(fresh);
        let (again, fresh) = load_or_create_key(&paths).unwrap();
        assert!(!fresh);
        assert_eq!(created.fingerprint(), again.fingerprint());
        assert_eq!(load_key(&paths).unwrap().to_hex(), created.to_hex());
    }

    #[test]
    fn load_key_without_init_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = BuildnotePaths::discover(tmp.path());
        let err = load_key(&paths).unwrap_err();
        assert!(err.to_string().contains("buildnote init"));
    }

    #[test]
    fn corrupt_key_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = BuildnotePaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        std::fs::write(&paths.key_file, "not-hex").unwrap();
        assert!(load_key(&paths).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let paths = BuildnotePaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        load_or_create_key(&paths).unwrap();
        let mode = std::fs::metadata(&paths.key_file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
