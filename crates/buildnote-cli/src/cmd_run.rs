use buildnote_core::{render_log, Charset, NoteCodec, RenderFormat, RenderOptions};
use buildnote_store::runs::now_rfc3339;
use buildnote_store::{
    list_runs, load_annotate_config, load_filter, load_key, new_run_id, open_workspace,
    save_filter, BuildnotePaths, RunRecord, WorkspaceLock,
};
use buildnote_stream::{AnnotateConfig, ConsoleFilter, ConsoleSink, FilterContext};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::process::Stdio;
use std::sync::mpsc;
use std::sync::Arc;

const CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

/// `buildnote run -- <cmd...>`. Returns the tool's exit code.
pub fn execute(
    repo_root: &Path,
    argv: &[String],
    no_annotate: bool,
    charset: Option<&str>,
) -> anyhow::Result<i32> {
    if argv.is_empty() {
        anyhow::bail!("usage: buildnote run -- <command> [args...]");
    }
    let paths = open_workspace(repo_root)?;

    let mut config = load_annotate_config(&paths)?;
    if no_annotate {
        config.enabled = false;
    }
    if let Some(name) = charset {
        config.charset = name.parse::<Charset>()?;
    }

    let record = record(&paths, repo_root, argv, &config, true)?;
    // stderr, so piping `buildnote run` passes the tool's stdout through untouched.
    eprintln!(
        "Recorded run {} exit={} notes={}",
        record.id, record.exit_code, record.notes
    );
    Ok(record.exit_code)
}

/// Run `argv`, decorating its combined output into a new log under `paths`.
fn record(
    paths: &BuildnotePaths,
    cwd: &Path,
    argv: &[String],
    config: &AnnotateConfig,
    echo: bool,
) -> anyhow::Result<RunRecord> {
    let codec = Arc::new(NoteCodec::new(load_key(paths)?));
    let mut filter = {
        let _lock = WorkspaceLock::acquire(paths)?;
        load_filter(paths, config, &codec)?
    };

    let started_at = now_rfc3339()?;
    let start = std::time::Instant::now();
    let mut child = std::process::Command::new(&argv[0])
        .args(&argv[1..])
        .current_dir(cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| anyhow::anyhow!("failed to execute '{}': {e}", argv[0]))?;

    let id = new_run_id();
    let log_path = paths.log_path(&id);
    let log = match std::fs::File::create(&log_path) {
        Ok(file) => file,
        Err(e) => {
            let _ = child.kill();
            let _ = child.wait();
            anyhow::bail!("cannot create log {}: {e}", log_path.display());
        }
    };
    let ctx = FilterContext::new(codec.clone());
    let mut sink = filter.decorate(Box::new(BufWriter::new(log)), &ctx);

    let (tx, rx) = mpsc::channel::<(Stream, Vec<u8>)>();
    let mut readers = Vec::new();
    if let Some(out) = child.stdout.take() {
        let tx = tx.clone();
        readers.push(std::thread::spawn(move || pump(out, Stream::Stdout, tx)));
    }
    if let Some(err) = child.stderr.take() {
        let tx = tx.clone();
        readers.push(std::thread::spawn(move || pump(err, Stream::Stderr, tx)));
    }
    drop(tx);

    // This thread is the decorator's only writer. A failing log keeps the
    // terminal echo going so the child is never blocked on a full pipe.
    let mut log_err: Option<std::io::Error> = None;
    for (stream, chunk) in rx {
        if echo {
            echo_chunk(stream, &chunk);
        }
        if log_err.is_none() {
            if let Err(e) = sink.write_all(&chunk) {
                log_err = Some(e);
            }
        }
    }
    for reader in readers {
        if reader.join().is_err() {
            tracing::warn!("output reader thread panicked");
        }
    }

    let status = child.wait()?;
    let duration_ms = start.elapsed().as_millis() as u64;
    let exit_code = status.code().unwrap_or(-1);

    let closed = sink.close();
    if let Some(e) = log_err {
        anyhow::bail!("writing {} failed: {e}", log_path.display());
    }
    closed.map_err(|e| anyhow::anyhow!("closing {} failed: {e}", log_path.display()))?;

    // The tool has already run; record it even if the state save fails.
    if let Err(e) = WorkspaceLock::acquire(paths).and_then(|_lock| save_filter(paths, &filter)) {
        tracing::warn!(error = %e, "saving filter state failed");
    }

    let bytes = std::fs::read(&log_path)?;
    let notes = render_log(
        &codec,
        RenderOptions {
            format: RenderFormat::Plain,
            charset: config.charset,
            ..RenderOptions::default()
        },
        &bytes,
    )
    .notes;
    tracing::debug!(run = %id, notes, exit_code, "run recorded");

    let record = RunRecord {
        id,
        argv: argv.to_vec(),
        cwd: cwd.to_string_lossy().to_string(),
        exit_code,
        started_at,
        duration_ms,
        annotated: config.enabled,
        charset: config.charset,
        notes,
    };
    record.save(paths)?;
    Ok(record)
}

/// Forward everything read from `reader` to the writer thread.
fn pump(mut reader: impl Read, stream: Stream, tx: mpsc::Sender<(Stream, Vec<u8>)>) {
    let mut buf = vec![0u8; CHUNK];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send((stream, buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(?stream, error = %e, "reading tool output failed");
                break;
            }
        }
    }
}

fn echo_chunk(stream: Stream, chunk: &[u8]) {
    // The terminal going away must not abort the recording.
    let _ = match stream {
        Stream::Stdout => {
            let mut out = std::io::stdout().lock();
            out.write_all(chunk).and_then(|_| out.flush())
        }
        Stream::Stderr => std::io::stderr().lock().write_all(chunk),
    };
}

/// `buildnote runs`
pub fn list(repo_root: &Path, json: bool) -> anyhow::Result<()> {
    let paths = open_workspace(repo_root)?;
    let runs = list_runs(&paths)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }
    if runs.is_empty() {
        println!("(no runs recorded)");
        return Ok(());
    }
    for run in &runs {
        println!(
            "{}  {}  exit={}  notes={}  {}",
            run.id,
            run.started_at,
            run.exit_code,
            run.notes,
            run.argv.join(" ")
        );
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use buildnote_core::strip_notes;
    use buildnote_store::load_or_create_key;

    fn workspace() -> (tempfile::TempDir, BuildnotePaths) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = BuildnotePaths::discover(tmp.path());
        paths.ensure_layout().unwrap();
        load_or_create_key(&paths).unwrap();
        (tmp, paths)
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".into(), "-c".into(), script.into()]
    }

    #[test]
    fn run_records_annotated_log() {
        let (tmp, paths) = workspace();
        let record = record(
            &paths,
            tmp.path(),
            &sh("printf '\\ncompile:\\nok\\nBUILD SUCCESSFUL\\n'"),
            &AnnotateConfig::default(),
            false,
        )
        .unwrap();

        assert_eq!(record.exit_code, 0);
        assert_eq!(record.notes, 2);
        assert!(record.annotated);

        let codec = NoteCodec::new(load_key(&paths).unwrap());
        let bytes = std::fs::read(paths.log_path(&record.id)).unwrap();
        assert_eq!(
            strip_notes(&codec, &bytes),
            b"\ncompile:\nok\nBUILD SUCCESSFUL\n".to_vec()
        );
        assert_eq!(RunRecord::load(&paths, &record.id).unwrap(), record);
        assert!(paths.filter_json.exists());
    }

    #[test]
    fn disabled_annotation_records_raw_output() {
        let (tmp, paths) = workspace();
        let config = AnnotateConfig {
            enabled: false,
            ..AnnotateConfig::default()
        };
        let record = record(
            &paths,
            tmp.path(),
            &sh("printf '\\ncompile:\\nBUILD FAILED\\n'; exit 3"),
            &config,
            false,
        )
        .unwrap();

        assert_eq!(record.exit_code, 3);
        assert_eq!(record.notes, 0);
        let bytes = std::fs::read(paths.log_path(&record.id)).unwrap();
        assert_eq!(bytes, b"\ncompile:\nBUILD FAILED\n");
    }

    #[test]
    fn stderr_is_recorded_too() {
        let (tmp, paths) = workspace();
        let record = record(
            &paths,
            tmp.path(),
            &sh("printf 'warning: x\\n' >&2"),
            &AnnotateConfig::default(),
            false,
        )
        .unwrap();
        let bytes = std::fs::read(paths.log_path(&record.id)).unwrap();
        assert_eq!(bytes, b"warning: x\n");
    }

    #[test]
    fn unknown_command_is_an_error() {
        let (tmp, paths) = workspace();
        let argv = vec!["definitely-not-a-real-command-xyz".to_string()];
        let err = record(&paths, tmp.path(), &argv, &AnnotateConfig::default(), false)
            .unwrap_err();
        assert!(err.to_string().contains("failed to execute"));
    }

    #[test]
    fn run_waits_for_lock_held_by_another_writer() {
        let (tmp, paths) = workspace();
        let held = WorkspaceLock::acquire(&paths).unwrap();
        let releaser = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(200));
            drop(held);
        });

        let record = record(
            &paths,
            tmp.path(),
            &sh("sleep 0.1; echo BUILD SUCCESSFUL"),
            &AnnotateConfig::default(),
            false,
        )
        .unwrap();
        releaser.join().unwrap();

        assert_eq!(record.notes, 1);
        assert_eq!(list_runs(&paths).unwrap().len(), 1);
        assert!(paths.filter_json.is_file());
    }

    #[test]
    fn run_is_recorded_when_state_save_fails() {
        let (tmp, paths) = workspace();
        // A directory where the state file belongs makes the save fail.
        std::fs::create_dir_all(&paths.filter_json).unwrap();

        let record = record(
            &paths,
            tmp.path(),
            &sh("echo BUILD FAILED; exit 2"),
            &AnnotateConfig::default(),
            false,
        )
        .unwrap();

        assert_eq!(record.exit_code, 2);
        assert_eq!(RunRecord::load(&paths, &record.id).unwrap(), record);
        assert!(paths.filter_json.is_dir());
    }

    #[test]
    fn execute_requires_workspace() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(execute(tmp.path(), &sh("true"), false, None).is_err());
    }
}
