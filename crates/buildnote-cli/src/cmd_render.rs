use buildnote_core::{render_log, Charset, NoteCodec, RenderFormat, RenderOptions, Rendered};
use buildnote_store::{load_annotate_config, load_key, open_workspace, BuildnotePaths, RunRecord};
use std::io::Write;
use std::path::{Path, PathBuf};

/// `buildnote render <log-or-run-id> [--format F] [--outline] [--no-section-markup]`
pub fn execute(
    repo_root: &Path,
    target: &str,
    format: &str,
    outline: bool,
    section_markup: bool,
) -> anyhow::Result<()> {
    let format: RenderFormat = format.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let paths = open_workspace(repo_root)?;
    let codec = NoteCodec::new(load_key(&paths)?);

    let (log_path, charset) = resolve(&paths, target)?;
    let bytes = std::fs::read(&log_path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", log_path.display()))?;
    let charset = match charset {
        Some(c) => c,
        None => load_annotate_config(&paths)?.charset,
    };

    let rendered = render_log(&codec, options(format, charset, outline, section_markup), &bytes);
    if rendered.rejected > 0 {
        tracing::warn!(
            rejected = rendered.rejected,
            "log contains notes that failed verification"
        );
    }

    let mut out = std::io::stdout().lock();
    out.write_all(compose(&rendered, format, outline).as_bytes())?;
    out.flush()?;
    Ok(())
}

/// Find the log for `target`: a run id first, then a file path.
/// Returns the run's charset when the target is a recorded run.
fn resolve(paths: &BuildnotePaths, target: &str) -> anyhow::Result<(PathBuf, Option<Charset>)> {
    let by_id = paths.log_path(target);
    if by_id.is_file() {
        let charset = RunRecord::load(paths, target).ok().map(|r| r.charset);
        return Ok((by_id, charset));
    }
    let as_path = PathBuf::from(target);
    if as_path.is_file() {
        return Ok((as_path, None));
    }
    anyhow::bail!("no run or log file named {target}")
}

fn options(
    format: RenderFormat,
    charset: Charset,
    outline: bool,
    section_markup: bool,
) -> RenderOptions {
    RenderOptions {
        format,
        charset,
        section_markup,
        outline_anchors: outline && section_markup && format == RenderFormat::Html,
    }
}

fn compose(rendered: &Rendered, format: RenderFormat, outline: bool) -> String {
    match format {
        RenderFormat::Html => {
            let mut page = String::new();
            if outline {
                page.push_str(&rendered.outline_html());
            }
            page.push_str("<pre class=\"console-output\">");
            page.push_str(&rendered.body);
            page.push_str("</pre>\n");
            page
        }
        RenderFormat::Ansi | RenderFormat::Plain => {
            let mut page = rendered.body.clone();
            if outline && !rendered.outline.is_empty() {
                if !page.is_empty() && !page.ends_with('\n') {
                    page.push('\n');
                }
                page.push_str("\nOutline:\n");
                page.push_str(&rendered.outline_text());
            }
            page
        }
    }
}
