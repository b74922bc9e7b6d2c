use buildnote_core::NoteCodec;
use buildnote_store::{load_annotate_config, load_key, open_workspace};
use buildnote_stream::{annotate, AnnotateConfig, ConsoleSink};
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;
use std::sync::Arc;

/// `buildnote annotate [--input F] [--output F]`
pub fn execute(repo_root: &Path, input: Option<&Path>, output: Option<&Path>) -> anyhow::Result<()> {
    let paths = open_workspace(repo_root)?;
    let codec = Arc::new(NoteCodec::new(load_key(&paths)?));
    let config = load_annotate_config(&paths)?;

    let reader: Box<dyn Read> = match input {
        Some(path) => Box::new(BufReader::new(std::fs::File::open(path).map_err(|e| {
            anyhow::anyhow!("cannot open {}: {e}", path.display())
        })?)),
        None => Box::new(std::io::stdin().lock()),
    };
    let sink: Box<dyn ConsoleSink> = match output {
        Some(path) => Box::new(BufWriter::new(std::fs::File::create(path).map_err(|e| {
            anyhow::anyhow!("cannot create {}: {e}", path.display())
        })?)),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    let (_, injected) = annotate_stream(reader, sink, codec, &config)?;
    tracing::debug!(injected, "annotated stream");
    Ok(())
}

/// Copy `reader` into `sink` through an annotating decorator and close it.
/// Returns the sink and the number of notes injected.
fn annotate_stream<S: ConsoleSink>(
    mut reader: impl Read,
    sink: S,
    codec: Arc<NoteCodec>,
    config: &AnnotateConfig,
) -> anyhow::Result<(S, usize)> {
    let mut writer = annotate(sink, codec, config);
    let copied = std::io::copy(&mut reader, &mut writer);
    let closed = writer.close();
    copied?;
    closed?;
    let (sink, annotator) = writer.into_parts();
    Ok((sink, annotator.injected()))
}
