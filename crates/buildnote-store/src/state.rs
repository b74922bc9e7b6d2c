use crate::paths::BuildnotePaths;
use crate::write_atomic;
use buildnote_core::NoteCodec;
use buildnote_stream::{AnnotateConfig, AnnotateFilter};

/// Restore the persisted annotation filter, or build a fresh one.
///
/// The stored settings are replaced with `config`; the cached notes are kept
/// and checked against `codec` on the next decorate. A state file that no
/// longer parses is discarded, since everything in it can be regenerated.
pub fn load_filter(
    paths: &BuildnotePaths,
    config: &AnnotateConfig,
    codec: &NoteCodec,
) -> anyhow::Result<AnnotateFilter> {
    if !paths.filter_json.is_file() {
        return Ok(AnnotateFilter::new(config, codec));
    }
    let content = std::fs::read_to_string(&paths.filter_json)?;
    match serde_json::from_str::<AnnotateFilter>(&content) {
        Ok(mut filter) => {
            filter.reconfigure(config);
            Ok(filter)
        }
        Err(e) => {
            tracing::warn!(
                path = %paths.filter_json.display(),
                error = %e,
                "discarding unreadable filter state"
            );
            Ok(AnnotateFilter::new(config, codec))
        }
    }
}

/// Persist the filter to `.buildnote/state/filter.json`.
pub fn save_filter(paths: &BuildnotePaths, filter: &AnnotateFilter) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(filter)?;
    write_atomic(&paths.filter_json, json.as_bytes())
}
