mod annotator;
mod config;
mod filter;
mod line_buffer;
mod sink;

#[cfg(test)]
mod test_support;

pub use annotator::{
    is_outcome, is_section_header, AnnotatorState, ConsoleAnnotator, NoteCache, Rule,
    BUILD_FAILED, BUILD_SUCCESSFUL, RULES,
};
pub use config::{AnnotateConfig, ConfigError, ENV_ANNOTATE, ENV_CHARSET};
pub use filter::{AnnotateFilter, ConsoleFilter, FilterChain, FilterContext};
pub use line_buffer::{LineHook, LineTransformWriter};
pub use sink::ConsoleSink;

use buildnote_core::NoteCodec;
use std::sync::Arc;

/// Wrap `sink` in an annotating decorator configured by `config`.
pub fn annotate<S: ConsoleSink>(
    sink: S,
    codec: Arc<NoteCodec>,
    config: &AnnotateConfig,
) -> LineTransformWriter<S, ConsoleAnnotator> {
    let annotator = ConsoleAnnotator::new(codec, config);
    LineTransformWriter::new(sink, annotator, config.charset)
}
