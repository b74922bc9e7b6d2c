use crate::annotator::{ConsoleAnnotator, NoteCache};
use crate::config::AnnotateConfig;
use crate::line_buffer::LineTransformWriter;
use crate::sink::ConsoleSink;
use buildnote_core::{Charset, NoteCodec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What a filter gets from the producing side when it decorates a sink.
#[derive(Debug, Clone)]
pub struct FilterContext {
    pub codec: Arc<NoteCodec>,
}

impl FilterContext {
    pub fn new(codec: Arc<NoteCodec>) -> Self {
        Self { codec }
    }
}

/// Something that wraps a console sink in a decorator.
///
/// The returned sink receives the build output first and forwards it,
/// possibly with additions, to `sink`.
pub trait ConsoleFilter: Send {
    fn decorate(&mut self, sink: Box<dyn ConsoleSink>, ctx: &FilterContext) -> Box<dyn ConsoleSink>;
}

/// Filter that installs a [`ConsoleAnnotator`] on every sink it decorates.
///
/// The filter outlives individual sinks and may be persisted between
/// process runs. Its note cache is shared by every decorator it creates and
/// is rebuilt on the next `decorate` when a restored copy lacks it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotateFilter {
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    charset: Charset,
    #[serde(default, skip_serializing_if = "NoteCache::is_empty")]
    notes: NoteCache,
}

fn default_enabled() -> bool {
    true
}

impl AnnotateFilter {
    pub fn new(config: &AnnotateConfig, codec: &NoteCodec) -> Self {
        Self {
            enabled: config.enabled,
            charset: config.charset,
            notes: NoteCache::filled(codec),
        }
    }

    pub fn config(&self) -> AnnotateConfig {
        AnnotateConfig {
            enabled: self.enabled,
            charset: self.charset,
        }
    }

    /// Replace the settings, keeping the note cache.
    pub fn reconfigure(&mut self, config: &AnnotateConfig) {
        self.enabled = config.enabled;
        self.charset = config.charset;
    }

    pub fn notes(&self) -> &NoteCache {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut NoteCache {
        &mut self.notes
    }
}

impl ConsoleFilter for AnnotateFilter {
    fn decorate(&mut self, sink: Box<dyn ConsoleSink>, ctx: &FilterContext) -> Box<dyn ConsoleSink> {
        self.notes.ensure(&ctx.codec);
        let config = self.config();
        let annotator = ConsoleAnnotator::with_notes(ctx.codec.clone(), &config, self.notes.clone());
        Box::new(LineTransformWriter::new(sink, annotator, config.charset))
    }
}

/// Ordered composition of filters.
///
/// The first filter sees the build output first; each filter's output is fed
/// to the next, and the last one writes into the real sink. A chain is a
/// filter itself, so nesting chains flattens to the same order.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn ConsoleFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl ConsoleFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn push(&mut self, filter: Box<dyn ConsoleFilter>) {
        self.filters.push(filter);
    }

    /// `first` runs before `then`.
    pub fn merge(first: Box<dyn ConsoleFilter>, then: Box<dyn ConsoleFilter>) -> Self {
        Self {
            filters: vec![first, then],
        }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl ConsoleFilter for FilterChain {
    fn decorate(&mut self, sink: Box<dyn ConsoleSink>, ctx: &FilterContext) -> Box<dyn ConsoleSink> {
        self.filters
            .iter_mut()
            .rev()
            .fold(sink, |inner, filter| filter.decorate(inner, ctx))
    }
}
