use crate::config::AnnotateConfig;
use crate::line_buffer::LineHook;
use buildnote_core::{Charset, EncodedNote, NoteCodec, NoteKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const BUILD_SUCCESSFUL: &str = "BUILD SUCCESSFUL";
pub const BUILD_FAILED: &str = "BUILD FAILED";

/// A detection rule: a pure predicate over the line and whether the previous
/// line was blank.
pub struct Rule {
    pub kind: NoteKind,
    pub matches: fn(line: &str, saw_blank_line: bool) -> bool,
}

/// Rules in emission order. When several match, their notes are written
/// back-to-back in this order.
pub const RULES: &[Rule] = &[
    Rule {
        kind: NoteKind::SectionHeader,
        matches: is_section_header,
    },
    Rule {
        kind: NoteKind::Outcome,
        matches: outcome_rule,
    },
];

fn outcome_rule(line: &str, _saw_blank_line: bool) -> bool {
    is_outcome(line)
}

/// `name:` right after a blank line. Lines with a space are prose, not headers.
pub fn is_section_header(line: &str, saw_blank_line: bool) -> bool {
    saw_blank_line && line.ends_with(':') && !line.contains(' ')
}

/// Exact match only; surrounding whitespace disqualifies.
pub fn is_outcome(line: &str) -> bool {
    line == BUILD_SUCCESSFUL || line == BUILD_FAILED
}

/// Encoded notes keyed by kind, tagged with the fingerprint of the key that
/// signed them.
///
/// A cache restored from disk may be empty or signed with a different key;
/// [`NoteCache::ensure`] drops stale entries and fills in missing ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteCache {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key_id: Option<String>,
    #[serde(default)]
    notes: BTreeMap<NoteKind, EncodedNote>,
}

impl NoteCache {
    /// Cache with every kind encoded.
    pub fn filled(codec: &NoteCodec) -> Self {
        let mut cache = Self::default();
        cache.ensure(codec);
        cache
    }

    /// Make the cache valid for `codec`. Idempotent.
    pub fn ensure(&mut self, codec: &NoteCodec) {
        let key_id = codec.key_id();
        if self.key_id.as_deref() != Some(key_id.as_str()) {
            if !self.notes.is_empty() {
                tracing::debug!(
                    cached = ?self.key_id,
                    current = %key_id,
                    "note cache signed with another key, discarding"
                );
            }
            self.notes.clear();
            self.key_id = Some(key_id);
        }
        for kind in NoteKind::ALL {
            if !self.notes.contains_key(&kind) {
                tracing::debug!(kind = %kind, "encoding overlay note");
                self.notes.insert(kind, codec.encode(kind));
            }
        }
    }

    pub fn get(&self, kind: NoteKind) -> Option<&EncodedNote> {
        self.notes.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Drop one entry, as a state file written by an older version would lack it.
    pub fn forget(&mut self, kind: NoteKind) {
        self.notes.remove(&kind);
    }
}

/// Mutable per-stream state of a [`ConsoleAnnotator`].
///
/// Fields absent from a persisted snapshot default to "nothing known":
/// `saw_blank_line = false`, empty note cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorState {
    #[serde(default)]
    pub saw_blank_line: bool,
    #[serde(default)]
    pub charset: Charset,
    #[serde(default, skip_serializing_if = "NoteCache::is_empty")]
    pub notes: NoteCache,
}

/// Line hook that prepends overlay notes to section headers and outcome lines.
pub struct ConsoleAnnotator {
    state: AnnotatorState,
    enabled: bool,
    codec: Arc<NoteCodec>,
    cache_checked: bool,
    injected: usize,
}

impl ConsoleAnnotator {
    /// Fresh annotator; notes are encoded now and reused for every line.
    pub fn new(codec: Arc<NoteCodec>, config: &AnnotateConfig) -> Self {
        let notes = NoteCache::filled(&codec);
        Self::with_notes(codec, config, notes)
    }

    /// Fresh annotator reusing notes cached by its owner.
    pub fn with_notes(codec: Arc<NoteCodec>, config: &AnnotateConfig, notes: NoteCache) -> Self {
        let state = AnnotatorState {
            saw_blank_line: false,
            charset: config.charset,
            notes,
        };
        Self::resume(codec, config.enabled, state)
    }

    /// Continue from a persisted state. The note cache is checked and
    /// regenerated on first use.
    pub fn resume(codec: Arc<NoteCodec>, enabled: bool, state: AnnotatorState) -> Self {
        Self {
            state,
            enabled,
            codec,
            cache_checked: false,
            injected: 0,
        }
    }

    pub fn state(&self) -> &AnnotatorState {
        &self.state
    }

    pub fn snapshot(&self) -> AnnotatorState {
        self.state.clone()
    }

    pub fn charset(&self) -> Charset {
        self.state.charset
    }

    /// Number of notes written so far.
    pub fn injected(&self) -> usize {
        self.injected
    }

    fn note(&mut self, kind: NoteKind) -> &[u8] {
        if !self.cache_checked {
            self.state.notes.ensure(&self.codec);
            self.cache_checked = true;
        }
        match self.state.notes.get(kind) {
            Some(note) => note.as_bytes(),
            None => &[],
        }
    }
}

impl LineHook for ConsoleAnnotator {
    fn eol(&mut self, line: &str, _raw: &[u8], prefix: &mut Vec<u8>) {
        debug_assert!(
            !line.ends_with(['\n', '\r']),
            "line handed to the annotator still carries its terminator"
        );
        let saw_blank_line = self.state.saw_blank_line;
        if self.enabled {
            for rule in RULES {
                if (rule.matches)(line, saw_blank_line) {
                    let note = self.note(rule.kind);
                    prefix.extend_from_slice(note);
                    self.injected += 1;
                    tracing::trace!(kind = %rule.kind, line, "annotated line");
                }
            }
        }
        self.state.saw_blank_line = line.is_empty();
    }
}
