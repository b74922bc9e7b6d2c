use serde::{Deserialize, Serialize};

/// The kind of overlay instruction carried by a note.
///
/// A note applies to the text that follows it up to the end of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// A bare `name:` line that opens a section of build output.
    SectionHeader,
    /// The line announcing overall success or failure.
    Outcome,
}

impl NoteKind {
    /// Every kind, in rule order.
    pub const ALL: [NoteKind; 2] = [NoteKind::SectionHeader, NoteKind::Outcome];

    /// Wire tag. Values are stable; new kinds must use new values.
    pub fn tag(self) -> u8 {
        match self {
            NoteKind::SectionHeader => 1,
            NoteKind::Outcome => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(NoteKind::SectionHeader),
            2 => Some(NoteKind::Outcome),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteKind::SectionHeader => "section_header",
            NoteKind::Outcome => "outcome",
        }
    }
}

impl std::fmt::Display for NoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_distinct_and_reversible() {
        for kind in NoteKind::ALL {
            assert_eq!(NoteKind::from_tag(kind.tag()), Some(kind));
        }
        assert_ne!(NoteKind::SectionHeader.tag(), NoteKind::Outcome.tag());
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(NoteKind::from_tag(0), None);
        assert_eq!(NoteKind::from_tag(0xff), None);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&NoteKind::SectionHeader).unwrap();
        assert_eq!(json, "\"section_header\"");
        let back: NoteKind = serde_json::from_str("\"outcome\"").unwrap();
        assert_eq!(back, NoteKind::Outcome);
    }
}
