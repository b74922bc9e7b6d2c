pub mod charset;
pub mod codec;
pub mod key;
pub mod note;
pub mod render;

pub use charset::{Charset, CharsetError};
pub use codec::{find_note, DecodeError, EncodedNote, NoteCodec, POSTAMBLE, PREAMBLE};
pub use key::{KeyError, NoteKey};
pub use note::NoteKind;
pub use render::{render_log, strip_notes, OutlineEntry, RenderFormat, RenderOptions, Rendered, Renderer};
