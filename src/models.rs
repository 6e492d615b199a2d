mod language;
mod metadata;
mod post;
mod tag_mapping;

pub use language::Language;
pub use metadata::{MAX_TAGS_PER_POST, METADATA_KEYS, Metadata, ValidationMode};
pub use post::{PREVIEW_CHARS, Post, preview};
pub use tag_mapping::TagMapping;
