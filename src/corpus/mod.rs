pub mod categorize;
pub mod chunk;
pub mod dedup;
pub mod focus;
pub mod pipeline;
pub mod redact;
pub mod segment;
pub mod types;

pub use categorize::{CategoryMatch, CategoryRule, Categorizer};
pub use chunk::{chunk_sequence, part_file_name, split_by_size};
pub use dedup::{ContentHasher, Deduplicator, HashAlgorithm, normalize};
pub use focus::FocusFilter;
pub use pipeline::{Extraction, ExtractionCounters, ExtractionPipeline, Optimization};
pub use redact::{ByteRedaction, REDACTED, Redaction, SecretRedactor};
pub use segment::{Segmentation, Segmenter};
pub use types::{Dialogue, SourceText, Turn};
