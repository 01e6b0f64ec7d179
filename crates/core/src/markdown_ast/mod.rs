pub mod spans;

// Re-export primary API
pub use spans::{Span, SpanKind, partition, rewrite_text_spans};
