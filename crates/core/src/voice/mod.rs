//! Voice parameter mapping: lexical analysis, voice settings, speech markup.

pub mod analysis;
pub mod mapper;
pub mod markup;

pub use analysis::{ContextualMood, TextAnalysis};
pub use mapper::{VoiceMapper, VoiceRequest};
pub use markup::{Markup, MarkupBuilder, MarkupDialect, Ssml};
