//! Mixing engine: overlap-add of scheduled segments with fades and a
//! global peak normalization pass.

pub mod engine;
pub mod envelope;

pub use engine::{MixInput, MixingEngine, RenderedMix};
pub use envelope::{Block, Blocks, GainEnvelope};
