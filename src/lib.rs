pub mod config;
pub mod extractor;
pub mod gemini;
pub mod pipeline;
pub mod segmenter;
pub mod utils;
pub mod validator;

pub use crate::config::{ApiCredentials, AppConfig};
pub use crate::extractor::{ExtractionMethod, ExtractionResult, Extractor};
pub use crate::pipeline::{ExtractionPipeline, ProcessedDocument};
pub use crate::segmenter::{GeminiSegmenter, HeuristicSegmenter, Segmenter, Subtopic};
pub use crate::utils::{ExtractError, GeminiError, SegmentError};
