pub mod logger;

use thiserror::Error;

use crate::extractor::ExtractionMethod;

/// 文本提取错误
///
/// 所有PDF库的错误（包括panic）都在提取器边界统一转换为此类型。
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("No readable text could be extracted from PDF")]
    NoReadablePdfText,

    #[error("Text file contains no readable content")]
    NoReadableText,

    #[error("{technique} failed: {message}")]
    Technique {
        technique: ExtractionMethod,
        message: String,
    },

    #[error("{technique} panicked on malformed input")]
    Panicked { technique: ExtractionMethod },
}

impl ExtractError {
    pub fn technique(technique: ExtractionMethod, message: impl ToString) -> Self {
        ExtractError::Technique {
            technique,
            message: message.to_string(),
        }
    }

    /// 稳定的错误类别标签
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::UnsupportedType(_) => "unsupported",
            ExtractError::NoReadablePdfText | ExtractError::NoReadableText => "exhausted",
            ExtractError::Technique { .. } => "technique",
            ExtractError::Panicked { .. } => "panic",
        }
    }
}

/// Gemini API 错误
#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Gemini API key 未配置")]
    NotConfigured,

    #[error("网络请求错误: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API 返回错误 {status}: {body}")]
    Status { status: u16, body: String },

    #[error("请求超时 ({0}s)")]
    Timeout(u64),

    #[error("API 响应为空")]
    EmptyResponse,
}

/// 分段错误
#[derive(Error, Debug)]
pub enum SegmentError {
    #[error("LLM 调用失败: {0}")]
    Gemini(#[from] GeminiError),

    #[error("LLM 响应不是合法JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("LLM 未返回任何主题")]
    NoTopics,
}
