//! 文本清洗与可读性校验
//!
//! 提取出来的原始文本先经过 [`clean`]（或更严格的 [`clean_strict`]），
//! 再由 [`is_meaningful`] 判断是否是真实的文档内容。

use serde::Serialize;

/// 清洗后文本的最少字符数
pub const MIN_MEANINGFUL_CHARS: usize = 20;

/// 字母+空白字符占比下限
pub const MIN_ALPHA_RATIO: f64 = 0.3;

/// 上游解析失败时常见的占位文本，出现即视为不可读
pub const FAILURE_MARKERS: &[&str] = &[
    "text extraction failed",
    "word document parsing not implemented",
    "image ocr not implemented",
    "unsupported file type",
    "no text content found",
    "failed to extract text",
];

/// 除字母、数字、空白外允许保留的标点
const READABLE_PUNCTUATION: &str = ".,;:!?'\"()[]{}-_/\\@#$%&*+=<>|~`^";

/// 清洗模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CleanMode {
    #[default]
    Standard,
    Strict,
}

impl CleanMode {
    pub fn apply(&self, raw: &str) -> String {
        match self {
            CleanMode::Standard => clean(raw),
            CleanMode::Strict => clean_strict(raw),
        }
    }
}

/// 规范化空白：每行内空白压缩为单个空格，去掉首尾空白和空行。
///
/// 除换行外的控制字符按空白处理，结果里行与行之间只有一个 `\n`。
pub fn clean(raw: &str) -> String {
    raw.lines()
        .map(collapse_line)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// 在 [`clean`] 的基础上，只保留字母、数字和常见标点，其余字符替换为空格
pub fn clean_strict(raw: &str) -> String {
    let restricted: String = raw
        .chars()
        .map(|c| if c == '\n' || is_readable(c) { c } else { ' ' })
        .collect();
    clean(&restricted)
}

fn collapse_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for word in line
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|w| !w.is_empty())
    {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

fn is_readable(c: char) -> bool {
    c.is_alphanumeric() || c == ' ' || READABLE_PUNCTUATION.contains(c)
}

/// 判断文本是否是可用的文档内容。
///
/// 判断基于清洗后的文本，因此 `is_meaningful(x) == is_meaningful(&clean(x))`。
pub fn is_meaningful(text: &str) -> bool {
    assess(text).meaningful
}

/// 校验明细，用于解释某个文档为何被拒绝
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextAssessment {
    pub char_count: usize,
    pub alpha_ratio: f64,
    pub failure_marker: Option<&'static str>,
    pub meaningful: bool,
}

pub fn assess(text: &str) -> TextAssessment {
    let cleaned = clean(text);
    let char_count = cleaned.chars().count();

    let alpha_ratio = if char_count == 0 {
        0.0
    } else {
        let alpha = cleaned
            .chars()
            .filter(|c| c.is_alphabetic() || c.is_whitespace())
            .count();
        alpha as f64 / char_count as f64
    };

    let lowered = cleaned.to_lowercase();
    let failure_marker = FAILURE_MARKERS
        .iter()
        .copied()
        .find(|marker| lowered.contains(marker));

    let meaningful = char_count >= MIN_MEANINGFUL_CHARS
        && alpha_ratio >= MIN_ALPHA_RATIO
        && failure_marker.is_none();

    TextAssessment {
        char_count,
        alpha_ratio,
        failure_marker,
        meaningful,
    }
}
