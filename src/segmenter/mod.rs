pub mod heuristic;
pub mod llm;

pub use heuristic::HeuristicSegmenter;
pub use llm::GeminiSegmenter;

use serde::{Deserialize, Serialize};

use crate::utils::SegmentError;

/// 合成根节点的标题
pub const ROOT_TITLE: &str = "Extracted Content";

/// 文档中的一个学习单元
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtopic {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub subtopics: Vec<Subtopic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
}

impl Subtopic {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// 追加一行正文：第一行作为摘要，其余作为要点
    pub(crate) fn push_line(&mut self, line: &str) {
        if self.summary.is_empty() {
            self.summary = line.to_string();
        } else {
            self.key_points.push(line.to_string());
        }
    }
}

/// 把清洗后的文本切分为主题树
///
/// 启发式实现不会失败；LLM 实现可能失败，由调用方决定是否回退。
#[allow(async_fn_in_trait)]
pub trait Segmenter {
    async fn segment(&self, text: &str, hint: Option<&str>) -> Result<Vec<Subtopic>, SegmentError>;
}
