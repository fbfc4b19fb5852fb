use serde::Serialize;
use tracing::{info, warn};

use crate::extractor::{ExtractionResult, Extractor};
use crate::segmenter::{HeuristicSegmenter, Subtopic};
use crate::validator::{self, CleanMode};

/// 提取失败时展示给用户的提示
pub const RETRY_MESSAGE: &str =
    "We couldn't read any text from this file. Please try again with a different PDF or text file.";

/// 一个上传文档的处理结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDocument {
    pub file_name: String,
    pub extraction: ExtractionResult,
    pub topics: Vec<Subtopic>,
}

impl ProcessedDocument {
    pub fn is_placeholder(&self) -> bool {
        !self.extraction.success
    }

    /// 失败时返回非技术性的提示，成功时为 None
    pub fn user_message(&self) -> Option<&'static str> {
        self.is_placeholder().then_some(RETRY_MESSAGE)
    }
}

/// 提取 → 清洗 → 校验 → 启发式分段
pub struct ExtractionPipeline {
    extractor: Extractor,
    segmenter: HeuristicSegmenter,
}

impl ExtractionPipeline {
    pub fn new(clean_mode: CleanMode) -> Self {
        Self::with_extractor(Extractor::new().clean_mode(clean_mode))
    }

    pub fn with_extractor(extractor: Extractor) -> Self {
        Self {
            extractor,
            segmenter: HeuristicSegmenter::new(),
        }
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn segmenter(&self) -> &HeuristicSegmenter {
        &self.segmenter
    }

    /// 处理一个上传文件；提取失败时仍返回占位记录，不中断上传流程
    pub fn process(&self, buffer: &[u8], declared_type: &str, file_name: &str) -> ProcessedDocument {
        info!("开始处理文档: {}", file_name);

        let extraction = self.extractor.extract(buffer, declared_type, file_name);

        let topics = if extraction.success && validator::is_meaningful(&extraction.text) {
            self.segmenter.segment_text(&extraction.text)
        } else {
            warn!("文档 {} 无可用文本，生成占位记录", file_name);
            self.segmenter.segment_text("")
        };

        ProcessedDocument {
            file_name: file_name.to_string(),
            extraction,
            topics,
        }
    }
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::new(CleanMode::Standard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readable_text_is_segmented() {
        let body = "Overview of the unit on forces.\n1. Gravity\nMass attracts mass.\nWeight depends on g.";
        let doc = ExtractionPipeline::default().process(body.as_bytes(), "text/plain", "forces.txt");

        assert!(!doc.is_placeholder());
        assert_eq!(doc.user_message(), None);
        assert_eq!(doc.topics[0].summary, "Overview of the unit on forces.");
        assert_eq!(doc.topics[0].subtopics[0].title, "Gravity");
        assert_eq!(doc.topics[0].subtopics[0].key_points, vec!["Weight depends on g."]);
    }

    #[test]
    fn failed_extraction_yields_placeholder_record() {
        let doc = ExtractionPipeline::default().process(b"", "text/plain", "empty.txt");

        assert!(doc.is_placeholder());
        assert_eq!(doc.user_message(), Some(RETRY_MESSAGE));
        assert_eq!(doc.topics, vec![Subtopic::new("Extracted Content")]);
        assert_eq!(doc.file_name, "empty.txt");
    }
}
