use regex::Regex;
use tracing::{debug, info};

use super::{Segmenter, Subtopic, ROOT_TITLE};
use crate::utils::SegmentError;

/// 基于标题行的离线分段
pub struct HeuristicSegmenter {
    heading: Regex,
}

impl HeuristicSegmenter {
    pub fn new() -> Self {
        // "1. xxx" / "Chapter xxx" / "Section xxx"
        let heading = Regex::new(r"^(\d+\.|(?i:chapter|section))\s*(.+)").unwrap();
        Self { heading }
    }

    /// 返回恰好一个根节点，标题行之前的内容归入根节点
    pub fn segment_text(&self, text: &str) -> Vec<Subtopic> {
        let mut root = Subtopic::new(ROOT_TITLE);
        let mut subtopics: Vec<Subtopic> = Vec::new();
        let mut current: Option<Subtopic> = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(title) = self.heading_title(line) {
                debug!("检测到标题: {}", title);
                if let Some(done) = current.take() {
                    subtopics.push(done);
                }
                current = Some(Subtopic::new(title));
                continue;
            }

            match current.as_mut() {
                Some(open) => open.push_line(line),
                None => root.push_line(line),
            }
        }

        if let Some(done) = current.take() {
            subtopics.push(done);
        }

        info!("启发式分段完成，共 {} 个主题", subtopics.len());
        root.subtopics = subtopics;
        vec![root]
    }

    fn heading_title(&self, line: &str) -> Option<String> {
        let caps = self.heading.captures(line)?;
        let title = caps
            .get(2)
            .map(|m| m.as_str().trim())
            .filter(|t| !t.is_empty())
            .or_else(|| caps.get(0).map(|m| m.as_str().trim()))?;
        Some(title.to_string())
    }
}

impl Default for HeuristicSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for HeuristicSegmenter {
    async fn segment(&self, text: &str, _hint: Option<&str>) -> Result<Vec<Subtopic>, SegmentError> {
        Ok(self.segment_text(text))
    }
}
