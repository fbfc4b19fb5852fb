use tracing::{info, warn};

use super::{Segmenter, Subtopic};
use crate::gemini::GeminiClient;
use crate::utils::SegmentError;

/// 由 Gemini 生成主题树，失败时由调用方回退到启发式分段
pub struct GeminiSegmenter {
    client: GeminiClient,
}

impl GeminiSegmenter {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    fn build_prompt(&self, text: &str, hint: Option<&str>) -> String {
        let subject_line = hint
            .map(|s| format!("The subject of the document is \"{}\".\n", s))
            .unwrap_or_default();
        format!(
            "You are an expert teacher preparing study material.\n\
             {subject_line}\
             Split the document below into its main topics in document order. \
             Respond with JSON only: an array of objects with the fields \
             \"title\" (string), \"summary\" (string), \"keyPoints\" (array of strings), \
             optional \"subtopics\" (array of the same objects) and optional \
             \"estimatedTime\" (string such as \"15 minutes\").\n\n\
             Document:\n{document}",
            subject_line = subject_line,
            document = self.client.truncate_for_prompt(text),
        )
    }
}

impl Segmenter for GeminiSegmenter {
    async fn segment(&self, text: &str, hint: Option<&str>) -> Result<Vec<Subtopic>, SegmentError> {
        let prompt = self.build_prompt(text, hint);
        let reply = self.client.generate(&prompt).await?;
        let topics = parse_topics(&reply)?;
        info!("Gemini 分段完成，共 {} 个主题", topics.len());
        Ok(topics)
    }
}

/// 解析模型返回的主题数组，允许外层包裹 Markdown 代码块
pub(crate) fn parse_topics(reply: &str) -> Result<Vec<Subtopic>, SegmentError> {
    let payload = json_payload(reply);
    let topics: Vec<Subtopic> = serde_json::from_str(payload).map_err(|e| {
        warn!("Gemini 返回内容无法解析为JSON: {}", e);
        SegmentError::InvalidJson(e)
    })?;

    let topics: Vec<Subtopic> = topics
        .into_iter()
        .filter(|t| !t.title.trim().is_empty())
        .collect();
    if topics.is_empty() {
        return Err(SegmentError::NoTopics);
    }
    Ok(topics)
}

fn json_payload(reply: &str) -> &str {
    let trimmed = reply.trim();
    match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}
