use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{ApiCredentials, GeminiConfig};
use crate::utils::GeminiError;

/// generateContent 请求体
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

/// generateContent 响应体
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// 第一个候选的全部文本片段
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
    credentials: ApiCredentials,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig, credentials: ApiCredentials) -> Result<Self, GeminiError> {
        // 超时由每次请求的 tokio::time::timeout 控制，这里只设置连接超时
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// 截断到 max_prompt_chars 个字符，不会切断多字节字符
    pub fn truncate_for_prompt<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.config.max_prompt_chars) {
            Some((idx, _)) => {
                info!("文本过长，截断到 {} 字符", self.config.max_prompt_chars);
                &text[..idx]
            }
            None => text,
        }
    }

    /// 生成学习摘要
    pub async fn summarize(&self, text: &str, subject: Option<&str>) -> Result<String, GeminiError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let subject_line = subject
            .map(|s| format!("The document belongs to the subject \"{}\".\n", s))
            .unwrap_or_default();
        let prompt = format!(
            "You are a patient tutor for students.\n\
             {subject_line}\
             Write a clear study summary of the following document: an overview paragraph, \
             then the most important ideas as short bullet points. \
             Do not invent facts that are not in the document.\n\n\
             Document:\n{document}",
            subject_line = subject_line,
            document = self.truncate_for_prompt(text),
        );

        let summary = self.generate(&prompt).await?;
        Ok(summary.trim().to_string())
    }

    /// 调用 generateContent，带超时和重试
    pub async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
            },
        };

        let attempts = self.config.max_retries.max(1);
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                info!("Gemini 重试 ({}/{})，等待 {}ms...", attempt + 1, attempts, delay.as_millis());
                tokio::time::sleep(delay).await;
            }

            let outcome = match tokio::time::timeout(timeout, self.do_request(&request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(GeminiError::Timeout(self.config.timeout_secs)),
            };

            match outcome {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("Gemini 调用失败 (尝试 {}/{}): {}", attempt + 1, attempts, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(GeminiError::EmptyResponse))
    }

    async fn do_request(&self, request: &GenerateRequest) -> Result<String, GeminiError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.credentials.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeminiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateResponse = response.json().await?;
        body.into_text().ok_or(GeminiError::EmptyResponse)
    }
}
