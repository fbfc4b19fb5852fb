pub mod pdf;

pub use pdf::{AggregateTechnique, PageTextTechnique, PdfTechnique};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

use crate::utils::ExtractError;
use crate::validator::{self, CleanMode};

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_TEXT: &str = "text/plain";

/// 产出文本的提取方法
///
/// 序列化名称与前端存储的历史记录保持一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExtractionMethod {
    #[serde(rename = "pdf-parse")]
    Aggregate,
    #[serde(rename = "pdfjs")]
    PageText,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "none")]
    None,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Aggregate => "pdf-parse",
            ExtractionMethod::PageText => "pdfjs",
            ExtractionMethod::Text => "text",
            ExtractionMethod::None => "none",
        }
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次提取的结果，不会以错误形式返回给调用方
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
    pub success: bool,
    pub error: Option<String>,
}

impl ExtractionResult {
    pub fn succeeded(text: String, method: ExtractionMethod) -> Self {
        Self {
            text,
            method,
            success: true,
            error: None,
        }
    }

    pub fn failed(error: &ExtractError) -> Self {
        Self {
            text: String::new(),
            method: ExtractionMethod::None,
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Text,
}

/// 文本提取器
pub struct Extractor {
    pdf_techniques: Vec<Box<dyn PdfTechnique>>,
    clean_mode: CleanMode,
}

impl Extractor {
    /// 默认顺序：pdf-extract 整体解析，失败后 lopdf 逐页解析
    pub fn new() -> Self {
        Self::with_pdf_techniques(vec![
            Box::new(AggregateTechnique),
            Box::new(PageTextTechnique),
        ])
    }

    pub fn with_pdf_techniques(pdf_techniques: Vec<Box<dyn PdfTechnique>>) -> Self {
        Self {
            pdf_techniques,
            clean_mode: CleanMode::Standard,
        }
    }

    pub fn clean_mode(mut self, clean_mode: CleanMode) -> Self {
        self.clean_mode = clean_mode;
        self
    }

    /// 提取文本，按文件类型依次尝试各方法
    pub fn extract(&self, buffer: &[u8], declared_type: &str, file_name: &str) -> ExtractionResult {
        let declared = normalize_mime(declared_type);
        info!(
            "提取文本: {} (类型: {:?}, {} 字节)",
            file_name,
            declared,
            buffer.len()
        );

        let outcome = match classify(&declared, file_name) {
            Some(DocumentKind::Pdf) => self.extract_pdf(buffer),
            Some(DocumentKind::Text) => self.extract_plain(buffer),
            None => {
                let shown = if declared.is_empty() { file_name } else { declared.as_str() };
                Err(ExtractError::UnsupportedType(shown.to_string()))
            }
        };

        match outcome {
            Ok(result) => {
                info!("提取成功: 方法 {}, {} 字符", result.method, result.text.len());
                result
            }
            Err(e) => {
                warn!("提取失败 [{}]: {}", e.kind(), e);
                ExtractionResult::failed(&e)
            }
        }
    }

    fn extract_pdf(&self, buffer: &[u8]) -> Result<ExtractionResult, ExtractError> {
        for technique in &self.pdf_techniques {
            let method = technique.method();
            match run_technique(technique.as_ref(), buffer) {
                Ok(raw) if raw.trim().is_empty() => {
                    warn!("{} 未提取到文本", method);
                }
                Ok(raw) => {
                    let cleaned = self.clean_mode.apply(&raw);
                    if validator::is_meaningful(&cleaned) {
                        return Ok(ExtractionResult::succeeded(cleaned, method));
                    }
                    warn!("{} 提取的文本不可读 ({} 字符)，尝试下一种方法", method, cleaned.len());
                }
                Err(e) => {
                    warn!("{} 失败，尝试下一种方法: {}", method, e);
                }
            }
        }
        Err(ExtractError::NoReadablePdfText)
    }

    fn extract_plain(&self, buffer: &[u8]) -> Result<ExtractionResult, ExtractError> {
        let raw = String::from_utf8_lossy(buffer);
        let cleaned = self.clean_mode.apply(&raw);
        if validator::is_meaningful(&cleaned) {
            Ok(ExtractionResult::succeeded(cleaned, ExtractionMethod::Text))
        } else {
            Err(ExtractError::NoReadableText)
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

/// 调用单个方法，把 panic 也转换为错误
fn run_technique(technique: &dyn PdfTechnique, buffer: &[u8]) -> Result<String, ExtractError> {
    let method = technique.method();
    debug!("尝试 {}", method);
    match panic::catch_unwind(AssertUnwindSafe(|| technique.extract_text(buffer))) {
        Ok(result) => result,
        Err(_) => Err(ExtractError::Panicked { technique: method }),
    }
}

/// 去掉参数部分并转小写，如 `text/plain; charset=utf-8` → `text/plain`
fn normalize_mime(declared_type: &str) -> String {
    declared_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn classify(declared: &str, file_name: &str) -> Option<DocumentKind> {
    let lower_name = file_name.to_ascii_lowercase();
    if declared == MIME_PDF || lower_name.ends_with(".pdf") {
        Some(DocumentKind::Pdf)
    } else if declared == MIME_TEXT || lower_name.ends_with(".txt") {
        Some(DocumentKind::Text)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const LESSON: &str = "Photosynthesis converts light energy into chemical energy in plants.";

    enum Behaviour {
        Text(&'static str),
        Fail,
        Panic,
    }

    struct StubTechnique {
        method: ExtractionMethod,
        behaviour: Behaviour,
        calls: Arc<AtomicUsize>,
    }

    impl StubTechnique {
        fn boxed(method: ExtractionMethod, behaviour: Behaviour) -> (Box<dyn PdfTechnique>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let stub = StubTechnique {
                method,
                behaviour,
                calls: Arc::clone(&calls),
            };
            (Box::new(stub), calls)
        }
    }

    impl PdfTechnique for StubTechnique {
        fn method(&self) -> ExtractionMethod {
            self.method
        }

        fn extract_text(&self, _bytes: &[u8]) -> Result<String, ExtractError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Text(text) => Ok(text.to_string()),
                Behaviour::Fail => Err(ExtractError::technique(self.method, "corrupt xref table")),
                Behaviour::Panic => panic!("malformed font program"),
            }
        }
    }

    fn stub_extractor(primary: Behaviour, secondary: Behaviour) -> (Extractor, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let (first, first_calls) = StubTechnique::boxed(ExtractionMethod::Aggregate, primary);
        let (second, second_calls) = StubTechnique::boxed(ExtractionMethod::PageText, secondary);
        (Extractor::with_pdf_techniques(vec![first, second]), first_calls, second_calls)
    }

    #[test]
    fn primary_success_skips_secondary() {
        let (extractor, _, second_calls) = stub_extractor(Behaviour::Text(LESSON), Behaviour::Fail);
        let result = extractor.extract(b"%PDF-1.4", MIME_PDF, "lesson.pdf");
        assert!(result.success);
        assert_eq!(result.method, ExtractionMethod::Aggregate);
        assert_eq!(result.text, LESSON);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn falls_back_to_page_text_when_primary_errors() {
        let (extractor, first_calls, _) = stub_extractor(Behaviour::Fail, Behaviour::Text(LESSON));
        let result = extractor.extract(b"%PDF-1.4", MIME_PDF, "lesson.pdf");
        assert!(result.success);
        assert_eq!(result.method, ExtractionMethod::PageText);
        assert_eq!(result.error, None);
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn falls_back_when_primary_panics() {
        let (extractor, _, _) = stub_extractor(Behaviour::Panic, Behaviour::Text(LESSON));
        let result = extractor.extract(b"%PDF-1.4", "", "Lesson.PDF");
        assert!(result.success);
        assert_eq!(result.method, ExtractionMethod::PageText);
    }

    #[test]
    fn falls_back_when_primary_text_is_garbage() {
        let (extractor, _, _) =
            stub_extractor(Behaviour::Text("0123456789 0123456789 0123456789"), Behaviour::Text(LESSON));
        let result = extractor.extract(b"%PDF-1.4", MIME_PDF, "scan.pdf");
        assert_eq!(result.method, ExtractionMethod::PageText);
    }

    #[test]
    fn exhausted_pdf_reports_failure() {
        let (extractor, first_calls, second_calls) =
            stub_extractor(Behaviour::Text("   \n  "), Behaviour::Text("Failed to extract text"));
        let result = extractor.extract(b"%PDF-1.4", MIME_PDF, "scan.pdf");
        assert!(!result.success);
        assert_eq!(result.method, ExtractionMethod::None);
        assert_eq!(
            result.error.as_deref(),
            Some("No readable text could be extracted from PDF")
        );
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pdf_text_is_cleaned() {
        let (extractor, _, _) = stub_extractor(
            Behaviour::Text("  Chapter 1   Cells\n\n\n The cell is the unit  of life. \n"),
            Behaviour::Fail,
        );
        let result = extractor.extract(b"%PDF-1.4", MIME_PDF, "bio.pdf");
        assert_eq!(result.text, "Chapter 1 Cells\nThe cell is the unit of life.");
    }

    #[test]
    fn unsupported_type_invokes_no_technique() {
        let (extractor, first_calls, second_calls) =
            stub_extractor(Behaviour::Text(LESSON), Behaviour::Text(LESSON));
        let result = extractor.extract(b"\x89PNG\r\n", "image/png", "photo.png");
        assert!(!result.success);
        assert_eq!(result.method, ExtractionMethod::None);
        assert_eq!(result.error.as_deref(), Some("Unsupported file type: image/png"));
        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn word_documents_are_unsupported() {
        let result = Extractor::new().extract(
            b"PK\x03\x04",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "notes.docx",
        );
        assert!(!result.success);
        assert!(result.error.unwrap().contains("wordprocessingml"));
    }

    #[test]
    fn unsupported_without_declared_type_names_the_file() {
        let result = Extractor::new().extract(b"data", "", "archive.zip");
        assert_eq!(result.error.as_deref(), Some("Unsupported file type: archive.zip"));
    }

    #[test]
    fn plain_text_is_decoded_and_cleaned() {
        let body = "  Newton's first law:\n\n  an object at rest   stays at rest.\n";
        let result = Extractor::new().extract(body.as_bytes(), "text/plain; charset=utf-8", "notes");
        assert!(result.success);
        assert_eq!(result.method, ExtractionMethod::Text);
        assert_eq!(result.text, "Newton's first law:\nan object at rest stays at rest.");
    }

    #[test]
    fn txt_suffix_selects_text_path() {
        let result = Extractor::new().extract(LESSON.as_bytes(), "application/octet-stream", "NOTES.TXT");
        assert_eq!(result.method, ExtractionMethod::Text);
    }

    #[test]
    fn empty_text_file_fails_gracefully() {
        let result = Extractor::new().extract(b"", MIME_TEXT, "x.txt");
        assert!(!result.success);
        assert_eq!(result.method, ExtractionMethod::None);
        assert_eq!(result.error.as_deref(), Some("Text file contains no readable content"));
    }

    #[test]
    fn strict_mode_drops_symbols() {
        let extractor = Extractor::new().clean_mode(CleanMode::Strict);
        let result = extractor.extract("Energy ▪ is → conserved in every process.".as_bytes(), MIME_TEXT, "a.txt");
        assert_eq!(result.text, "Energy is conserved in every process.");
    }

    #[test]
    fn garbage_pdf_never_panics() {
        let result = Extractor::new().extract(b"this is not really a pdf", MIME_PDF, "broken.pdf");
        assert!(!result.success);
        assert_eq!(result.method, ExtractionMethod::None);
        assert_eq!(
            result.error.as_deref(),
            Some("No readable text could be extracted from PDF")
        );
    }

    #[test]
    fn result_serializes_with_wire_method_names() {
        let result = ExtractionResult::succeeded("x".into(), ExtractionMethod::PageText);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["method"], "pdfjs");
        assert_eq!(json["success"], true);
        assert!(json["error"].is_null());
    }
}
