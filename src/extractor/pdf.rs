use lopdf::Document;
use tracing::{debug, info, warn};

use super::ExtractionMethod;
use crate::utils::ExtractError;

/// 一种把PDF字节转换为文本的方法
///
/// 实现只需要“返回文本或返回错误”，panic 由 [`super::Extractor`] 统一捕获。
pub trait PdfTechnique: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// 整体解析：pdf-extract 一次性输出全文
pub struct AggregateTechnique;

impl PdfTechnique for AggregateTechnique {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::Aggregate
    }

    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let text = pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractError::technique(self.method(), e))?;
        info!("pdf-extract 提取文本长度: {} 字符", text.len());
        Ok(text)
    }
}

/// 逐页解析：lopdf 按页码顺序读取每页的文本层
pub struct PageTextTechnique;

impl PdfTechnique for PageTextTechnique {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::PageText
    }

    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| ExtractError::technique(self.method(), e))?;

        // get_pages 返回 BTreeMap，键即页码，天然有序
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        info!("lopdf 加载成功，共 {} 页", page_numbers.len());

        let text = join_pages(page_numbers, |page| {
            doc.extract_text(&[page])
                .map_err(|e| ExtractError::technique(self.method(), e))
        });
        Ok(text)
    }
}

/// 按页码顺序拼接每页文本，每页后追加换行。
///
/// 单页失败只记录日志并跳过，不影响其余页。
pub(crate) fn join_pages<I, F>(page_numbers: I, mut read_page: F) -> String
where
    I: IntoIterator<Item = u32>,
    F: FnMut(u32) -> Result<String, ExtractError>,
{
    let mut out = String::new();
    let mut failed = 0usize;

    for page in page_numbers {
        match read_page(page) {
            Ok(text) => {
                debug!("第 {} 页提取 {} 字符", page, text.len());
                out.push_str(&text);
                out.push('\n');
            }
            Err(e) => {
                warn!("第 {} 页提取失败: {}", page, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        warn!("逐页提取完成，{} 页失败", failed);
    }
    out
}
