use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use vidya::config::{AppConfig, DEFAULT_CONFIG_PATH};
use vidya::extractor::ExtractionResult;
use vidya::gemini::GeminiClient;
use vidya::utils::logger;
use vidya::validator::{self, CleanMode};
use vidya::{ExtractionPipeline, GeminiSegmenter, ProcessedDocument, Segmenter, Subtopic};

#[derive(Parser)]
#[command(name = "vidya")]
#[command(about = "学习资料文本提取与主题分段工具", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 生成默认配置文件
    Init,
    /// 提取文档文本，输出 JSON
    Extract {
        file: PathBuf,
        /// 声明的 MIME 类型，缺省时按文件后缀判断
        #[arg(long, default_value = "")]
        mime: String,
        /// 只保留字母、数字和常见标点
        #[arg(long)]
        strict: bool,
    },
    /// 检查提取出的文本是否可用
    Check {
        file: PathBuf,
        #[arg(long, default_value = "")]
        mime: String,
    },
    /// 将文档切分为主题树
    Segment {
        file: PathBuf,
        #[arg(long, default_value = "")]
        mime: String,
        /// 使用 Gemini 分段，失败时回退到启发式分段
        #[arg(long)]
        llm: bool,
        /// 学科提示，例如 "Biology"
        #[arg(short, long)]
        subject: Option<String>,
    },
    /// 使用 Gemini 生成学习摘要
    Summarize {
        file: PathBuf,
        #[arg(long, default_value = "")]
        mime: String,
        #[arg(short, long)]
        subject: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_logger();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_command().await?;
        }
        Commands::Extract { file, mime, strict } => {
            extract_command(&file, &mime, strict).await?;
        }
        Commands::Check { file, mime } => {
            check_command(&file, &mime).await?;
        }
        Commands::Segment {
            file,
            mime,
            llm,
            subject,
        } => {
            segment_command(&file, &mime, llm, subject.as_deref()).await?;
        }
        Commands::Summarize {
            file,
            mime,
            subject,
        } => {
            summarize_command(&file, &mime, subject.as_deref()).await?;
        }
    }

    Ok(())
}

async fn init_command() -> Result<()> {
    info!("初始化配置...");

    tokio::fs::create_dir_all("config").await?;

    if Path::new(DEFAULT_CONFIG_PATH).exists() {
        info!("配置文件已存在，跳过: {}", DEFAULT_CONFIG_PATH);
        return Ok(());
    }

    AppConfig::default().save(DEFAULT_CONFIG_PATH)?;
    info!("已生成配置文件: {}", DEFAULT_CONFIG_PATH);
    info!("下一步: 编辑 {} 设置 [gemini] api_key，或设置环境变量 GEMINI_API_KEY", DEFAULT_CONFIG_PATH);
    Ok(())
}

async fn extract_command(file: &Path, mime: &str, strict: bool) -> Result<()> {
    let app_config = AppConfig::load()?;
    let clean_mode = clean_mode_for(strict || app_config.extraction.strict_cleaning);
    let doc = process_file(&app_config, file, mime, clean_mode).await?;
    print_json(&doc.extraction)?;
    Ok(())
}

async fn check_command(file: &Path, mime: &str) -> Result<()> {
    let app_config = AppConfig::load()?;
    let doc = process_file(&app_config, file, mime, CleanMode::Standard).await?;

    if !doc.extraction.success {
        info!("提取失败: {}", doc.extraction.error.as_deref().unwrap_or_default());
    }

    let assessment = validator::assess(&doc.extraction.text);
    info!(
        "字符数 {}, 字母占比 {:.2}, 可用: {}",
        assessment.char_count, assessment.alpha_ratio, assessment.meaningful
    );
    print_json(&assessment)?;
    Ok(())
}

async fn segment_command(file: &Path, mime: &str, llm: bool, subject: Option<&str>) -> Result<()> {
    let app_config = AppConfig::load()?;
    let clean_mode = clean_mode_for(app_config.extraction.strict_cleaning);
    let doc = process_file(&app_config, file, mime, clean_mode).await?;

    if let Some(message) = doc.user_message() {
        warn!("{}", message);
        print_json(&doc)?;
        return Ok(());
    }

    let topics = if llm {
        llm_topics(&app_config, &doc, subject).await
    } else {
        doc.topics.clone()
    };

    print_json(&topics)?;
    Ok(())
}

/// 尝试 Gemini 分段，任何失败都回退到启发式结果
async fn llm_topics(app_config: &AppConfig, doc: &ProcessedDocument, subject: Option<&str>) -> Vec<Subtopic> {
    let Some(credentials) = app_config.credentials() else {
        warn!("Gemini API key 未配置，使用启发式分段");
        return doc.topics.clone();
    };

    let client = match GeminiClient::new(app_config.gemini.clone(), credentials) {
        Ok(client) => client,
        Err(e) => {
            warn!("创建 Gemini 客户端失败: {}，使用启发式分段", e);
            return doc.topics.clone();
        }
    };

    let segmenter = GeminiSegmenter::new(client);
    match segmenter.segment(&doc.extraction.text, subject).await {
        Ok(topics) => topics,
        Err(e) => {
            warn!("Gemini 分段失败: {}，使用启发式分段", e);
            doc.topics.clone()
        }
    }
}

async fn summarize_command(file: &Path, mime: &str, subject: Option<&str>) -> Result<()> {
    let app_config = AppConfig::load()?;
    let credentials = app_config
        .credentials()
        .context("Gemini API key 未配置。请在 config/settings.toml 中设置 [gemini] api_key 或设置 GEMINI_API_KEY")?;

    let clean_mode = clean_mode_for(app_config.extraction.strict_cleaning);
    let doc = process_file(&app_config, file, mime, clean_mode).await?;
    if let Some(message) = doc.user_message() {
        warn!("{}", message);
        print_json(&doc.extraction)?;
        return Ok(());
    }

    let client = GeminiClient::new(app_config.gemini.clone(), credentials)?;
    let summary = client.summarize(&doc.extraction.text, subject).await?;
    println!("{}", summary);
    Ok(())
}

/// 读取文件并在阻塞线程中运行提取管道
async fn process_file(
    app_config: &AppConfig,
    file: &Path,
    mime: &str,
    clean_mode: CleanMode,
) -> Result<ProcessedDocument> {
    let size = tokio::fs::metadata(file)
        .await
        .with_context(|| format!("无法读取文件: {}", file.display()))?
        .len();

    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if size > app_config.extraction.max_file_bytes {
        warn!(
            "文件过大: {} 字节，上限 {} 字节",
            size, app_config.extraction.max_file_bytes
        );
        anyhow::bail!(
            "File too large: {} bytes (limit {} bytes)",
            size,
            app_config.extraction.max_file_bytes
        );
    }

    let buffer = tokio::fs::read(file)
        .await
        .with_context(|| format!("无法读取文件: {}", file.display()))?;
    let mime = mime.to_string();

    let doc = tokio::task::spawn_blocking(move || {
        ExtractionPipeline::new(clean_mode).process(&buffer, &mime, &file_name)
    })
    .await
    .context("提取任务异常退出")?;

    log_result(&doc.extraction);
    Ok(doc)
}

fn log_result(result: &ExtractionResult) {
    if result.success {
        info!("✅ 提取完成: 方法 {}, {} 字符", result.method, result.text.chars().count());
    } else {
        info!("❌ 提取失败: {}", result.error.as_deref().unwrap_or_default());
    }
}

fn clean_mode_for(strict: bool) -> CleanMode {
    if strict {
        CleanMode::Strict
    } else {
        CleanMode::Standard
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
