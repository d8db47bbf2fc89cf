use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use course_question_gen::config::{Config, StorageBackend};
use course_question_gen::infrastructure::{MemoryStore, Store, SupabaseStore};
use course_question_gen::orchestrator::{CourseGenerator, GenerationOptions};
use course_question_gen::services::{GenerationClient, LlmService, MockLlmClient};
use course_question_gen::utils::logging;

/// 根据学习目标生成课程主题层级和练习题
#[derive(Parser)]
#[command(name = "course-gen")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 学习目标，例如 "Finnish B1 Grammar"
    topic: String,

    /// 精简模式：每个叶子主题只生成 5 道题
    #[arg(long, visible_alias = "test-mode")]
    reduced: bool,

    /// 使用确定性的模拟 LLM
    #[arg(long)]
    mock: bool,

    /// 使用进程内存储（不写入 Supabase）
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置，命令行开关优先
    let mut config = Config::from_env();
    config.use_mock_llm |= cli.mock;
    if cli.memory {
        config.storage_backend = StorageBackend::Memory;
    }

    logging::init(config.verbose_logging);
    config.validate().context("配置不完整")?;

    let llm: Arc<dyn GenerationClient> = if config.use_mock_llm {
        Arc::new(MockLlmClient::new())
    } else {
        Arc::new(LlmService::new(&config))
    };
    let store: Arc<dyn Store> = match config.storage_backend {
        StorageBackend::Supabase => Arc::new(SupabaseStore::new(&config)),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };

    let backend = format!(
        "{} / {}",
        if config.use_mock_llm { "mock" } else { config.llm_model_name.as_str() },
        config.storage_backend
    );
    logging::log_startup(&cli.topic, cli.reduced, &backend);

    let generator = CourseGenerator::new(llm, store, GenerationOptions::from_config(&config, cli.reduced));
    let summary = generator
        .generate(&cli.topic)
        .await
        .with_context(|| format!("课程生成失败: {}", cli.topic))?;

    logging::print_final_stats(summary.total_topics, summary.total_questions, &summary.failed_topics);
    info!("\n🎉 课程摘要\n{}", summary);

    Ok(())
}
