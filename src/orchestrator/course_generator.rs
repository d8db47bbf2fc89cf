//! 课程生成器 - 编排层
//!
//! ## 职责
//!
//! 把一个学习目标变成一棵落库的课程树和题库，是整个系统的入口。
//!
//! ## 阶段
//!
//! 1. **Analyzing**：请求课程结构，解析失败则整个运行失败
//! 2. **HierarchyPersisted**：写入主题层级，失败则整个运行失败
//! 3. **EnumeratingLeaves**：枚举根节点下的叶子主题，结果为空不算错误
//! 4. **Generating**：逐个叶子主题出题，单个主题失败只记录名称，继续处理下一个
//! 5. **Done**：汇总统计，回写根节点 metadata（失败只告警）
//!
//! ## 设计特点
//!
//! - **依赖注入**：生成客户端和存储由调用方传入，本模块不关心是真实服务还是替身
//! - **严格串行**：同一时刻只有一个外部请求

use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{Store, Table};
use crate::models::{Metadata, Topic};
use crate::services::prompts::structure_prompt;
use crate::services::{parse_structure, GenerationClient, GenerationParams, HierarchyInserter};
use crate::utils::logging::{log_topic_start, preview_names};
use crate::workflow::{TopicCtx, TopicFlow};

/// 摘要中最多显示的失败主题数
const FAILED_PREVIEW_LIMIT: usize = 3;

/// 生成流程所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    Analyzing,
    HierarchyPersisted,
    EnumeratingLeaves,
    Generating,
    Done,
}

impl fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationPhase::Analyzing => "分析课程结构",
            GenerationPhase::HierarchyPersisted => "写入主题层级",
            GenerationPhase::EnumeratingLeaves => "枚举叶子主题",
            GenerationPhase::Generating => "生成题目",
            GenerationPhase::Done => "完成",
        };
        f.write_str(name)
    }
}

/// 单次运行的选项
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// 精简模式：每个叶子主题只出少量题目
    pub reduced_volume: bool,
    pub write_metadata: bool,
    pub verbose_logging: bool,
    pub structure_params: GenerationParams,
    pub question_params: GenerationParams,
}

impl GenerationOptions {
    pub fn from_config(config: &Config, reduced_volume: bool) -> Self {
        Self {
            reduced_volume,
            write_metadata: config.write_metadata,
            verbose_logging: config.verbose_logging,
            structure_params: GenerationParams::for_structure(config),
            question_params: GenerationParams::for_questions(config),
        }
    }
}

/// 运行结果汇总
#[derive(Debug, Clone, PartialEq)]
pub struct CourseSummary {
    pub root_id: Uuid,
    /// 枚举到的叶子主题数量
    pub total_topics: usize,
    /// 实际写入的题目数量
    pub total_questions: usize,
    /// 出题失败的叶子主题名称（完整列表）
    pub failed_topics: Vec<String>,
    /// 本次新写入的非根主题数量
    pub topics_created: usize,
    /// 课程结构中计划的题目数量
    pub planned_questions: u64,
}

impl CourseSummary {
    pub fn succeeded_topics(&self) -> usize {
        self.total_topics - self.failed_topics.len()
    }
}

impl fmt::Display for CourseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "课程 ID: {}", self.root_id)?;
        writeln!(f, "叶子主题: {} (成功 {})", self.total_topics, self.succeeded_topics())?;
        write!(f, "题目总数: {}", self.total_questions)?;
        if !self.failed_topics.is_empty() {
            write!(
                f,
                "\n失败主题: {}",
                preview_names(&self.failed_topics, FAILED_PREVIEW_LIMIT)
            )?;
        }
        Ok(())
    }
}

/// 课程生成器
pub struct CourseGenerator {
    llm: Arc<dyn GenerationClient>,
    store: Arc<dyn Store>,
    options: GenerationOptions,
}

impl CourseGenerator {
    pub fn new(llm: Arc<dyn GenerationClient>, store: Arc<dyn Store>, options: GenerationOptions) -> Self {
        Self { llm, store, options }
    }

    /// 运行完整流程
    ///
    /// 只有结构分析、层级写入和叶子枚举的失败会返回 `Err`，叶子主题的失败记录在 `failed_topics` 中。
    /// 同一学习目标再次运行会复用根节点，上一次写入的叶子主题也会被枚举并再出一套题。
    pub async fn generate(&self, topic_input: &str) -> AppResult<CourseSummary> {
        // ========== 分析课程结构 ==========
        enter(GenerationPhase::Analyzing);
        let prompt = structure_prompt(topic_input);
        let response = self
            .llm
            .generate(&prompt, &self.options.structure_params)
            .await
            .inspect_err(|e| error!("❌ 课程结构请求失败: {}", e))?;
        let structure = parse_structure(&response).inspect_err(|e| error!("❌ 课程结构解析失败: {}", e))?;
        info!(
            "✓ 课程结构: {} 个分类, {} 个叶子主题",
            structure.structure.main_categories.len(),
            structure.leaf_count()
        );

        // ========== 写入主题层级 ==========
        enter(GenerationPhase::HierarchyPersisted);
        let hierarchy = HierarchyInserter::new(self.store.as_ref(), self.options.write_metadata)
            .insert(&structure, topic_input)
            .await
            .inspect_err(|e| error!("❌ 主题层级写入失败: {}", e))?;
        info!("✓ 写入 {} 个主题节点", hierarchy.topics_created);

        // ========== 枚举叶子主题 ==========
        enter(GenerationPhase::EnumeratingLeaves);
        let leaves = self
            .store
            .leaf_topics(hierarchy.root.id)
            .await
            .inspect_err(|e| error!("❌ 叶子主题枚举失败: {}", e))?;
        if leaves.is_empty() {
            warn!("⚠️ 根节点下没有叶子主题，跳过出题");
        } else {
            info!("✓ 找到 {} 个叶子主题", leaves.len());
        }

        // ========== 逐个叶子主题出题 ==========
        enter(GenerationPhase::Generating);
        let (total_questions, failed_topics) = self.generate_questions(&leaves).await;

        enter(GenerationPhase::Done);
        let summary = CourseSummary {
            root_id: hierarchy.root.id,
            total_topics: leaves.len(),
            total_questions,
            failed_topics,
            topics_created: hierarchy.topics_created,
            planned_questions: hierarchy.planned_questions,
        };

        if self.options.write_metadata {
            self.patch_root_metadata(&hierarchy.root, &summary).await;
        }

        Ok(summary)
    }

    /// 逐个叶子主题出题，返回 (题目总数, 失败主题)
    async fn generate_questions(&self, leaves: &[Topic]) -> (usize, Vec<String>) {
        let flow = TopicFlow::new(
            self.llm.as_ref(),
            self.store.as_ref(),
            self.options.question_params.clone(),
            self.options.reduced_volume,
        )
        .with_metadata(self.options.write_metadata)
        .with_verbose_logging(self.options.verbose_logging);

        let mut total_questions = 0;
        let mut failed_topics = Vec::new();

        for (index, topic) in leaves.iter().enumerate() {
            let ctx = TopicCtx::new(index + 1, leaves.len(), topic);
            log_topic_start(ctx.index, ctx.total, &topic.name);

            match flow.run(&ctx).await {
                Ok(count) => total_questions += count,
                Err(e) => {
                    let stage = if e.is_generation_side() { "生成" } else { "写入" };
                    warn!("{} ⚠️ 题目{}失败，跳过: {}", ctx, stage, e);
                    failed_topics.push(topic.name.clone());
                }
            }
        }

        (total_questions, failed_topics)
    }

    /// 把本次统计合并进根节点 metadata
    async fn patch_root_metadata(&self, root: &Topic, summary: &CourseSummary) {
        let mut metadata: Metadata = root.metadata.clone().unwrap_or_default();
        metadata.insert(
            "generation_stats".to_string(),
            json!({
                "leaf_topics": summary.total_topics,
                "questions_generated": summary.total_questions,
                "failed_topics": summary.failed_topics.len(),
                "planned_questions": summary.planned_questions,
                "generated_at": chrono::Utc::now().to_rfc3339(),
            }),
        );

        match self
            .store
            .update(Table::Topics, root.id, json!({ "metadata": metadata }))
            .await
        {
            Ok(()) => info!("✓ 已更新课程统计"),
            Err(e) => warn!("⚠️ 更新课程统计失败: {}", e),
        }
    }
}

fn enter(phase: GenerationPhase) {
    info!("\n▶ 阶段: {}", phase);
}
