//! 叶子主题出题流程 - 流程层
//!
//! 核心职责：定义"一个叶子主题"的完整处理流程
//!
//! 流程顺序：
//! 1. 构建出题 prompt → 调用生成服务
//! 2. 解析响应并映射为题目记录
//! 3. 写入题目及其选项/标准答案
//!
//! 任一步失败都直接返回错误，由编排层决定是否隔离。

use tracing::{debug, info};

use crate::error::AppResult;
use crate::infrastructure::Store;
use crate::services::prompts::question_prompt;
use crate::services::{parse_question_batch, GenerationClient, GenerationParams, QuestionInserter};
use crate::utils::logging::truncate_text;
use crate::workflow::topic_ctx::TopicCtx;

/// 叶子主题出题流程
///
/// - 不持有任何资源（生成客户端和存储都是借用的）
/// - 只依赖业务能力（services）
pub struct TopicFlow<'a> {
    llm: &'a dyn GenerationClient,
    store: &'a dyn Store,
    params: GenerationParams,
    reduced_volume: bool,
    write_metadata: bool,
    verbose_logging: bool,
}

impl<'a> TopicFlow<'a> {
    pub fn new(
        llm: &'a dyn GenerationClient,
        store: &'a dyn Store,
        params: GenerationParams,
        reduced_volume: bool,
    ) -> Self {
        Self {
            llm,
            store,
            params,
            reduced_volume,
            write_metadata: true,
            verbose_logging: false,
        }
    }

    pub fn with_metadata(mut self, write_metadata: bool) -> Self {
        self.write_metadata = write_metadata;
        self
    }

    pub fn with_verbose_logging(mut self, verbose_logging: bool) -> Self {
        self.verbose_logging = verbose_logging;
        self
    }

    /// 为一个叶子主题生成并写入题目，返回写入的题目数
    pub async fn run(&self, ctx: &TopicCtx<'_>) -> AppResult<usize> {
        let topic = ctx.topic;
        let prompt = question_prompt(&topic.name, &topic.description, self.reduced_volume);

        debug!("{} 🤖 请求生成题目...", ctx);
        let response = self.llm.generate(&prompt, &self.params).await?;

        if self.verbose_logging {
            debug!("{} 响应预览: {}", ctx, truncate_text(&response, 120));
        }

        let questions = parse_question_batch(&response, self.write_metadata)?;
        debug!("{} 解析出 {} 道题", ctx, questions.len());

        let ids = QuestionInserter::new(self.store)
            .insert(topic.id, &questions)
            .await?;

        info!("{} ✓ 写入 {} 道题", ctx, ids.len());
        Ok(ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::{AppError, MalformedResponseError};
    use crate::infrastructure::{MemoryStore, Table};
    use crate::models::Topic;
    use crate::services::MockLlmClient;
    use uuid::Uuid;

    fn leaf(name: &str) -> Topic {
        Topic {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: format!("{} description", name),
            parent_id: Some(Uuid::new_v4()),
            slug: None,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_reduced_run_inserts_five() {
        let llm = MockLlmClient::new();
        let store = MemoryStore::new();
        let params = GenerationParams::for_questions(&Config::default());
        let topic = leaf("List Comprehensions");

        let count = TopicFlow::new(&llm, &store, params, true)
            .run(&TopicCtx::new(1, 1, &topic))
            .await
            .unwrap();

        assert_eq!(count, 5);
        assert_eq!(store.count(Table::Questions), 5);
        assert_eq!(store.count(Table::Choices), 2 * 4 + 2);
        assert_eq!(store.count(Table::CorrectAnswers), 2);
    }

    #[tokio::test]
    async fn test_malformed_response_is_returned() {
        let topic = leaf("Broken");
        let llm = MockLlmClient::new().with_question_response("Broken", "not json");
        let store = MemoryStore::new();
        let params = GenerationParams::for_questions(&Config::default());

        let err = TopicFlow::new(&llm, &store, params, true)
            .run(&TopicCtx::new(1, 1, &topic))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::MalformedResponse(MalformedResponseError::InvalidJson { .. })
        ));
        assert_eq!(store.count(Table::Questions), 0);
    }
}
