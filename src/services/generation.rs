//! 文本生成能力
//!
//! 核心流程只依赖这个 trait：给定 prompt 和参数，返回原始文本。
//! 真实实现见 [`LlmService`](super::LlmService)，测试替身见 [`MockLlmClient`](super::MockLlmClient)。

use async_trait::async_trait;

use crate::config::Config;
use crate::error::GenerationError;

/// 单次生成请求的参数
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl GenerationParams {
    /// 课程结构分析使用的参数
    pub fn for_structure(config: &Config) -> Self {
        Self {
            model: config.llm_model_name.clone(),
            temperature: config.structure_temperature,
            max_tokens: None,
        }
    }

    /// 题目生成使用的参数
    pub fn for_questions(config: &Config) -> Self {
        Self {
            model: config.llm_model_name.clone(),
            temperature: config.question_temperature,
            max_tokens: Some(config.question_max_tokens),
        }
    }
}

/// 文本生成客户端
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError>;
}
