//! LLM 服务 - 业务能力层
//!
//! 只负责"把 prompt 发给模型、拿回文本"，不关心返回内容的结构
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::generation::{GenerationClient, GenerationParams};
use crate::config::Config;
use crate::error::GenerationError;

/// LLM 服务
pub struct LlmService {
    client: Client<OpenAIConfig>,
    system_message: Option<String>,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            system_message: None,
        }
    }

    /// 为每次请求附加系统消息
    pub fn with_system_message(mut self, system_message: impl Into<String>) -> Self {
        self.system_message = Some(system_message.into());
        self
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `params`: 模型、温度、最大输出长度
    ///
    /// # 返回
    /// 返回去掉首尾空白的响应内容
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        debug!("调用 LLM API，模型: {}", params.model);
        debug!("用户消息长度: {} 字符", user_message.len());

        let build_failed = |e: async_openai::error::OpenAIError| GenerationError::RequestBuildFailed {
            source: Box::new(e),
        };

        let mut messages = Vec::new();

        if let Some(sys_msg) = &self.system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg.as_str())
                .build()
                .map_err(build_failed)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(build_failed)?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let mut request = CreateChatCompletionRequestArgs::default();
        request
            .model(&params.model)
            .messages(messages)
            .temperature(params.temperature);
        if let Some(max_tokens) = params.max_tokens {
            request.max_tokens(max_tokens);
        }
        let request = request.build().map_err(build_failed)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            GenerationError::ApiCallFailed {
                model: params.model.clone(),
                source: Box::new(e),
            }
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| GenerationError::EmptyContent {
                model: params.model.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl GenerationClient for LlmService {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError> {
        self.send_to_llm(prompt, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 测试通用 LLM 调用
    ///
    /// 运行方式：
    /// ```bash
    /// OPENAI_API_KEY=... cargo test test_send_to_llm_simple -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_send_to_llm_simple() {
        let _ = tracing_subscriber::fmt::try_init();

        let config = Config::from_env();
        let service = LlmService::new(&config).with_system_message("Answer briefly.");
        let params = GenerationParams::for_structure(&config);

        let response = service
            .send_to_llm("Reply with the JSON array [1, 2, 3] and nothing else.", &params)
            .await;

        match response {
            Ok(text) => {
                println!("LLM 响应: {}", text);
                assert!(!text.is_empty());
            }
            Err(e) => panic!("LLM 调用失败: {}", e),
        }
    }
}
