use thiserror::Error;

/// 应用程序错误类型
///
/// 每个变体对应流水线中的一类失败，调用方根据所处阶段决定是致命错误还是按主题隔离。
#[derive(Debug, Error)]
pub enum AppError {
    /// 生成服务本身失败（网络、服务端错误）
    #[error("生成服务错误: {0}")]
    Generation(#[from] GenerationError),
    /// 生成服务返回的内容无法解析为预期结构
    #[error("响应格式错误: {0}")]
    MalformedResponse(#[from] MalformedResponseError),
    /// 写入或读取存储失败
    #[error("持久化错误: {0}")]
    Persistence(#[from] PersistenceError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 生成服务错误
#[derive(Debug, Error)]
pub enum GenerationError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 构建请求失败
    #[error("构建 LLM 请求失败: {source}")]
    RequestBuildFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 响应格式错误
#[derive(Debug, Error)]
pub enum MalformedResponseError {
    /// 文本不是合法 JSON
    #[error("响应不是合法的 JSON ({preview}): {source}")]
    InvalidJson {
        preview: String,
        #[source]
        source: serde_json::Error,
    },
    /// JSON 合法但结构不符合预期（例如缺少 question_text）
    #[error("响应结构不符合 {expected}: {source}")]
    ShapeMismatch {
        expected: &'static str,
        #[source]
        source: serde_json::Error,
    },
    /// 题目数组为空
    #[error("响应中没有任何题目")]
    EmptyBatch,
    /// 当前无法落库的题型
    #[error("第 {index} 道题的题型 {question_type} 暂不支持")]
    UnsupportedQuestionType { index: usize, question_type: String },
}

/// 持久化错误
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// 网络请求失败
    #[error("存储请求失败 ({table}): {source}")]
    RequestFailed {
        table: String,
        #[source]
        source: reqwest::Error,
    },
    /// 存储返回错误响应
    #[error("存储返回错误响应 ({table}): status={status}, body={body}")]
    BadResponse {
        table: String,
        status: u16,
        body: String,
    },
    /// 写入后没有返回任何记录
    #[error("存储返回空结果: {table}")]
    EmptyResult { table: String },
    /// 返回记录无法解析
    #[error("无法解析 {table} 记录: {source}")]
    Decode {
        table: String,
        #[source]
        source: serde_json::Error,
    },
    /// 约束冲突或非法记录
    #[error("违反约束 ({table}): {message}")]
    Constraint { table: String, message: String },
    /// 记录不存在
    #[error("记录不存在 ({table}): {id}")]
    NotFound { table: String, id: String },
    /// 存储后端内部错误
    #[error("存储后端错误: {message}")]
    Backend { message: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 是否属于生成阶段的错误（服务失败或内容格式错误）
    pub fn is_generation_side(&self) -> bool {
        matches!(self, AppError::Generation(_) | AppError::MalformedResponse(_))
    }
}

impl PersistenceError {
    pub fn backend(message: impl Into<String>) -> Self {
        PersistenceError::Backend {
            message: message.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 存储层结果类型
pub type PersistenceResult<T> = Result<T, PersistenceError>;
