use crate::error::ConfigError;

/// 存储后端类型
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// Supabase（PostgREST）
    Supabase,
    /// 进程内存储，用于离线试跑
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(Self::Supabase),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::EnvVarParseFailed {
                var_name: "STORAGE_BACKEND".to_string(),
                value: other.to_string(),
                expected_type: "supabase | memory".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Supabase => "supabase",
            Self::Memory => "memory",
        })
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 生成课程结构时的采样温度
    pub structure_temperature: f32,
    /// 生成题目时的采样温度
    pub question_temperature: f32,
    /// 生成题目时的最大输出 token 数
    pub question_max_tokens: u32,
    /// 使用确定性的模拟客户端代替真实 LLM
    pub use_mock_llm: bool,
    // --- 存储配置 ---
    pub supabase_url: String,
    pub supabase_key: String,
    pub storage_backend: StorageBackend,
    /// 是否写入 metadata 字段
    pub write_metadata: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4".to_string(),
            structure_temperature: 0.3,
            question_temperature: 0.4,
            question_max_tokens: 4000,
            use_mock_llm: false,
            supabase_url: String::new(),
            supabase_key: String::new(),
            storage_backend: StorageBackend::Supabase,
            write_metadata: true,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量加载配置（先读取 `.env`）
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let default = Self::default();
        Self {
            llm_api_key: std::env::var("OPENAI_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
            structure_temperature: std::env::var("STRUCTURE_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.structure_temperature),
            question_temperature: std::env::var("QUESTION_TEMPERATURE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.question_temperature),
            question_max_tokens: std::env::var("QUESTION_MAX_TOKENS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.question_max_tokens),
            use_mock_llm: std::env::var("USE_MOCK_LLM").ok().and_then(|v| v.parse().ok()).unwrap_or(default.use_mock_llm),
            supabase_url: std::env::var("SUPABASE_URL").unwrap_or(default.supabase_url),
            supabase_key: std::env::var("SUPABASE_KEY").unwrap_or(default.supabase_key),
            storage_backend: std::env::var("STORAGE_BACKEND").ok().and_then(|v| v.parse().ok()).unwrap_or(default.storage_backend),
            write_metadata: std::env::var("WRITE_METADATA").ok().and_then(|v| v.parse().ok()).unwrap_or(default.write_metadata),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 检查所选后端需要的凭据是否齐全
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.use_mock_llm && self.llm_api_key.is_empty() {
            return Err(ConfigError::EnvVarNotFound {
                var_name: "OPENAI_API_KEY".to_string(),
            });
        }
        if self.storage_backend == StorageBackend::Supabase {
            if self.supabase_url.is_empty() {
                return Err(ConfigError::EnvVarNotFound {
                    var_name: "SUPABASE_URL".to_string(),
                });
            }
            if self.supabase_key.is_empty() {
                return Err(ConfigError::EnvVarNotFound {
                    var_name: "SUPABASE_KEY".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!(" Supabase ".parse::<StorageBackend>().unwrap(), StorageBackend::Supabase);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EnvVarNotFound { var_name }) if var_name == "OPENAI_API_KEY"
        ));

        let config = Config {
            use_mock_llm: true,
            storage_backend: StorageBackend::Memory,
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        let config = Config {
            use_mock_llm: true,
            supabase_url: "https://example.supabase.co".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EnvVarNotFound { var_name }) if var_name == "SUPABASE_KEY"
        ));
    }
}
