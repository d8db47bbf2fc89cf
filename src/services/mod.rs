//! 业务能力层 - 描述"我能做什么"，每个能力只处理一件事

pub mod generation;
pub mod hierarchy_inserter;
pub mod llm_service;
pub mod mock_llm;
pub mod prompts;
pub mod question_inserter;
pub mod schema_mapper;

pub use generation::{GenerationClient, GenerationParams};
pub use hierarchy_inserter::{HierarchyInserter, HierarchyOutcome};
pub use llm_service::LlmService;
pub use mock_llm::MockLlmClient;
pub use question_inserter::QuestionInserter;
pub use schema_mapper::{parse_question_batch, parse_structure, MappedQuestion};
