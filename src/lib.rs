//! # Course Question Gen
//!
//! 借助 LLM 生成课程主题层级和练习题，并写入关系型存储
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有存储资源，只暴露表级能力
//! - `Store` - 存储能力（upsert / insert / update / delete / 子节点查询）
//! - `SupabaseStore` - PostgREST 实现，`MemoryStore` - 进程内实现
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `GenerationClient` - 文本生成能力（`LlmService` / `MockLlmClient`）
//! - `schema_mapper` - 响应解析与记录映射
//! - `HierarchyInserter` - 主题层级写入
//! - `QuestionInserter` - 题目及选项/答案写入
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个叶子主题"的完整处理流程
//! - `TopicCtx` - 上下文封装（序号 + 主题）
//! - `TopicFlow` - 流程编排（prompt → generate → map → insert）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/course_generator` - 结构分析、层级写入、逐个叶子主题出题、汇总
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, StorageBackend};
pub use error::{AppError, AppResult};
pub use infrastructure::{MemoryStore, Store, SupabaseStore};
pub use orchestrator::{CourseGenerator, CourseSummary, GenerationOptions};
pub use services::{GenerationClient, LlmService, MockLlmClient};
pub use workflow::{TopicCtx, TopicFlow};
