//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责整次运行的流程调度和统计，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! course_generator (学习目标 → 课程树 → Vec<Topic>)
//!     ↓
//! workflow::TopicFlow (处理单个叶子主题)
//!     ↓
//! services (能力层：generate / map / insert)
//!     ↓
//! infrastructure (基础设施：Store)
//! ```
//!
//! ## 设计原则
//!
//! 1. **失败隔离**：叶子主题级别的失败不影响整次运行
//! 2. **向下依赖**：编排层 → workflow → services → infrastructure
//! 3. **无业务逻辑**：只做调度和统计，不解析响应也不拼装记录

pub mod course_generator;

// 重新导出主要类型
pub use course_generator::{CourseGenerator, CourseSummary, GenerationOptions, GenerationPhase};
