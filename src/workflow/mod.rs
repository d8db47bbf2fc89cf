//! 流程层 - 定义"一个叶子主题"的完整处理流程

pub mod topic_ctx;
pub mod topic_flow;

pub use topic_ctx::TopicCtx;
pub use topic_flow::TopicFlow;
