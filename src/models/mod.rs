pub mod payload;
pub mod question;
pub mod topic;

/// 自由格式的附加信息（分析、出题策略等），与核心字段分开存放
pub type Metadata = std::collections::BTreeMap<String, serde_json::Value>;

pub use payload::{
    AnswerDraft, CategoryDraft, ChoiceDraft, CourseStructure, LeafTopicDraft, QuestionDraft,
    StructureBody, SubcategoryDraft,
};
pub use question::{
    AnswerKind, Choice, CorrectAnswer, NewChoice, NewCorrectAnswer, NewQuestion, Question,
    QuestionType,
};
pub use topic::{slugify, NewTopic, Topic};
