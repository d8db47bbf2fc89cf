//! 题目及其选项 / 标准答案记录

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Metadata;

/// 题型
///
/// 保持开放：未知标签落入 `Other`，不会在反序列化时失败。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    MultipleChoice,
    SingleChoice,
    TrueFalse,
    ShortAnswer,
    FillInBlank,
    Essay,
    Matching,
    Ordering,
    Other(String),
}

/// 题目挂载的答案形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    /// 写入 choices 表
    Choices,
    /// 写入 correct_answers 表
    CorrectAnswers,
}

impl QuestionType {
    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::SingleChoice => "single_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::FillInBlank => "fill_in_blank",
            QuestionType::Essay => "essay",
            QuestionType::Matching => "matching",
            QuestionType::Ordering => "ordering",
            QuestionType::Other(tag) => tag,
        }
    }

    /// 当前流水线能落库的题型及其答案形式；其余返回 `None`
    pub fn answer_kind(&self) -> Option<AnswerKind> {
        match self {
            QuestionType::MultipleChoice | QuestionType::SingleChoice | QuestionType::TrueFalse => {
                Some(AnswerKind::Choices)
            }
            QuestionType::ShortAnswer | QuestionType::FillInBlank => Some(AnswerKind::CorrectAnswers),
            QuestionType::Essay
            | QuestionType::Matching
            | QuestionType::Ordering
            | QuestionType::Other(_) => None,
        }
    }
}

impl From<String> for QuestionType {
    fn from(tag: String) -> Self {
        match tag.trim() {
            "multiple_choice" => QuestionType::MultipleChoice,
            "single_choice" => QuestionType::SingleChoice,
            "true_false" => QuestionType::TrueFalse,
            "short_answer" => QuestionType::ShortAnswer,
            "fill_in_blank" => QuestionType::FillInBlank,
            "essay" => QuestionType::Essay,
            "matching" => QuestionType::Matching,
            "ordering" => QuestionType::Ordering,
            _ => QuestionType::Other(tag),
        }
    }
}

impl From<QuestionType> for String {
    fn from(question_type: QuestionType) -> Self {
        question_type.as_str().to_string()
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已落库的题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub explanation: String,
    pub points: u32,
    pub difficulty_level: u8,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

/// 待写入的题目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewQuestion {
    pub topic_id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub explanation: String,
    pub points: u32,
    pub difficulty_level: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// 已落库的选项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub id: Uuid,
    pub question_id: Uuid,
    pub choice_text: String,
    pub is_correct: bool,
    pub sort_order: u32,
}

/// 待写入的选项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewChoice {
    pub question_id: Uuid,
    pub choice_text: String,
    pub is_correct: bool,
    pub sort_order: u32,
}

/// 已落库的标准答案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectAnswer {
    pub id: Uuid,
    pub question_id: Uuid,
    pub answer_text: String,
    pub is_case_sensitive: bool,
    pub is_exact_match: bool,
    pub points: u32,
    pub sort_order: u32,
}

/// 待写入的标准答案
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCorrectAnswer {
    pub question_id: Uuid,
    pub answer_text: String,
    pub is_case_sensitive: bool,
    pub is_exact_match: bool,
    pub points: u32,
    pub sort_order: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_type_keeps_unknown_tags() {
        let parsed: QuestionType = serde_json::from_str("\"drag_and_drop\"").unwrap();
        assert_eq!(parsed, QuestionType::Other("drag_and_drop".to_string()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"drag_and_drop\"");
        assert_eq!(parsed.answer_kind(), None);
    }

    #[test]
    fn test_answer_kind_dispatch() {
        assert_eq!(QuestionType::MultipleChoice.answer_kind(), Some(AnswerKind::Choices));
        assert_eq!(QuestionType::TrueFalse.answer_kind(), Some(AnswerKind::Choices));
        assert_eq!(QuestionType::FillInBlank.answer_kind(), Some(AnswerKind::CorrectAnswers));
        assert_eq!(QuestionType::ShortAnswer.answer_kind(), Some(AnswerKind::CorrectAnswers));
        assert_eq!(QuestionType::Essay.answer_kind(), None);
        assert_eq!(QuestionType::Ordering.answer_kind(), None);
    }
}
