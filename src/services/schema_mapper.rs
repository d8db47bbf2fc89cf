//! 响应解析与记录映射 - 业务能力层
//!
//! 把模型返回的文本解析为课程结构或题目列表，并补齐可选字段的默认值。
//! 只做映射和告警，不修复数据：选项数量等约束由调用方负责。

use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::warn;
use uuid::Uuid;

use crate::error::MalformedResponseError;
use crate::models::{
    AnswerDraft, AnswerKind, ChoiceDraft, CourseStructure, Metadata, NewChoice, NewCorrectAnswer,
    NewQuestion, QuestionDraft, QuestionType,
};

pub const DEFAULT_POINTS: u32 = 1;
pub const DEFAULT_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;
pub const DEFAULT_CASE_SENSITIVE: bool = false;
pub const DEFAULT_EXACT_MATCH: bool = true;

/// 映射后的单个选项（尚未关联 question_id）
#[derive(Debug, Clone, PartialEq)]
pub struct MappedChoice {
    pub choice_text: String,
    pub is_correct: bool,
}

/// 映射后的单个标准答案（尚未关联 question_id）
#[derive(Debug, Clone, PartialEq)]
pub struct MappedAnswer {
    pub answer_text: String,
    pub is_case_sensitive: bool,
    pub is_exact_match: bool,
    pub points: u32,
}

/// 题目挂载的答案集合
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerSet {
    Choices(Vec<MappedChoice>),
    CorrectAnswers(Vec<MappedAnswer>),
}

impl AnswerSet {
    pub fn len(&self) -> usize {
        match self {
            AnswerSet::Choices(c) => c.len(),
            AnswerSet::CorrectAnswers(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 映射完成、可以直接落库的题目
#[derive(Debug, Clone, PartialEq)]
pub struct MappedQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    pub explanation: String,
    pub points: u32,
    pub difficulty_level: u8,
    pub metadata: Option<Metadata>,
    pub answers: AnswerSet,
}

impl MappedQuestion {
    /// questions 表记录
    pub fn to_row(&self, topic_id: Uuid) -> NewQuestion {
        NewQuestion {
            topic_id,
            question_text: self.question_text.clone(),
            question_type: self.question_type.clone(),
            explanation: self.explanation.clone(),
            points: self.points,
            difficulty_level: self.difficulty_level,
            metadata: self.metadata.clone(),
        }
    }

    /// choices 表记录，sort_order 为声明顺序
    pub fn choice_rows(&self, question_id: Uuid) -> Vec<NewChoice> {
        match &self.answers {
            AnswerSet::Choices(choices) => choices
                .iter()
                .enumerate()
                .map(|(i, c)| NewChoice {
                    question_id,
                    choice_text: c.choice_text.clone(),
                    is_correct: c.is_correct,
                    sort_order: i as u32,
                })
                .collect(),
            AnswerSet::CorrectAnswers(_) => Vec::new(),
        }
    }

    /// correct_answers 表记录，sort_order 为声明顺序
    pub fn answer_rows(&self, question_id: Uuid) -> Vec<NewCorrectAnswer> {
        match &self.answers {
            AnswerSet::CorrectAnswers(answers) => answers
                .iter()
                .enumerate()
                .map(|(i, a)| NewCorrectAnswer {
                    question_id,
                    answer_text: a.answer_text.clone(),
                    is_case_sensitive: a.is_case_sensitive,
                    is_exact_match: a.is_exact_match,
                    points: a.points,
                    sort_order: i as u32,
                })
                .collect(),
            AnswerSet::Choices(_) => Vec::new(),
        }
    }
}

// ========== 解析 ==========

fn code_fence() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?```$").ok())
        .as_ref()
}

/// 去掉 Markdown 代码块包裹
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    code_fence()
        .and_then(|fence| fence.captures(trimmed))
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str().trim())
}

fn preview(text: &str) -> String {
    crate::utils::logging::truncate_text(text.trim(), 60)
}

fn parse_json(text: &str) -> Result<JsonValue, MalformedResponseError> {
    serde_json::from_str(strip_code_fence(text)).map_err(|source| MalformedResponseError::InvalidJson {
        preview: preview(text),
        source,
    })
}

fn shape<T: DeserializeOwned>(value: JsonValue, expected: &'static str) -> Result<T, MalformedResponseError> {
    serde_json::from_value(value).map_err(|source| MalformedResponseError::ShapeMismatch { expected, source })
}

/// 解析课程结构响应
pub fn parse_structure(text: &str) -> Result<CourseStructure, MalformedResponseError> {
    shape(parse_json(text)?, "课程结构 {structure: {main_categories: [...]}}")
}

/// 解析题目响应并映射为可落库的题目
///
/// 接受题目数组，或 `{"questions": [...]}` 包裹的数组。
pub fn parse_question_batch(text: &str, write_metadata: bool) -> Result<Vec<MappedQuestion>, MalformedResponseError> {
    let value = match parse_json(text)? {
        JsonValue::Object(mut map) if map.contains_key("questions") => map.remove("questions").unwrap_or_default(),
        other => other,
    };
    let drafts: Vec<QuestionDraft> = shape(value, "题目数组 [{question_text, question_type, ...}]")?;

    if drafts.is_empty() {
        return Err(MalformedResponseError::EmptyBatch);
    }

    drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| map_question(index, draft, write_metadata))
        .collect()
}

// ========== 映射 ==========

fn to_points(value: Option<i64>) -> u32 {
    value
        .and_then(|p| u32::try_from(p).ok())
        .unwrap_or(DEFAULT_POINTS)
}

fn to_difficulty(index: usize, value: Option<i64>) -> u8 {
    match value {
        None => DEFAULT_DIFFICULTY,
        Some(level) => {
            let clamped = level.clamp(DEFAULT_DIFFICULTY as i64, MAX_DIFFICULTY as i64) as u8;
            if clamped as i64 != level {
                warn!("第 {} 道题难度 {} 超出 1-5，已调整为 {}", index, level, clamped);
            }
            clamped
        }
    }
}

fn map_choice(draft: ChoiceDraft) -> MappedChoice {
    MappedChoice {
        choice_text: draft.text,
        is_correct: draft.is_correct,
    }
}

fn map_answer(draft: AnswerDraft) -> MappedAnswer {
    MappedAnswer {
        answer_text: draft.text,
        is_case_sensitive: draft.is_case_sensitive.unwrap_or(DEFAULT_CASE_SENSITIVE),
        is_exact_match: draft.is_exact_match.unwrap_or(DEFAULT_EXACT_MATCH),
        points: to_points(draft.points),
    }
}

/// 把一道题的草稿映射为落库记录
pub fn map_question(index: usize, draft: QuestionDraft, write_metadata: bool) -> Result<MappedQuestion, MalformedResponseError> {
    let kind = draft
        .question_type
        .answer_kind()
        .ok_or_else(|| MalformedResponseError::UnsupportedQuestionType {
            index,
            question_type: draft.question_type.to_string(),
        })?;

    let answers = match kind {
        AnswerKind::Choices => {
            if draft.correct_answers.as_ref().is_some_and(|a| !a.is_empty()) {
                warn!("第 {} 道题 ({}) 带有 correct_answers，已忽略", index, draft.question_type);
            }
            AnswerSet::Choices(draft.choices.unwrap_or_default().into_iter().map(map_choice).collect())
        }
        AnswerKind::CorrectAnswers => {
            if draft.choices.as_ref().is_some_and(|c| !c.is_empty()) {
                warn!("第 {} 道题 ({}) 带有 choices，已忽略", index, draft.question_type);
            }
            AnswerSet::CorrectAnswers(
                draft.correct_answers.unwrap_or_default().into_iter().map(map_answer).collect(),
            )
        }
    };

    let mapped = MappedQuestion {
        difficulty_level: to_difficulty(index, draft.difficulty_level),
        points: to_points(draft.points),
        question_text: draft.question_text,
        question_type: draft.question_type,
        explanation: draft.explanation,
        metadata: (write_metadata && !draft.extra.is_empty()).then_some(draft.extra),
        answers,
    };

    for warning in validate(&mapped) {
        warn!("第 {} 道题: {}", index, warning);
    }

    Ok(mapped)
}

/// 检查选项约束，只返回告警信息，不修改数据
pub fn validate(question: &MappedQuestion) -> Vec<String> {
    let mut warnings = Vec::new();
    match (&question.question_type, &question.answers) {
        (QuestionType::TrueFalse, AnswerSet::Choices(choices)) if choices.len() != 2 => {
            warnings.push(format!("判断题应有 2 个选项，实际 {} 个", choices.len()));
        }
        (QuestionType::MultipleChoice | QuestionType::SingleChoice, AnswerSet::Choices(choices)) => {
            let correct = choices.iter().filter(|c| c.is_correct).count();
            if correct != 1 {
                warnings.push(format!("选择题应恰有 1 个正确选项，实际 {} 个", correct));
            }
        }
        _ => {}
    }
    if question.answers.is_empty() {
        warnings.push(format!("{} 题没有任何选项或答案", question.question_type));
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_are_filled() {
        let text = json!([
            {
                "question_text": "Capital of Finland?",
                "question_type": "fill_in_blank",
                "correct_answers": [{"text": "Helsinki"}]
            }
        ])
        .to_string();

        let batch = parse_question_batch(&text, true).unwrap();
        let q = &batch[0];
        assert_eq!(q.points, DEFAULT_POINTS);
        assert_eq!(q.difficulty_level, DEFAULT_DIFFICULTY);
        assert_eq!(q.explanation, "");
        assert_eq!(q.metadata, None);

        let rows = q.answer_rows(Uuid::nil());
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].is_case_sensitive);
        assert!(rows[0].is_exact_match);
        assert_eq!(rows[0].points, DEFAULT_POINTS);
        assert_eq!(rows[0].sort_order, 0);
        assert!(q.choice_rows(Uuid::nil()).is_empty());
    }

    #[test]
    fn test_null_fields_fall_back_to_defaults() {
        let text = json!([
            {
                "question_text": "Helsinki is the capital of Finland.",
                "question_type": "true_false",
                "explanation": null,
                "choices": [
                    {"text": "True", "is_correct": true},
                    {"text": "False", "is_correct": null}
                ]
            }
        ])
        .to_string();

        let batch = parse_question_batch(&text, true).unwrap();
        assert_eq!(batch[0].explanation, "");
        let rows = batch[0].choice_rows(Uuid::nil());
        assert!(rows[0].is_correct);
        assert!(!rows[1].is_correct);

        let text = json!({
            "structure": {"main_categories": [{
                "name": "Verbs", "description": null,
                "subcategories": [{"name": "Past", "description": null, "leaf_topics": [{"name": "Imperfekt", "description": null}]}]
            }]}
        })
        .to_string();
        let structure = parse_structure(&text).unwrap();
        let category = &structure.structure.main_categories[0];
        assert_eq!(category.description, "");
        assert_eq!(category.subcategories[0].leaf_topics[0].description, "");
    }

    #[test]
    fn test_not_json_is_invalid_json() {
        let err = parse_question_batch("not json", true).unwrap_err();
        assert!(matches!(err, MalformedResponseError::InvalidJson { .. }));
    }

    #[test]
    fn test_missing_question_text_is_shape_mismatch() {
        let text = r#"[{"question_type": "true_false", "choices": []}]"#;
        let err = parse_question_batch(text, true).unwrap_err();
        assert!(matches!(err, MalformedResponseError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_empty_batch() {
        assert!(matches!(
            parse_question_batch("[]", true),
            Err(MalformedResponseError::EmptyBatch)
        ));
    }

    #[test]
    fn test_unsupported_type_fails_clearly() {
        let text = r#"[{"question_text": "Discuss.", "question_type": "essay"}]"#;
        let err = parse_question_batch(text, true).unwrap_err();
        assert!(matches!(
            err,
            MalformedResponseError::UnsupportedQuestionType { index: 0, ref question_type } if question_type == "essay"
        ));

        let text = r#"[{"question_text": "?", "question_type": "hotspot"}]"#;
        assert!(matches!(
            parse_question_batch(text, true),
            Err(MalformedResponseError::UnsupportedQuestionType { .. })
        ));
    }

    #[test]
    fn test_code_fence_and_wrapper_object() {
        let text = "```json\n{\"questions\": [{\"question_text\": \"Q\", \"question_type\": \"true_false\", \"choices\": [{\"text\": \"True\", \"is_correct\": true}, {\"text\": \"False\", \"is_correct\": false}]}]}\n```";
        let batch = parse_question_batch(text, true).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].answers.len(), 2);
    }

    #[test]
    fn test_true_false_with_one_choice_is_not_repaired() {
        let text = r#"[{"question_text": "Sky is blue.", "question_type": "true_false", "choices": [{"text": "True", "is_correct": true}]}]"#;
        let batch = parse_question_batch(text, true).unwrap();
        let rows = batch[0].choice_rows(Uuid::nil());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].choice_text, "True");
        assert_eq!(validate(&batch[0]).len(), 1);
    }

    #[test]
    fn test_dispatch_ignores_foreign_answer_list() {
        let text = json!([{
            "question_text": "Pick one",
            "question_type": "multiple_choice",
            "choices": [
                {"text": "a", "is_correct": false},
                {"text": "b", "is_correct": true},
                {"text": "c", "is_correct": false}
            ],
            "correct_answers": [{"text": "b"}],
            "cognitive_level": "recall"
        }])
        .to_string();
        let batch = parse_question_batch(&text, true).unwrap();
        let rows = batch[0].choice_rows(Uuid::nil());
        assert_eq!(rows.iter().map(|r| r.sort_order).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(batch[0].answer_rows(Uuid::nil()).is_empty());
        assert_eq!(
            batch[0].metadata.as_ref().and_then(|m| m.get("cognitive_level")),
            Some(&json!("recall"))
        );
        assert!(validate(&batch[0]).is_empty());

        let without_metadata = parse_question_batch(&text, false).unwrap();
        assert_eq!(without_metadata[0].metadata, None);
    }

    #[test]
    fn test_difficulty_is_clamped() {
        let text = r#"[{"question_text": "Q", "question_type": "short_answer", "difficulty_level": 9, "points": -2, "correct_answers": [{"text": "A"}]}]"#;
        let batch = parse_question_batch(text, true).unwrap();
        assert_eq!(batch[0].difficulty_level, MAX_DIFFICULTY);
        assert_eq!(batch[0].points, DEFAULT_POINTS);
    }

    #[test]
    fn test_parse_structure() {
        let text = json!({
            "analysis": {"subject_area": "Languages"},
            "structure": {"main_categories": [{
                "name": "Verbs", "description": "d",
                "subcategories": [{"name": "Past", "description": "d", "leaf_topics": [{"name": "Imperfekt", "description": "d"}]}]
            }]}
        })
        .to_string();
        let structure = parse_structure(&text).unwrap();
        assert_eq!(structure.leaf_count(), 1);
        assert!(structure.analysis.is_some());

        assert!(matches!(
            parse_structure(r#"{"main_categories": []}"#),
            Err(MalformedResponseError::ShapeMismatch { .. })
        ));
    }
}
