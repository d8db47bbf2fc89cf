//! LLM 返回的 JSON 结构
//!
//! 这里只描述模型输出的形状，字段默认值和校验在 `services::schema_mapper` 中处理。
//! 未声明的字段通过 `extra` 原样保留，之后写入记录的 metadata。

use serde::{Deserialize, Deserializer, Serialize};

use super::{Metadata, QuestionType};

/// 字段缺失或显式为 null 时都取默认值
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 课程结构分析结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseStructure {
    /// 学科分析（可选）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Metadata>,
    pub structure: StructureBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureBody {
    pub main_categories: Vec<CategoryDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub subcategories: Vec<SubcategoryDraft>,
    #[serde(flatten)]
    pub extra: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcategoryDraft {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub leaf_topics: Vec<LeafTopicDraft>,
    #[serde(flatten)]
    pub extra: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafTopicDraft {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(flatten)]
    pub extra: Metadata,
}

impl LeafTopicDraft {
    /// `question_strategy` 中各题型计划数量之和
    pub fn planned_questions(&self) -> u64 {
        self.extra
            .get("question_strategy")
            .and_then(|v| v.as_object())
            .map(|strategy| {
                strategy
                    .values()
                    .filter_map(|n| n.as_u64())
                    .fold(0u64, u64::saturating_add)
            })
            .unwrap_or(0)
    }
}

impl CourseStructure {
    /// 结构中所有节点数量（不含根节点）
    pub fn node_count(&self) -> usize {
        self.structure
            .main_categories
            .iter()
            .map(|c| {
                1 + c
                    .subcategories
                    .iter()
                    .map(|s| 1 + s.leaf_topics.len())
                    .sum::<usize>()
            })
            .sum()
    }

    pub fn leaf_count(&self) -> usize {
        self.structure
            .main_categories
            .iter()
            .flat_map(|c| c.subcategories.iter())
            .map(|s| s.leaf_topics.len())
            .sum()
    }
}

/// 单道题目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub question_text: String,
    pub question_type: QuestionType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<ChoiceDraft>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<Vec<AnswerDraft>>,
    #[serde(flatten)]
    pub extra: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceDraft {
    pub text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerDraft {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_case_sensitive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_exact_match: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}
