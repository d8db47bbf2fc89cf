//! 确定性的 LLM 替身
//!
//! 按 prompt 中的标记短语识别请求类型，返回预置的课程结构或题目。
//! 不发起任何网络请求，输出只取决于 prompt 内容和预先设置的覆盖项。

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use super::generation::{GenerationClient, GenerationParams};
use super::prompts::{
    extract_quoted, FULL_QUESTIONS_PER_TOPIC, LEARNING_GOAL_PREFIX, QUESTION_MARKER,
    REDUCED_QUESTIONS_PER_TOPIC, REDUCED_STRATEGY, STRUCTURE_MARKER, TOPIC_NAME_PREFIX,
};
use crate::error::GenerationError;

/// 完整模式下替身返回的题目数
const MOCK_FULL_BATCH: usize = 12;

/// 关键词对应的题库类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Language,
    Programming,
    Business,
    Generic,
}

impl Domain {
    fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&["finnish", "suomi", "language", "grammar"]) {
            Domain::Language
        } else if has(&["python", "programming", "coding", "code"]) {
            Domain::Programming
        } else if has(&["marketing", "business"]) {
            Domain::Business
        } else {
            Domain::Generic
        }
    }
}

/// 确定性的 LLM 替身
#[derive(Default)]
pub struct MockLlmClient {
    structure_override: Option<String>,
    question_overrides: HashMap<String, String>,
    failing_topics: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 结构分析请求直接返回给定文本
    pub fn with_structure_response(mut self, text: impl Into<String>) -> Self {
        self.structure_override = Some(text.into());
        self
    }

    /// 指定主题的出题请求直接返回给定文本
    pub fn with_question_response(mut self, topic_name: impl Into<String>, text: impl Into<String>) -> Self {
        self.question_overrides.insert(topic_name.into(), text.into());
        self
    }

    /// 指定主题的出题请求以服务错误失败
    pub fn with_failing_topic(mut self, topic_name: impl Into<String>) -> Self {
        self.failing_topics.push(topic_name.into());
        self
    }

    /// 迄今收到的全部 prompt
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn record(&self, prompt: &str) {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
    }

    fn respond_structure(&self, prompt: &str) -> String {
        if let Some(text) = &self.structure_override {
            return text.clone();
        }
        let goal = extract_quoted(prompt, LEARNING_GOAL_PREFIX).unwrap_or_else(|| "Sample Topic".to_string());
        let structure = match Domain::detect(&goal) {
            Domain::Language => language_structure(),
            Domain::Programming => programming_structure(),
            Domain::Business => business_structure(),
            Domain::Generic => generic_structure(&goal),
        };
        pretty(&structure)
    }

    fn respond_questions(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError> {
        let topic = extract_quoted(prompt, TOPIC_NAME_PREFIX).unwrap_or_else(|| "Sample Topic".to_string());

        if self.failing_topics.contains(&topic) {
            return Err(GenerationError::ApiCallFailed {
                model: params.model.clone(),
                source: format!("模拟服务故障: {}", topic).into(),
            });
        }
        if let Some(text) = self.question_overrides.get(&topic) {
            return Ok(text.clone());
        }

        let count = if prompt.contains(REDUCED_STRATEGY) {
            REDUCED_QUESTIONS_PER_TOPIC
        } else {
            MOCK_FULL_BATCH.min(FULL_QUESTIONS_PER_TOPIC)
        };
        Ok(pretty(&JsonValue::Array(sample_questions(&topic, count))))
    }
}

#[async_trait]
impl GenerationClient for MockLlmClient {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError> {
        self.record(prompt);

        if prompt.contains(STRUCTURE_MARKER) {
            debug!("模拟 LLM: 结构分析请求");
            Ok(self.respond_structure(prompt))
        } else if prompt.contains(QUESTION_MARKER) {
            debug!("模拟 LLM: 出题请求");
            self.respond_questions(prompt, params)
        } else {
            Ok(r#"{"error": "Unknown request type"}"#.to_string())
        }
    }
}

fn pretty(value: &JsonValue) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

// ========== 预置课程结构 ==========

fn leaf(name: &str, description: &str, concepts: &[&str], strategy: [u64; 4]) -> JsonValue {
    json!({
        "name": name,
        "description": description,
        "key_concepts": concepts,
        "question_strategy": {
            "multiple_choice": strategy[0],
            "fill_in_blank": strategy[1],
            "short_answer": strategy[2],
            "true_false": strategy[3]
        }
    })
}

fn language_structure() -> JsonValue {
    json!({
        "analysis": {
            "subject_area": "Finnish Language Learning",
            "complexity_level": "Intermediate (B1 level)",
            "learning_objectives": [
                "Master Finnish verb conjugation patterns",
                "Understand case system usage in context"
            ],
            "prerequisites": ["Basic Finnish vocabulary (A2 level)"],
            "estimated_study_hours": "60-80 hours"
        },
        "structure": {"main_categories": [
            {
                "name": "Verb System Mastery",
                "description": "Complete understanding of Finnish verb conjugation across all tenses and moods",
                "learning_outcomes": ["Conjugate verbs in all tenses"],
                "subcategories": [{
                    "name": "Past Tense Forms",
                    "description": "Master imperfekt and perfekt formations",
                    "prerequisites": ["Present tense conjugation"],
                    "leaf_topics": [leaf(
                        "Weak Grade Alternation in Past Tense",
                        "Understanding consonant gradation in past tense formation",
                        &["Consonant gradation rules", "Past tense markers"],
                        [30, 35, 20, 15]
                    )]
                }]
            },
            {
                "name": "Case System Application",
                "description": "Practical usage of Finnish cases in real communication",
                "learning_outcomes": ["Choose correct cases in context"],
                "subcategories": [{
                    "name": "Locative Cases",
                    "description": "Mastering inessive, elative, illative, adessive, ablative, allative",
                    "prerequisites": ["Basic case understanding"],
                    "leaf_topics": [leaf(
                        "Movement vs Location Cases",
                        "Distinguishing when to use movement vs static location cases",
                        &["Static location", "Movement to", "Movement from"],
                        [25, 40, 25, 10]
                    )]
                }]
            }
        ]}
    })
}

fn programming_structure() -> JsonValue {
    json!({
        "analysis": {
            "subject_area": "Computer Programming - Python",
            "complexity_level": "Beginner to Intermediate",
            "learning_objectives": ["Write clean, readable Python code"],
            "prerequisites": ["Basic computer literacy"],
            "estimated_study_hours": "40-60 hours"
        },
        "structure": {"main_categories": [{
            "name": "Python Fundamentals",
            "description": "Core Python syntax and basic programming concepts",
            "learning_outcomes": ["Write basic Python programs"],
            "subcategories": [{
                "name": "Data Types and Variables",
                "description": "Understanding Python's built-in data types",
                "leaf_topics": [
                    leaf(
                        "String Manipulation Methods",
                        "Master built-in string methods for text processing",
                        &["String methods", "String slicing"],
                        [30, 25, 30, 15]
                    ),
                    leaf(
                        "List Operations in Python",
                        "Create, slice and mutate Python lists",
                        &["Indexing", "Mutability", "Comprehensions"],
                        [35, 20, 25, 20]
                    )
                ]
            }]
        }]}
    })
}

fn business_structure() -> JsonValue {
    json!({
        "analysis": {
            "subject_area": "Business - Marketing",
            "complexity_level": "Intermediate",
            "learning_objectives": ["Plan a multi-channel campaign"],
            "prerequisites": ["Basic business vocabulary"],
            "estimated_study_hours": "30-40 hours"
        },
        "structure": {"main_categories": [{
            "name": "Marketing Foundations",
            "description": "Core frameworks for understanding markets and customers",
            "subcategories": [{
                "name": "Market Research",
                "description": "Collecting and interpreting customer data",
                "leaf_topics": [leaf(
                    "Customer Segmentation Basics",
                    "Grouping customers by shared characteristics",
                    &["Demographics", "Psychographics"],
                    [30, 20, 30, 20]
                )]
            }]
        }]}
    })
}

fn generic_structure(topic: &str) -> JsonValue {
    json!({
        "analysis": {
            "subject_area": "General Knowledge",
            "complexity_level": "Intermediate",
            "learning_objectives": [format!("Understand key concepts in {}", topic)],
            "prerequisites": ["Basic foundational knowledge"],
            "estimated_study_hours": "20-30 hours"
        },
        "structure": {"main_categories": [{
            "name": format!("Core {} Concepts", topic),
            "description": format!("Fundamental principles and ideas in {}", topic),
            "subcategories": [{
                "name": format!("Basic {} Principles", topic),
                "description": format!("Understanding the foundation of {}", topic),
                "leaf_topics": [leaf(
                    &format!("Introduction to {}", topic),
                    &format!("Basic understanding of what {} encompasses", topic),
                    &["Core principles", "Key terminology"],
                    [30, 20, 25, 25]
                )]
            }]
        }]}
    })
}

// ========== 预置题目 ==========

/// 精简模式的固定题型配比：2 道单选、1 道判断、2 道填空
const REDUCED_MIX: [&str; REDUCED_QUESTIONS_PER_TOPIC] = [
    "multiple_choice",
    "multiple_choice",
    "true_false",
    "fill_in_blank",
    "fill_in_blank",
];

const FULL_MIX: [&str; 4] = ["multiple_choice", "true_false", "short_answer", "fill_in_blank"];

fn multiple_choice_bank(domain: Domain, topic: &str) -> Vec<(String, [(&'static str, bool); 4])> {
    match domain {
        Domain::Language => vec![
            (
                "What is the correct past tense form of 'antaa' (to give) in first person singular?".to_string(),
                [("annoin", true), ("annan", false), ("antaisin", false), ("olen antanut", false)],
            ),
            (
                "Which case is used with the postposition 'kanssa' (with)?".to_string(),
                [("Genetiivi", true), ("Partitiivi", false), ("Inessiivi", false), ("Adessiivi", false)],
            ),
        ],
        Domain::Programming => vec![
            (
                "Which method removes whitespace from both ends of a string?".to_string(),
                [("strip()", true), ("remove()", false), ("trim()", false), ("clean()", false)],
            ),
            (
                "What does the len() function return for a string?".to_string(),
                [("Number of characters", true), ("Memory size", false), ("ASCII values", false), ("Number of words", false)],
            ),
        ],
        Domain::Business | Domain::Generic => vec![(
            format!("What is a key characteristic of {}?", topic),
            [
                ("It follows established principles", true),
                ("It ignores basic rules", false),
                ("It has no structure", false),
                ("It cannot be learned", false),
            ],
        )],
    }
}

fn true_false_bank(domain: Domain, topic: &str) -> Vec<(String, bool)> {
    match domain {
        Domain::Language => vec![
            ("The Finnish language has exactly 15 grammatical cases.".to_string(), false),
            ("Consonant gradation affects the stem of Finnish words.".to_string(), true),
        ],
        Domain::Programming => vec![
            ("Python lists are mutable data structures.".to_string(), true),
            ("Strings in Python can be modified after creation.".to_string(), false),
        ],
        Domain::Business | Domain::Generic => vec![(format!("{} requires careful study to master.", topic), true)],
    }
}

fn open_bank(domain: Domain, topic: &str, fill_in: bool) -> Vec<(String, String)> {
    match (domain, fill_in) {
        (Domain::Language, true) => vec![
            ("The Finnish sentence 'Minä _____ kouluun' uses the verb 'mennä' in present tense.".to_string(), "menen".to_string()),
            ("The inessive ending in 'talo___' (in the house) is ____.".to_string(), "-ssa".to_string()),
        ],
        (Domain::Language, false) => vec![
            ("Explain when to use the partitive case in Finnish.".to_string(), "For partial or indefinite quantities".to_string()),
        ],
        (Domain::Programming, true) => vec![
            ("To create an empty list in Python, you write: my_list = ____".to_string(), "[]".to_string()),
            ("The _____ function converts a string to an integer in Python.".to_string(), "int".to_string()),
        ],
        (Domain::Programming, false) => vec![
            ("Explain the difference between a list and a tuple in Python.".to_string(), "Lists are mutable, tuples are not".to_string()),
        ],
        (_, true) => vec![(format!("The most important aspect of {} is ____.", topic), "its core principles".to_string())],
        (_, false) => vec![(format!("Explain the main purpose of studying {}.", topic), "To understand its core principles".to_string())],
    }
}

/// 为主题生成确定性的题目列表
fn sample_questions(topic: &str, count: usize) -> Vec<JsonValue> {
    let domain = Domain::detect(topic);
    let mc = multiple_choice_bank(domain, topic);
    let tf = true_false_bank(domain, topic);
    let fill = open_bank(domain, topic, true);
    let short = open_bank(domain, topic, false);

    (0..count)
        .map(|i| {
            let question_type = if count == REDUCED_QUESTIONS_PER_TOPIC {
                REDUCED_MIX[i]
            } else {
                FULL_MIX[i % FULL_MIX.len()]
            };
            let difficulty = (i % 4 + 1) as u64;
            match question_type {
                "multiple_choice" => {
                    let (text, choices) = &mc[i % mc.len()];
                    json!({
                        "question_text": text,
                        "question_type": question_type,
                        "explanation": format!("This tests understanding of {} concepts.", topic),
                        "difficulty_level": difficulty,
                        "points": 1 + (i % 2) as u64,
                        "cognitive_level": "understanding",
                        "key_concept": format!("{} fundamentals", topic),
                        "choices": choices
                            .iter()
                            .map(|(text, is_correct)| json!({"text": text, "is_correct": is_correct}))
                            .collect::<Vec<_>>()
                    })
                }
                "true_false" => {
                    let (statement, answer) = &tf[i % tf.len()];
                    json!({
                        "question_text": statement,
                        "question_type": question_type,
                        "explanation": format!("This statement tests knowledge of {}.", topic),
                        "difficulty_level": difficulty.min(3),
                        "points": 1,
                        "cognitive_level": "recall",
                        "key_concept": format!("{} facts", topic),
                        "choices": [
                            {"text": "True", "is_correct": *answer},
                            {"text": "False", "is_correct": !*answer}
                        ]
                    })
                }
                _ => {
                    let bank = if question_type == "fill_in_blank" { &fill } else { &short };
                    let (text, answer) = &bank[i % bank.len()];
                    json!({
                        "question_text": text,
                        "question_type": question_type,
                        "explanation": format!("This requires application of {} knowledge.", topic),
                        "difficulty_level": difficulty.max(2),
                        "points": 2,
                        "cognitive_level": "application",
                        "key_concept": format!("{} application", topic),
                        "correct_answers": [
                            {"text": answer, "is_case_sensitive": false, "is_exact_match": question_type == "fill_in_blank", "points": 2}
                        ]
                    })
                }
            }
        })
        .collect()
}
