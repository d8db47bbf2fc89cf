//! Prompt 构建
//!
//! 标记短语同时被 [`MockLlmClient`](super::MockLlmClient) 用来识别请求类型，修改时需保持一致。

/// 结构分析 prompt 的标记
pub const STRUCTURE_MARKER: &str = "You are an expert educational content architect.";
/// 结构分析 prompt 中学习目标的前缀（后接带引号的目标）
pub const LEARNING_GOAL_PREFIX: &str = "Analyze this learning goal: \"";
/// 出题 prompt 的标记
pub const QUESTION_MARKER: &str = "You are an expert question designer";
/// 出题 prompt 中主题名的前缀（后接带引号的主题名）
pub const TOPIC_NAME_PREFIX: &str = "creating assessment items for: \"";
/// 精简模式下的出题策略短语
pub const REDUCED_STRATEGY: &str = "Generate 5 high-quality questions that cover the most essential concepts";

/// 精简模式每个叶子主题的题目数
pub const REDUCED_QUESTIONS_PER_TOPIC: usize = 5;
/// 完整模式每个叶子主题的题目数
pub const FULL_QUESTIONS_PER_TOPIC: usize = 100;

/// 课程结构分析 prompt
pub fn structure_prompt(topic_input: &str) -> String {
    format!(
        r#"{STRUCTURE_MARKER} {LEARNING_GOAL_PREFIX}{topic_input}"

Create a hierarchical learning structure optimized for mastery and retention:
- Main categories should represent major conceptual areas
- Subcategories should break down into teachable units
- Leaf topics should be specific, testable knowledge areas that can be mastered independently
- Each leaf topic should be narrow enough that 50-100 questions can comprehensively test it

Return as JSON in this exact format:
{{
    "analysis": {{
        "subject_area": "Field of study",
        "complexity_level": "Beginner | Intermediate | Advanced",
        "learning_objectives": ["Objective"],
        "prerequisites": ["Prerequisite"],
        "estimated_study_hours": "20-30 hours"
    }},
    "structure": {{
        "main_categories": [
            {{
                "name": "Category Name",
                "description": "Why this category is essential for mastery",
                "learning_outcomes": ["Outcome"],
                "subcategories": [
                    {{
                        "name": "Subcategory Name",
                        "description": "Specific learning focus",
                        "prerequisites": ["Prerequisite"],
                        "leaf_topics": [
                            {{
                                "name": "Specific Topic Name",
                                "description": "Detailed learning objective",
                                "key_concepts": ["Concept"],
                                "question_strategy": {{"multiple_choice": 30, "true_false": 15, "short_answer": 20, "fill_in_blank": 35}}
                            }}
                        ]
                    }}
                ]
            }}
        ]
    }}
}}

Return only the JSON document."#
    )
}

/// 叶子主题出题 prompt
pub fn question_prompt(topic_name: &str, topic_description: &str, reduced_volume: bool) -> String {
    let strategy = if reduced_volume {
        REDUCED_STRATEGY.to_string()
    } else {
        format!(
            "Generate {} comprehensive questions with varied types",
            FULL_QUESTIONS_PER_TOPIC
        )
    };

    format!(
        r#"{QUESTION_MARKER} {TOPIC_NAME_PREFIX}{topic_name}"

TOPIC CONTEXT:
Description: {topic_description}

GENERATION STRATEGY:
{strategy}

Mix of question types:
- Multiple choice (with 4 options)
- True/False
- Short answer
- Fill-in-blank

QUALITY REQUIREMENTS:
1. COMPREHENSIVE COVERAGE: Questions should test all key concepts
2. COGNITIVE LEVELS: Mix of recall, understanding, application, and analysis
3. REAL-WORLD RELEVANCE: Include practical scenarios
4. CLEAR LANGUAGE: Unambiguous wording
5. APPROPRIATE DIFFICULTY: Balanced progression from basic to challenging
6. NO TRICK QUESTIONS: Fair assessment of genuine knowledge

Return as JSON array with this exact structure:
[
    {{
        "question_text": "Complete question text",
        "question_type": "multiple_choice|true_false|short_answer|fill_in_blank",
        "explanation": "Detailed explanation of the correct answer",
        "difficulty_level": 1,
        "points": 1,
        "choices": [
            {{"text": "Option A", "is_correct": false}},
            {{"text": "Option B", "is_correct": true}},
            {{"text": "Option C", "is_correct": false}},
            {{"text": "Option D", "is_correct": false}}
        ],
        "correct_answers": [
            {{"text": "Expected answer", "is_case_sensitive": false, "is_exact_match": true, "points": 1}}
        ]
    }}
]

IMPORTANT:
- Include "choices" only for multiple_choice and true_false questions
- Include "correct_answers" only for short_answer and fill_in_blank questions
- For true_false, use exactly 2 choices: True and False
- difficulty_level is 1-5, points is 1-3
- Return only the JSON array."#
    )
}

/// 从 prompt 中提取 `prefix` 之后、下一个引号之前的内容
pub fn extract_quoted(prompt: &str, prefix: &str) -> Option<String> {
    let start = prompt.find(prefix)? + prefix.len();
    let len = prompt[start..].find('"')?;
    Some(prompt[start..start + len].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_prompt_round_trips_goal() {
        let prompt = structure_prompt("Finnish B1 Grammar");
        assert!(prompt.contains(STRUCTURE_MARKER));
        assert_eq!(
            extract_quoted(&prompt, LEARNING_GOAL_PREFIX).as_deref(),
            Some("Finnish B1 Grammar")
        );
    }

    #[test]
    fn test_question_prompt_volume() {
        let reduced = question_prompt("Past Tense", "Imperfekt forms", true);
        assert!(reduced.contains(QUESTION_MARKER));
        assert!(reduced.contains(REDUCED_STRATEGY));
        assert_eq!(extract_quoted(&reduced, TOPIC_NAME_PREFIX).as_deref(), Some("Past Tense"));

        let full = question_prompt("Past Tense", "Imperfekt forms", false);
        assert!(!full.contains(REDUCED_STRATEGY));
        assert!(full.contains("Generate 100 comprehensive questions"));
    }

    #[test]
    fn test_extract_quoted_missing_prefix() {
        assert_eq!(extract_quoted("no prefix here", TOPIC_NAME_PREFIX), None);
    }
}
