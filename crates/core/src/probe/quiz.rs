//! The five-question intelligence quiz fed into elections.

use crate::adapter::Adapter;
use crate::error::Result;
use crate::request_context::RequestContext;
use crate::schema::{Content, Message, Request, Role, SystemPrompt};

const QUIZ_SYSTEM_PROMPT: &str = "Answer concisely and precisely. Follow instructions exactly.";
const QUIZ_MAX_TOKENS: u32 = 256;

const COLOR_WORDS: &[&str] = &[
    "red", "orange", "yellow", "green", "blue", "purple", "pink", "black", "white", "gray", "grey", "brown", "cyan", "magenta", "violet",
    "indigo",
];

struct Question {
    prompt: &'static str,
    scorer: fn(&str) -> u32,
}

fn score_reasoning(answer: &str) -> u32 {
    let lower = answer.to_lowercase();
    if lower.contains("wednesday") { 20 } else { 0 }
}

fn score_coding(answer: &str) -> u32 {
    let lower = answer.to_lowercase();
    let has_fn = lower.contains("fn ") || lower.contains("def ") || lower.contains("function");
    let has_even_logic = lower.contains("% 2") || lower.contains("%2") || lower.contains("mod 2") || lower.contains("even");
    match (has_fn, has_even_logic) {
        (true, true) => 20,
        (true, false) | (false, true) => 10,
        (false, false) => 0,
    }
}

fn score_arithmetic(answer: &str) -> u32 {
    if answer.trim() == "1591" { 20 } else { 0 }
}

fn score_instruction_following(answer: &str) -> u32 {
    let lines: Vec<&str> = answer.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() != 3 {
        return 0;
    }

    let recognized = lines
        .iter()
        .filter(|line| {
            let lower = line.to_lowercase();
            COLOR_WORDS.iter().any(|color| lower.contains(color))
        })
        .count();

    (recognized as u32 * 20) / 3
}

fn score_summarization(answer: &str) -> u32 {
    let word_count = answer.split_whitespace().count();
    if word_count == 0 {
        return 0;
    }
    if word_count <= 40 { 20 } else { 10 }
}

const QUESTIONS: &[Question] = &[
    Question {
        prompt: "If today is Monday, what day of the week will it be in 9 days? Answer with just the day name.",
        scorer: score_reasoning,
    },
    Question {
        prompt: "Write a one-line function in any language that returns true if an integer is even.",
        scorer: score_coding,
    },
    Question {
        prompt: "What is 37 * 43? Answer with just the number.",
        scorer: score_arithmetic,
    },
    Question {
        prompt: "List exactly 3 colors, one per line, and nothing else.",
        scorer: score_instruction_following,
    },
    Question {
        prompt: "Summarize in one sentence: the mitochondria is the organelle responsible for producing most of the cell's supply of \
            adenosine triphosphate, used as a source of chemical energy.",
        scorer: score_summarization,
    },
];

/// Run the quiz against `adapter` for `model`, returning a composite
/// score in 0..=100. A question whose call fails scores 0 rather than
/// aborting the whole quiz.
pub async fn run(adapter: &dyn Adapter, ctx: &RequestContext, model: &str) -> Result<u32> {
    let mut total = 0;

    for question in QUESTIONS {
        let req = Request {
            run_id: uuid::Uuid::new_v4().to_string(),
            model: model.to_string(),
            max_tokens: QUIZ_MAX_TOKENS,
            system: Some(SystemPrompt::Text(QUIZ_SYSTEM_PROMPT.to_string())),
            messages: vec![Message {
                role: Role::User,
                content: Content::Text(question.prompt.to_string()),
            }],
            tools: Vec::new(),
            metadata: Default::default(),
            headers: Default::default(),
            stream: false,
        };

        let answer = adapter.complete(ctx, &req).await.map(|r| r.text()).unwrap_or_default();
        total += (question.scorer)(&answer);
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_scorer_is_exact() {
        assert_eq!(score_arithmetic("1591"), 20);
        assert_eq!(score_arithmetic("1591 "), 20);
        assert_eq!(score_arithmetic("the answer is 1591"), 0);
    }

    #[test]
    fn color_list_scorer_rewards_three_recognized_lines() {
        let answer = "red\ngreen\nblue";
        assert_eq!(score_instruction_following(answer), 20);
    }

    #[test]
    fn color_list_scorer_gives_partial_credit() {
        let answer = "red\ngreen\nfoo";
        assert_eq!(score_instruction_following(answer), 13);
    }

    #[test]
    fn color_list_scorer_rejects_wrong_line_count() {
        let answer = "red\ngreen";
        assert_eq!(score_instruction_following(answer), 0);
    }

    #[tokio::test]
    async fn run_sums_every_question_score() {
        use crate::adapter::canonical::CanonicalAdapter;
        use crate::schema::{Response, ResponseBlock, StopReason, Usage};

        let fixed = Response {
            model: "m".into(),
            blocks: vec![ResponseBlock::Text { text: "1591".into() }],
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
            trace: Default::default(),
        };
        let adapter = CanonicalAdapter::fixed("quiz-double", fixed);

        let total = run(&adapter, &RequestContext::default(), "m").await.unwrap();
        assert_eq!(total, 40, "only arithmetic and summarization scorers should match a bare '1591' answer");
    }
}
