//! Request classification and planning
//!
//! The planner decides, in order:
//!
//! 1. **Direct** - greetings and identity chat get an immediate reply, no plan.
//! 2. **General** - short requests without action vocabulary go to the
//!    tool-less general worker as a single task.
//! 3. **Structured** - everything else is planned by the model under the
//!    [`TaskPlan`] schema, then stable-sorted by priority.
//!
//! Steps 1 and 2 are pure functions over the tokenized text so they stay
//! deterministic; only step 3 calls the model. A plan that fails to parse
//! falls back to a single general task, so `task_plan` is always set after
//! planning.

use super::prompts;
use super::state::TaskPlan;
use llm::{chat_structured, ChatModel, Message, ModelOptions, ResponseFormat};

const GREETINGS: &[&str] = &[
    "hi", "hello", "hey", "yo", "sup", "howdy", "kiddan", "kiddaan", "tussin", "tusin",
];

const ACTION_KEYWORDS: &[&str] = &[
    "research", "search", "find", "latest", "sources", "cite", "tavily", "news", "trend",
    "twitter", "tweet", "x", "linkedin", "post", "campaign", "strategy", "analyze", "analysis",
    "benchmark", "kpi", "metrics",
];

const IDENTITY_PHRASES: &[&str] = &["who are you", "what can you do", "how are you"];

const SHORT_MESSAGE_TOKENS: usize = 6;
const GENERAL_MESSAGE_TOKENS: usize = 25;

/// How a request is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    Direct,
    General,
    Structured,
}

/// Lowercased tokens, split on anything that is not alphanumeric
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_any(tokens: &[String], vocabulary: &[&str]) -> bool {
    tokens.iter().any(|token| vocabulary.contains(&token.as_str()))
}

pub fn is_action_request(tokens: &[String]) -> bool {
    contains_any(tokens, ACTION_KEYWORDS)
}

pub fn is_greeting_like(tokens: &[String]) -> bool {
    tokens.len() <= SHORT_MESSAGE_TOKENS && contains_any(tokens, GREETINGS)
}

fn is_identity_question(tokens: &[String]) -> bool {
    let joined = tokens.join(" ");
    tokens.len() <= SHORT_MESSAGE_TOKENS
        && IDENTITY_PHRASES.iter().any(|phrase| joined.contains(phrase))
}

pub fn classify(text: &str) -> RequestClass {
    let tokens = tokenize(text);
    let action = is_action_request(&tokens);

    if tokens.is_empty() || is_greeting_like(&tokens) || (!action && is_identity_question(&tokens)) {
        RequestClass::Direct
    } else if !action && tokens.len() <= GENERAL_MESSAGE_TOKENS {
        RequestClass::General
    } else {
        RequestClass::Structured
    }
}

/// Ask the model for a plan; parse failures fall back to one general task
pub async fn structured_plan(model: &dyn ChatModel, text: &str, options: ModelOptions) -> TaskPlan {
    let messages = vec![
        Message::system(prompts::PLANNER_SYSTEM),
        Message::user(format!("Create a concise task plan for: {text}")),
    ];
    let format = ResponseFormat::json_schema("task_plan", TaskPlan::json_schema());

    match chat_structured::<TaskPlan>(model, messages, format, options).await {
        Ok(plan) if !plan.is_empty() => plan.sorted(),
        Ok(_) => {
            tracing::warn!("Planner returned an empty plan, using general fallback");
            TaskPlan::general("Fallback: planner returned no tasks", text)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Plan generation failed, using general fallback");
            TaskPlan::general("Fallback: plan generation failed", text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Hi!! What's up?"), vec!["hi", "what", "s", "up"]);
        assert!(tokenize("  ?! ").is_empty());
    }

    #[test]
    fn test_greetings_are_direct() {
        assert_eq!(classify("hi"), RequestClass::Direct);
        assert_eq!(classify("Hey there, kiddan?"), RequestClass::Direct);
        assert_eq!(classify(""), RequestClass::Direct);
        assert_eq!(classify("who are you?"), RequestClass::Direct);
    }

    #[test]
    fn test_long_greeting_is_not_direct() {
        assert_eq!(
            classify("hello can you explain how photosynthesis works in plants"),
            RequestClass::General
        );
    }

    #[test]
    fn test_identity_with_action_is_planned() {
        assert_eq!(classify("who are you research"), RequestClass::Structured);
    }

    #[test]
    fn test_short_question_goes_to_general() {
        assert_eq!(classify("What is the capital of France?"), RequestClass::General);
    }

    #[test]
    fn test_action_keywords_need_whole_tokens() {
        // "next" contains "x" but is not the token "x"
        assert_eq!(classify("what comes next after lunch"), RequestClass::General);
        assert_eq!(classify("write an x thread about coffee"), RequestClass::Structured);
    }

    #[test]
    fn test_long_requests_are_planned() {
        let text = "I would like a thorough write up about the history of coffee roasting \
                    in Europe including the major regional styles and how they evolved over \
                    the centuries since then";
        assert!(tokenize(text).len() > 25);
        assert_eq!(classify(text), RequestClass::Structured);
    }
}
