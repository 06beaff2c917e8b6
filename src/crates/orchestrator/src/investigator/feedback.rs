//! Review feedback classification and plan merging
//!
//! Feedback given at the review pause is first classified by vocabulary:
//! empty or a bare approval word approves, revision vocabulary or more than a
//! few words asks for a new plan, anything else is ambiguous and is settled by
//! a structured model call.

use super::state::{FeedbackAction, ResearchPlan};
use crate::brew::planner::tokenize;
use llm::{chat_structured, ChatModel, Message, ModelOptions, ResponseFormat};
use serde::Deserialize;
use serde_json::json;

const APPROVAL_WORDS: &[&str] = &[
    "approve", "approved", "ok", "okay", "yes", "go", "proceed", "lgtm", "continue",
];

const REVISION_HINTS: &[&str] = &[
    "add", "remove", "modify", "change", "include", "exclude", "replace", "instead", "also",
];

const REMOVAL_HINTS: &[&str] = &["remove", "exclude", "drop", "without", "skip", "delete"];

/// Feedback longer than this is always a revision request
const MAX_APPROVAL_TOKENS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackClass {
    Approve,
    Revise,
    Ambiguous,
}

pub fn classify_feedback(feedback: &str) -> FeedbackClass {
    let tokens = tokenize(feedback);
    let normalized = feedback.trim().to_lowercase();

    if tokens.is_empty() || APPROVAL_WORDS.contains(&normalized.trim_end_matches(['.', '!']).trim()) {
        return FeedbackClass::Approve;
    }
    if tokens.iter().any(|t| REVISION_HINTS.contains(&t.as_str())) || tokens.len() > MAX_APPROVAL_TOKENS {
        return FeedbackClass::Revise;
    }
    FeedbackClass::Ambiguous
}

/// Model verdict on ambiguous feedback
#[derive(Debug, Clone, Deserialize)]
pub struct UserIntent {
    pub action: String,
    #[serde(default)]
    pub feedback_summary: Option<String>,
}

impl UserIntent {
    fn schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "enum": ["approve", "update"]},
                "feedback_summary": {"type": ["string", "null"]}
            },
            "required": ["action", "feedback_summary"]
        })
    }
}

const INTENT_SYSTEM: &str = "A user is reviewing a research plan. Decide whether their reply \
approves the plan as is (action \"approve\") or asks for changes (action \"update\"). For updates, \
summarize the requested changes in feedback_summary.";

/// Resolve feedback to an action, asking the model only when the vocabulary is inconclusive.
///
/// Returns the action and the feedback text the planner should work from.
pub async fn resolve_feedback(
    model: &dyn ChatModel,
    feedback: &str,
    plan: Option<&ResearchPlan>,
    options: ModelOptions,
) -> (FeedbackAction, String) {
    match classify_feedback(feedback) {
        FeedbackClass::Approve => (FeedbackAction::Approve, feedback.to_string()),
        FeedbackClass::Revise => (FeedbackAction::Update, feedback.to_string()),
        FeedbackClass::Ambiguous => {
            let tasks = plan.map(|p| p.task_names().join(", ")).unwrap_or_default();
            let messages = vec![
                Message::system(INTENT_SYSTEM),
                Message::user(format!("Plan tasks: {tasks}\n\nUser reply: {feedback}")),
            ];
            let format = ResponseFormat::json_schema("user_intent", UserIntent::schema());

            match chat_structured::<UserIntent>(model, messages, format, options).await {
                Ok(intent) if intent.action.eq_ignore_ascii_case("approve") => {
                    (FeedbackAction::Approve, feedback.to_string())
                }
                Ok(intent) => {
                    let summary = intent
                        .feedback_summary
                        .filter(|s| !s.trim().is_empty())
                        .unwrap_or_else(|| feedback.to_string());
                    (FeedbackAction::Update, summary)
                }
                Err(e) => {
                    // unclear and unclassifiable: plan again rather than run the wrong plan
                    tracing::warn!(error = %e, "Feedback intent call failed, treating as update");
                    (FeedbackAction::Update, feedback.to_string())
                }
            }
        }
    }
}

/// Whether `feedback` asks to drop the task called `name`
fn requests_removal(feedback: &str, name: &str) -> bool {
    let lowered = feedback.to_lowercase();
    let tokens = tokenize(feedback);
    tokens.iter().any(|t| REMOVAL_HINTS.contains(&t.as_str()))
        && !name.trim().is_empty()
        && lowered.contains(&name.trim().to_lowercase())
}

/// Layer a revised plan over the previous one.
///
/// Previous tasks keep their position, replaced by a revised task of the same
/// name when there is one; they are dropped only when the feedback names them
/// for removal. Revised tasks with new names are appended.
pub fn merge_plans(previous: &ResearchPlan, revised: &ResearchPlan, feedback: &str) -> ResearchPlan {
    let same = |a: &str, b: &str| a.trim().eq_ignore_ascii_case(b.trim());

    let mut tasks: Vec<_> = previous
        .tasks
        .iter()
        .filter(|task| !requests_removal(feedback, &task.name))
        .map(|task| {
            revised
                .tasks
                .iter()
                .find(|r| same(&r.name, &task.name))
                .cloned()
                .unwrap_or_else(|| task.clone())
        })
        .collect();

    for task in &revised.tasks {
        let known = previous.tasks.iter().any(|p| same(&p.name, &task.name))
            || tasks.iter().any(|t| same(&t.name, &task.name));
        if !known {
            tasks.push(task.clone());
        }
    }

    ResearchPlan::new(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::investigator::state::ResearchTask;
    use crate::testing::{structured, ScriptedModel};

    fn task(name: &str) -> ResearchTask {
        ResearchTask::new(name, format!("goal of {name}"), "tavily_search", json!({}))
    }

    #[test]
    fn test_classify_feedback() {
        assert_eq!(classify_feedback(""), FeedbackClass::Approve);
        assert_eq!(classify_feedback("  OK! "), FeedbackClass::Approve);
        assert_eq!(classify_feedback("lgtm"), FeedbackClass::Approve);
        assert_eq!(classify_feedback("add competitor Y"), FeedbackClass::Revise);
        assert_eq!(
            classify_feedback("please look at european markets first"),
            FeedbackClass::Revise
        );
        assert_eq!(classify_feedback("sounds good"), FeedbackClass::Ambiguous);
    }

    #[tokio::test]
    async fn test_ambiguous_feedback_asks_model() {
        let model = ScriptedModel::new(|_| Ok(structured(json!({"action": "approve", "feedback_summary": null}))));
        let (action, _) = resolve_feedback(model.as_ref(), "sounds good", None, ModelOptions::default()).await;
        assert_eq!(action, FeedbackAction::Approve);
        assert_eq!(model.call_count(), 1);

        let (action, text) =
            resolve_feedback(model.as_ref(), "add pricing", None, ModelOptions::default()).await;
        assert_eq!(action, FeedbackAction::Update);
        assert_eq!(text, "add pricing");
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_ambiguous_update_uses_summary() {
        let model = ScriptedModel::new(|_| {
            Ok(structured(json!({"action": "update", "feedback_summary": "Focus on pricing pages"})))
        });
        let (action, text) = resolve_feedback(model.as_ref(), "hmm, pricing?", None, ModelOptions::default()).await;
        assert_eq!(action, FeedbackAction::Update);
        assert_eq!(text, "Focus on pricing pages");
    }

    #[test]
    fn test_merge_keeps_previous_and_appends_new() {
        let previous = ResearchPlan::new(vec![task("Find Competitors"), task("Market Trends")]);
        let revised = ResearchPlan::new(vec![task("Scrape Competitor Y"), task("Market Trends")]);

        let merged = merge_plans(&previous, &revised, "add competitor Y");
        assert_eq!(
            merged.task_names(),
            vec!["Find Competitors", "Market Trends", "Scrape Competitor Y"]
        );
    }

    #[test]
    fn test_merge_honours_explicit_removal() {
        let previous = ResearchPlan::new(vec![task("Find Competitors"), task("Market Trends")]);
        let revised = ResearchPlan::new(vec![task("Find Competitors")]);

        let merged = merge_plans(&previous, &revised, "remove market trends");
        assert_eq!(merged.task_names(), vec!["Find Competitors"]);
    }

    #[test]
    fn test_merge_replaces_modified_task_in_place() {
        let previous = ResearchPlan::new(vec![task("Find Competitors"), task("Market Trends")]);
        let mut changed = task("find competitors");
        changed.goal = "Find EU competitors".to_string();
        let merged = merge_plans(&previous, &ResearchPlan::new(vec![changed]), "modify: EU only");

        assert_eq!(merged.tasks.len(), 2);
        assert_eq!(merged.tasks[0].goal, "Find EU competitors");
    }
}
