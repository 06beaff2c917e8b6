//! Investigator: plan, human review, execute, report
//!
//! The planner drafts a research plan and the run pauses for review. Feedback
//! either approves the plan, which the executor then works through task by
//! task with the tool agent, or asks for changes, which sends the run back to
//! the planner to merge them into the plan. The reporter turns everything
//! gathered into one streamed report.

pub mod feedback;
pub mod graph;
pub mod nodes;
pub mod prompts;
pub mod state;

pub use feedback::{classify_feedback, merge_plans, resolve_feedback, FeedbackClass};
pub use graph::{build_investigator, InvestigatorNode};
pub use nodes::InvestigatorSettings;
pub use state::{FeedbackAction, InvestigatorState, ResearchPlan, ResearchTask};
