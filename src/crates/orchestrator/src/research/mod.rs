//! Research mode: deep research on one chat turn
//!
//! A planner writes a todo list, a discovery agent searches widely for
//! sources, an extraction agent reads the most relevant pages in full, and a
//! synthesizer streams a structured report. Unlike the investigator there is
//! no review pause; the whole run happens in one request.

pub mod graph;
pub mod nodes;
pub mod prompts;
pub mod state;

pub use graph::{build_research, ResearchNode};
pub use nodes::ResearchSettings;
pub use state::{ResearchState, ResearchTodo, TodoList, TodoStatus};
