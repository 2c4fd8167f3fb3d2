//! Project state and the store that owns it.

mod project;
mod store;

pub use project::{ProjectState, StageProgress, StageStatusEntry, StatusSummary};
pub use store::ProjectStore;
