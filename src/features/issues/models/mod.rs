mod issue;
mod issue_history;

pub use issue::{Issue, IssueCategory, IssuePriority, IssueStatus};
pub use issue_history::IssueHistoryEntry;
