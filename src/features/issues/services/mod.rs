mod issue_service;

pub use issue_service::{IssueService, NewImage};
