pub mod issue_handler;
