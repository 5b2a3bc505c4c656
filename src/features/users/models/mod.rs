mod user;

pub use user::{check_role_requirements, CreateUser, User, UserRole};
