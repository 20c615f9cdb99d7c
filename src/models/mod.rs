pub mod client;
pub mod page;
pub mod project;
pub mod rbac;
pub mod status;
pub mod task;
pub mod user;
