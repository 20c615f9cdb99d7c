pub mod auth;
pub mod clients;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;
