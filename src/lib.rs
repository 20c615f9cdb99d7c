pub mod app;
pub mod authz;
pub mod config;
pub mod db;
pub mod docs;
pub mod errors;
pub mod events;
pub mod extract;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod responses;
pub mod routes;
pub mod utils;
pub mod validation;

pub use app::{build_app, create_app};
