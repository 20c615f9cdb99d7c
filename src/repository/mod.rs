//! Data access for the record types. Every query excludes soft-deleted rows
//! unless its name says otherwise (`*_with_trashed`).

pub mod clients;
pub mod projects;
pub mod roles;
pub mod tasks;
pub mod users;
