pub mod auth_cmd;
pub mod calendar;
pub mod common;
pub mod completions;
pub mod gallery;
pub mod map;
pub mod share;
pub mod tasks;
