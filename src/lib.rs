pub mod analyze;
pub mod cli;
pub mod config;
pub mod consolidate;
pub mod dates;
pub mod discover;
pub mod error;
pub mod git;
pub mod gitlab;
pub mod model;
pub mod repos;
