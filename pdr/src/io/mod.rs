//! Side-effecting collaborators: chat transport, catalogs, config, persistence.

pub mod catalog;
pub mod chat;
pub mod config;
pub mod critic;
pub mod error;
pub mod expert;
pub mod generator;
pub mod judge;
pub mod ladder;
pub mod manifest;
pub mod prompt;
pub mod records;
pub mod retry;
