pub mod config;
pub mod decision;
pub mod error;
pub mod event;
pub mod issue;
pub mod labels;
pub mod project;
