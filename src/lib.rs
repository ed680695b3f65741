pub mod config;
pub mod grading;
pub mod output;
pub mod transcript;
