//! # Questions Module
//!
//! The practice-question catalogue behind the `getQuestions` query:
//! paging, search, difficulty and topic filters, allow-listed sorting.

pub mod models;
pub mod query;
pub mod services;

pub use models::{Question, QuestionFilter, QuestionPage};
pub use services::QuestionsService;
