#![forbid(unsafe_code)]

pub mod app;
pub mod cli;
pub mod digest;
pub mod docx;
pub mod error;
pub mod fetch;
pub mod formats;
pub mod logging;
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod store;
