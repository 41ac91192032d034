pub mod commands;
pub mod config;
pub mod fs;
pub mod hr;
pub mod http;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod registry;
pub mod source;
pub mod storage;
