pub mod access;
pub mod chatbot;
pub mod classifier;
pub mod claude;
pub mod config;
pub mod telegram_log;
