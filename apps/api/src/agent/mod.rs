pub mod chat;
pub mod commands;
pub mod handlers;
