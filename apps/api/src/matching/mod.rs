pub mod filters;
pub mod matcher;
pub mod service;
