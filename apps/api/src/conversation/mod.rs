pub mod context;
pub mod sessions;
