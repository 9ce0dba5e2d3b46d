pub mod candidate;
pub mod conversation;
pub mod job;
