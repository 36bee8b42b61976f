pub mod agent;
pub mod common;
pub mod logs;
