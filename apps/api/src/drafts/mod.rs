pub mod approval;
pub mod content;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod parser;
pub mod pg;
pub mod store;
