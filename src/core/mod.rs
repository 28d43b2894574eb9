pub mod agent;
pub mod error;
pub mod llm;
pub mod store;
