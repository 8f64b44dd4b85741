pub mod apply_event;
pub mod commands;
pub mod engine;
pub mod fallback;
pub mod llm_client;
pub mod narrative_parser;
pub mod prompt_builder;
pub mod protocol;
pub mod sanitizer;
pub mod speech;
pub mod turn;
