pub mod event_result;
pub mod genre;
pub mod message;
pub mod narrative_event;
pub mod session;
pub mod turn;
pub mod world_state;
