pub mod health;
pub mod interviews;
pub mod websocket;

pub use health::{health_handler, health_live_handler, health_ready_handler, metrics_handler};
pub use interviews::get_interview;
pub use websocket::room_websocket_handler;
