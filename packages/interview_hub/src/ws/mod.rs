//! Room WebSocket
//!
//! One socket per client. Inbound text frames are room events; outbound frames
//! are whatever the room layer delivers to that connection.

mod handler;


pub use handler::handle_room_ws;
