mod packet;
mod regular_server;

pub use packet::{build_handshake_packet, build_status_request_packet, parse_status_frame, Frame};
pub use regular_server::*;
