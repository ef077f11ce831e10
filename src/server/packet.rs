use crate::varint::{decode_varint, encode_varint_i32};
use crate::QueryErr;
use std::ops::Range;

/// Packets cannot be larger than 2^21 - 1 bytes.
pub const MAX_PACKET_LEN: usize = 2_097_151;

/// See protocol version [numbers](https://wiki.vg/Protocol_version_numbers).
///
/// If the client is pinging to determine what version to use, by convention -1 should be set.
const PING_PROTOCOL_VERSION: i32 = -1;
const NEXT_STATE_STATUS: i32 = 1;
const STATUS_PACKET_ID: u32 = 0x00;

/// Build handshake packet buffer.
pub fn build_handshake_packet(host: &str, port: u16) -> Vec<u8> {
    let mut packet_data = Vec::<u8>::new();
    let server_addr_bytes = host.as_bytes();

    // Packet id
    packet_data.push(0x00);
    packet_data.extend(encode_varint_i32(PING_PROTOCOL_VERSION));
    // Server address
    //
    // UTF-8 string prefixed with its size in bytes as a VarInt.
    packet_data.extend(encode_varint_i32(server_addr_bytes.len() as i32));
    packet_data.extend_from_slice(server_addr_bytes);
    // Server port, unsigned short
    packet_data.extend_from_slice(&port.to_be_bytes());
    // Next state, should be 1 for status, but could also be 2 for login.
    packet_data.extend(encode_varint_i32(NEXT_STATE_STATUS));

    // Build [packet](https://wiki.vg/Protocol#Packet_format)
    let mut packet = encode_varint_i32(packet_data.len() as i32);
    packet.append(&mut packet_data);

    packet
}

/// Build status request packet buffer.
pub fn build_status_request_packet() -> Vec<u8> {
    let mut packet = encode_varint_i32(1);
    packet.push(STATUS_PACKET_ID as u8);

    packet
}

/// Outcome of trying to read a status response from the bytes received so far.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// Not enough bytes yet, or not a status response packet.
    Incomplete,
    /// The JSON body occupies this range of the buffer.
    Complete(Range<usize>),
}

/// Try to locate a complete status response at the start of `buf`.
///
/// The buffer is never consumed, so this can be called again from scratch after
/// each read. Truncated or unterminated VarInts are treated as "wait for more".
pub fn parse_status_frame(buf: &[u8]) -> Result<Frame, QueryErr> {
    let Ok((_packet_len, len_bytes)) = decode_varint(buf, 0) else {
        return Ok(Frame::Incomplete);
    };
    let Ok((packet_id, id_bytes)) = decode_varint(buf, len_bytes) else {
        return Ok(Frame::Incomplete);
    };

    if packet_id != STATUS_PACKET_ID {
        return Ok(Frame::Incomplete);
    }

    let Ok((json_len, json_len_bytes)) = decode_varint(buf, len_bytes + id_bytes) else {
        return Ok(Frame::Incomplete);
    };
    let json_len = json_len as usize;

    if json_len > MAX_PACKET_LEN {
        return Err(QueryErr::InvalidResponse(format!(
            "declared status length {} exceeds the maximum packet size",
            json_len
        )));
    }

    let json_start = len_bytes + id_bytes + json_len_bytes;

    if buf.len() < json_start + json_len {
        return Ok(Frame::Incomplete);
    }

    Ok(Frame::Complete(json_start..json_start + json_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::encode_varint;

    fn response(json: &str) -> Vec<u8> {
        let mut body = vec![0x00];
        body.extend(encode_varint(json.len() as u64).unwrap());
        body.extend_from_slice(json.as_bytes());

        let mut packet = encode_varint(body.len() as u64).unwrap();
        packet.extend(body);
        packet
    }

    #[test]
    fn handshake_layout() {
        let packet = build_handshake_packet("localhost", 25565);

        let mut expected = vec![0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F, 9];
        expected.extend_from_slice(b"localhost");
        expected.extend_from_slice(&[0x63, 0xDD, 0x01]);
        let mut framed = vec![expected.len() as u8];
        framed.extend(expected);

        assert_eq!(packet, framed);
    }

    #[test]
    fn request_layout() {
        assert_eq!(build_status_request_packet(), vec![0x01, 0x00]);
    }

    #[test]
    fn complete_frame() {
        let json = r#"{"a":1}"#;
        let buf = response(json);

        match parse_status_frame(&buf).unwrap() {
            Frame::Complete(range) => assert_eq!(&buf[range], json.as_bytes()),
            Frame::Incomplete => panic!("frame should be complete"),
        }
    }

    #[test]
    fn every_prefix_is_incomplete() {
        let buf = response(r#"{"description":"hello"}"#);

        for end in 0..buf.len() {
            assert_eq!(parse_status_frame(&buf[..end]).unwrap(), Frame::Incomplete);
        }
    }

    #[test]
    fn other_packet_ids_are_ignored() {
        let mut buf = response("{}");
        buf[1] = 0x01;

        assert_eq!(parse_status_frame(&buf).unwrap(), Frame::Incomplete);
    }

    #[test]
    fn oversized_declaration_is_rejected() {
        let mut buf = vec![0x05, 0x00];
        buf.extend(encode_varint(MAX_PACKET_LEN as u64 + 1).unwrap());

        assert!(matches!(
            parse_status_frame(&buf),
            Err(QueryErr::InvalidResponse(_))
        ));
    }
}
