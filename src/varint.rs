use crate::error::VarIntErr;

const SEGMENT_BITS: u64 = 0x7F;
const CHECKER_BIT: u8 = 0x80;

/// VarInts are never longer than 5 bytes.
pub const MAX_VARINT_LEN: usize = 5;

/// Encode the given number as a [VarInt](https://wiki.vg/Protocol#VarInt_and_VarLong).
///
/// Only the 32-bit unsigned range can be represented in 5 bytes, larger values
/// are rejected with [VarIntErr::Encoding].
pub fn encode_varint(value: u64) -> Result<Vec<u8>, VarIntErr> {
    if value > u32::MAX as u64 {
        return Err(VarIntErr::Encoding(format!(
            "{} does not fit in {} bytes",
            value, MAX_VARINT_LEN
        )));
    }

    let mut num = value;
    let mut result = Vec::<u8>::with_capacity(MAX_VARINT_LEN);

    while num > SEGMENT_BITS {
        result.push(((num & SEGMENT_BITS) as u8) | CHECKER_BIT);
        num >>= 7;
    }
    result.push(num as u8);

    Ok(result)
}

/// Encode a signed protocol field.
///
/// The protocol documentation mentions: "negative values always use the maximum number of bytes."
/// Encoding a negative number encodes its two's complement bit pattern, so `-1` takes 5 bytes.
pub fn encode_varint_i32(num: i32) -> Vec<u8> {
    let mut num = num as u32;
    let mut result = Vec::<u8>::with_capacity(MAX_VARINT_LEN);

    while num > SEGMENT_BITS as u32 {
        result.push(((num & SEGMENT_BITS as u32) as u8) | CHECKER_BIT);
        num >>= 7;
    }
    result.push(num as u8);

    result
}

/// Decode a VarInt starting at `offset`.
///
/// Returns the value and the number of bytes it occupied. Running out of input
/// gives [VarIntErr::Truncated], a sixth continuation byte gives [VarIntErr::Encoding].
/// On a byte stream both only mean that more data is needed.
pub fn decode_varint(buf: &[u8], offset: usize) -> Result<(u32, usize), VarIntErr> {
    let mut result = 0u32;

    for i in 0..MAX_VARINT_LEN {
        let byte = match buf.get(offset + i) {
            Some(&b) => b,
            None => return Err(VarIntErr::Truncated { offset }),
        };

        result |= ((byte as u32) & SEGMENT_BITS as u32) << (7 * i);

        if byte & CHECKER_BIT == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(VarIntErr::Encoding(format!(
        "VarInts are never longer than {} bytes (at offset {})",
        MAX_VARINT_LEN, offset
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_lengths() {
        for (value, len) in [
            (0u64, 1usize),
            (127, 1),
            (128, 2),
            (16383, 2),
            (16384, 3),
            (2097151, 3),
            (2097152, 4),
            (u32::MAX as u64, 5),
        ] {
            let bytes = encode_varint(value).unwrap();
            assert_eq!(bytes.len(), len, "length of {}", value);
            assert_eq!(decode_varint(&bytes, 0).unwrap(), (value as u32, len));
        }
    }

    #[test]
    fn known_encodings() {
        assert_eq!(encode_varint(0).unwrap(), vec![0x00]);
        assert_eq!(encode_varint(1).unwrap(), vec![0x01]);
        assert_eq!(encode_varint(128).unwrap(), vec![0x80, 0x01]);
        assert_eq!(encode_varint(255).unwrap(), vec![0xFF, 0x01]);
        assert_eq!(encode_varint(25565).unwrap(), vec![0xDD, 0xC7, 0x01]);
        assert_eq!(encode_varint_i32(-1), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(encode_varint_i32(763), vec![0xFB, 0x05]);
    }

    #[test]
    fn signed_decoding() {
        let bytes = encode_varint_i32(-1);
        assert_eq!(decode_varint(&bytes, 0).unwrap(), (u32::MAX, 5));
    }

    #[test]
    fn rejects_values_beyond_u32() {
        assert!(matches!(
            encode_varint(u32::MAX as u64 + 1),
            Err(VarIntErr::Encoding(_))
        ));
    }

    #[test]
    fn decodes_from_offset() {
        let mut buf = vec![0xAA, 0xBB];
        buf.extend(encode_varint(300).unwrap());
        buf.push(0x07);

        assert_eq!(decode_varint(&buf, 2).unwrap(), (300, 2));
        assert_eq!(decode_varint(&buf, 4).unwrap(), (7, 1));
    }

    #[test]
    fn truncated_input() {
        assert!(matches!(
            decode_varint(&[], 0),
            Err(VarIntErr::Truncated { offset: 0 })
        ));
        assert!(matches!(
            decode_varint(&[0x80, 0x80], 0),
            Err(VarIntErr::Truncated { .. })
        ));
        assert!(matches!(
            decode_varint(&[0x01], 1),
            Err(VarIntErr::Truncated { offset: 1 })
        ));
    }

    #[test]
    fn unterminated_input() {
        assert!(matches!(
            decode_varint(&[0xFF; 6], 0),
            Err(VarIntErr::Encoding(_))
        ));
    }

    #[test]
    fn round_trip_sample() {
        let mut value = 1u64;
        while value <= u32::MAX as u64 {
            for v in [value - 1, value, value + 1] {
                if v > u32::MAX as u64 {
                    continue;
                }
                let bytes = encode_varint(v).unwrap();
                assert_eq!(decode_varint(&bytes, 0).unwrap(), (v as u32, bytes.len()));
            }
            value *= 3;
        }
    }
}
