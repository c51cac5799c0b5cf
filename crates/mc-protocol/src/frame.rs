//! Uncompressed packet framing: `VarInt length | VarInt packet id | body`.

use std::io::{Cursor, Read};

use bytes::{BufMut, Bytes, BytesMut};

use crate::{Encode, Packet, ProtocolError, Result, read_varint, varint_len, write_varint};

/// Frame an already-encoded body under `packet_id`.
pub fn encode_packet(packet_id: i32, data: &[u8]) -> Bytes {
    let length = varint_len(packet_id) + data.len();
    let mut buf = BytesMut::with_capacity(varint_len(length as i32) + length);
    put_varint(&mut buf, length as i32);
    put_varint(&mut buf, packet_id);
    buf.put_slice(data);
    buf.freeze()
}

/// Encode and frame a typed packet.
pub fn frame<P: Packet + Encode>(packet: &P) -> Result<Bytes> {
    let mut body = Vec::new();
    packet.encode(&mut body)?;
    Ok(encode_packet(P::ID, &body))
}

/// Split one frame off the front of `reader`, returning `(packet_id, body)`.
pub fn decode_frame<R: Read>(reader: &mut R) -> Result<(i32, Vec<u8>)> {
    let length = read_varint(reader)?;
    let length = usize::try_from(length).map_err(|_| ProtocolError::NegativeLength(length))?;
    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload)?;

    let mut cursor = Cursor::new(payload.as_slice());
    let packet_id = read_varint(&mut cursor)?;
    let body = payload[cursor.position() as usize..].to_vec();
    Ok((packet_id, body))
}

fn put_varint(buf: &mut BytesMut, value: i32) {
    let mut scratch = Vec::with_capacity(5);
    // Writing into a Vec cannot fail.
    if write_varint(&mut scratch, value).is_ok() {
        buf.put_slice(&scratch);
    }
}
