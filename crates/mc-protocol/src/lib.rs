//! Minecraft protocol encoding/decoding.
//!
//! Covers the subset of the play-state wire format needed to drive client-side display entities:
//! primitives, VarInt, UUID, network NBT, item slots, entity metadata and packet framing.

use std::borrow::Cow;
use std::io::{self, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "derive")]
pub use mc_protocol_derive::{Decode, Encode, Packet};

pub mod frame;
pub mod metadata;
pub mod nbt;
pub mod slot;

pub use frame::{decode_frame, encode_packet};
pub use metadata::{EntityMetadata, MetadataValue, Vec3};
pub use slot::{Slot, SlotItem};

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("VarInt too large")]
    VarIntTooLarge,
    #[error("String too long: {len} > {max}")]
    StringTooLong { len: usize, max: usize },
    #[error("Invalid NBT tag type: {0}")]
    InvalidNbtTag(u8),
    #[error("Invalid metadata type: {0}")]
    InvalidMetadataType(i32),
    #[error("Negative length: {0}")]
    NegativeLength(i32),
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Invalid modified UTF-8 in NBT string")]
    ModifiedUtf8,
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Longest string the protocol accepts, in UTF-16 code units.
pub const MAX_STRING_LEN: usize = 32767;

/// Protocol state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    Handshaking,
    Status,
    Login,
    Configuration,
    Play,
}

/// Packet direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Clientbound,
    Serverbound,
}

/// Trait for all packets - provides ID, name, state, and direction
pub trait Packet {
    /// The packet ID
    const ID: i32;
    /// The packet name (e.g., "SetPassengers")
    const NAME: &'static str;
    /// The protocol state this packet belongs to
    const STATE: State;
    /// Whether this packet is clientbound or serverbound
    const DIRECTION: Direction;
}

pub trait Encode {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()>;
}

pub trait Decode<'a>: Sized {
    fn decode<R: Read>(reader: &mut R) -> Result<Self>;
}

/// Encode a value into a fresh buffer.
pub fn to_bytes<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    value.encode(&mut buf)?;
    Ok(buf)
}

pub fn read_varint<R: Read>(reader: &mut R) -> Result<i32> {
    let mut result = 0i32;
    let mut shift = 0;
    loop {
        let byte = reader.read_u8()?;
        result |= ((byte & 0x7F) as i32) << shift;
        if byte & 0x80 == 0 {
            return Ok(result);
        }
        shift += 7;
        if shift >= 35 {
            return Err(ProtocolError::VarIntTooLarge);
        }
    }
}

pub fn write_varint<W: Write>(writer: &mut W, value: i32) -> Result<()> {
    let mut value = value as u32;
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            writer.write_u8(byte)?;
            return Ok(());
        }
        writer.write_u8(byte | 0x80)?;
    }
}

/// Number of bytes `value` occupies as a VarInt.
#[must_use]
pub fn varint_len(value: i32) -> usize {
    let bits = 32 - (value as u32).leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Reads a VarInt length prefix, rejecting negative values.
fn read_len<R: Read>(reader: &mut R) -> Result<usize> {
    let len = read_varint(reader)?;
    usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))
}

impl Encode for bool {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(u8::from(*self))?;
        Ok(())
    }
}

impl Decode<'_> for bool {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_u8()? != 0)
    }
}

impl Encode for u8 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)?;
        Ok(())
    }
}

impl Decode<'_> for u8 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_u8()?)
    }
}

impl Encode for i8 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i8(*self)?;
        Ok(())
    }
}

impl Decode<'_> for i8 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(reader.read_i8()?)
    }
}

/// Big-endian fixed-width numbers all follow the same shape.
macro_rules! big_endian {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        $(
            impl Encode for $ty {
                fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
                    writer.$write::<BigEndian>(*self)?;
                    Ok(())
                }
            }

            impl Decode<'_> for $ty {
                fn decode<R: Read>(reader: &mut R) -> Result<Self> {
                    Ok(reader.$read::<BigEndian>()?)
                }
            }
        )*
    };
}

big_endian! {
    i16 => write_i16, read_i16;
    u16 => write_u16, read_u16;
    i32 => write_i32, read_i32;
    i64 => write_i64, read_i64;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VarInt(pub i32);

impl Encode for VarInt {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varint(writer, self.0)
    }
}

impl Decode<'_> for VarInt {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(VarInt(read_varint(reader)?))
    }
}

impl From<i32> for VarInt {
    fn from(v: i32) -> Self {
        VarInt(v)
    }
}

impl From<VarInt> for i32 {
    fn from(v: VarInt) -> Self {
        v.0
    }
}

/// Rotation step of 1/256 of a full turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Angle(pub u8);

impl Encode for Angle {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.0.encode(writer)
    }
}

impl Decode<'_> for Angle {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Angle(u8::decode(reader)?))
    }
}

// Strings are a VarInt byte length followed by UTF-8.
impl Encode for str {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        let units = self.encode_utf16().count();
        if units > MAX_STRING_LEN {
            return Err(ProtocolError::StringTooLong {
                len: units,
                max: MAX_STRING_LEN,
            });
        }
        let bytes = self.as_bytes();
        write_varint(writer, bytes.len() as i32)?;
        writer.write_all(bytes)?;
        Ok(())
    }
}

impl Encode for String {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.as_str().encode(writer)
    }
}

impl Decode<'_> for String {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let len = read_len(reader)?;
        // Four UTF-8 bytes per code unit at most.
        if len > MAX_STRING_LEN * 4 {
            return Err(ProtocolError::StringTooLong {
                len,
                max: MAX_STRING_LEN * 4,
            });
        }
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

impl Encode for Cow<'_, str> {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.as_ref().encode(writer)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Some(v) => {
                true.encode(writer)?;
                v.encode(writer)
            }
            None => false.encode(writer),
        }
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Option<T> {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        if bool::decode(reader)? {
            Ok(Some(T::decode(reader)?))
        } else {
            Ok(None)
        }
    }
}

impl<T: Encode> Encode for [T] {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        write_varint(writer, self.len() as i32)?;
        for item in self {
            item.encode(writer)?;
        }
        Ok(())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.as_slice().encode(writer)
    }
}

impl<'a, T: Decode<'a>> Decode<'a> for Vec<T> {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let len = read_len(reader)?;
        // Cap the up-front allocation; a hostile prefix should not reserve gigabytes.
        let mut vec = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            vec.push(T::decode(reader)?);
        }
        Ok(vec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Uuid(pub u128);

impl Encode for Uuid {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u128::<BigEndian>(self.0)?;
        Ok(())
    }
}

impl Decode<'_> for Uuid {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Uuid(reader.read_u128::<BigEndian>()?))
    }
}
