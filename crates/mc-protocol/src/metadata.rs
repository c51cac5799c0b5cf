//! Entity metadata: indexed, typed values sent as a partial update.
//!
//! Wire layout is a run of `u8 index | VarInt type | value` entries closed by `0xFF`.
//! Type ids follow protocol 765.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::slot::Slot;
use crate::{Decode, Encode, ProtocolError, Result, VarInt, read_varint};

const END_OF_METADATA: u8 = 0xFF;

mod type_id {
    pub const BYTE: i32 = 0;
    pub const SLOT: i32 = 7;
    pub const VECTOR3: i32 = 26;
}

/// Three packed f32s.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[must_use]
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }
}

impl Encode for Vec3 {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.x.encode(writer)?;
        self.y.encode(writer)?;
        self.z.encode(writer)
    }
}

impl Decode<'_> for Vec3 {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self::new(
            f32::decode(reader)?,
            f32::decode(reader)?,
            f32::decode(reader)?,
        ))
    }
}

/// A single typed metadata value. Only the types a display overlay writes are modelled.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Byte(i8),
    Slot(Slot),
    Vector3(Vec3),
}

impl MetadataValue {
    #[must_use]
    pub fn type_id(&self) -> i32 {
        match self {
            Self::Byte(_) => type_id::BYTE,
            Self::Slot(_) => type_id::SLOT,
            Self::Vector3(_) => type_id::VECTOR3,
        }
    }

    fn encode_value<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self {
            Self::Byte(v) => v.encode(writer),
            Self::Slot(v) => v.encode(writer),
            Self::Vector3(v) => v.encode(writer),
        }
    }

    fn decode_value<R: Read>(reader: &mut R, kind: i32) -> Result<Self> {
        Ok(match kind {
            type_id::BYTE => Self::Byte(i8::decode(reader)?),
            type_id::SLOT => Self::Slot(Slot::decode(reader)?),
            type_id::VECTOR3 => Self::Vector3(Vec3::decode(reader)?),
            other => return Err(ProtocolError::InvalidMetadataType(other)),
        })
    }
}

/// An ordered set of `(index, value)` pairs. Indices not present are left untouched by the client.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityMetadata {
    entries: Vec<(u8, MetadataValue)>,
}

impl EntityMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `index`, replacing an earlier value at the same index.
    #[must_use]
    pub fn with(mut self, index: u8, value: MetadataValue) -> Self {
        self.set(index, value);
        self
    }

    pub fn set(&mut self, index: u8, value: MetadataValue) {
        debug_assert_ne!(index, END_OF_METADATA, "0xFF terminates the metadata list");
        match self.entries.iter_mut().find(|(i, _)| *i == index) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((index, value)),
        }
    }

    #[must_use]
    pub fn get(&self, index: u8) -> Option<&MetadataValue> {
        self.entries.iter().find(|(i, _)| *i == index).map(|(_, v)| v)
    }

    pub fn indices(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries.iter().map(|(i, _)| *i)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Encode for EntityMetadata {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        for (index, value) in &self.entries {
            index.encode(writer)?;
            VarInt(value.type_id()).encode(writer)?;
            value.encode_value(writer)?;
        }
        END_OF_METADATA.encode(writer)
    }
}

impl Decode<'_> for EntityMetadata {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        let mut metadata = Self::new();
        loop {
            let index = u8::decode(reader)?;
            if index == END_OF_METADATA {
                return Ok(metadata);
            }
            let kind = read_varint(reader)?;
            let value = MetadataValue::decode_value(reader, kind)?;
            metadata.entries.push((index, value));
        }
    }
}
