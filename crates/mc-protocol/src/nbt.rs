//! NBT (Named Binary Tag) serialization for the network protocol.
//!
//! Network NBT uses a nameless root compound: a type byte followed directly by the compound body.
//! A lone `TAG_End` stands for "no compound".

use std::io::{Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{ProtocolError, Result};

/// NBT tag type IDs
mod tag_type {
    pub const END: u8 = 0;
    pub const BYTE: u8 = 1;
    pub const SHORT: u8 = 2;
    pub const INT: u8 = 3;
    pub const LONG: u8 = 4;
    pub const FLOAT: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const BYTE_ARRAY: u8 = 7;
    pub const STRING: u8 = 8;
    pub const LIST: u8 = 9;
    pub const COMPOUND: u8 = 10;
    pub const INT_ARRAY: u8 = 11;
    pub const LONG_ARRAY: u8 = 12;
}

/// Compounds nested deeper than this are rejected when decoding.
const MAX_DEPTH: usize = 512;

/// An NBT value
#[derive(Debug, Clone, PartialEq)]
pub enum NbtValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    ByteArray(Vec<i8>),
    String(String),
    List(Vec<NbtValue>),
    Compound(NbtCompound),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
}

/// An NBT compound. Insertion order is kept so encodings are stable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NbtCompound {
    entries: Vec<(String, NbtValue)>,
}

impl NbtCompound {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any existing entry with the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<NbtValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&NbtValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn get_compound(&self, key: &str) -> Option<&NbtCompound> {
        match self.get(key) {
            Some(NbtValue::Compound(c)) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(NbtValue::String(s)) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.get(key) {
            Some(NbtValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NbtValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Serialize to network NBT format (type byte + content, no name)
    pub fn write_network<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(tag_type::COMPOUND)?;
        self.write_body(writer)
    }

    pub fn to_network_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_network(&mut buf)?;
        Ok(buf)
    }

    /// Read a network compound. `Ok(None)` for a bare `TAG_End`.
    pub fn read_network<R: Read>(reader: &mut R) -> Result<Option<Self>> {
        match reader.read_u8()? {
            tag_type::END => Ok(None),
            tag_type::COMPOUND => Ok(Some(Self::read_body(reader, 0)?)),
            other => Err(ProtocolError::InvalidNbtTag(other)),
        }
    }

    fn write_body<W: Write>(&self, writer: &mut W) -> Result<()> {
        for (name, value) in &self.entries {
            writer.write_u8(value.type_id())?;
            write_nbt_string(writer, name)?;
            value.write_payload(writer)?;
        }
        writer.write_u8(tag_type::END)?;
        Ok(())
    }

    fn read_body<R: Read>(reader: &mut R, depth: usize) -> Result<Self> {
        let mut compound = Self::new();
        loop {
            let tag = reader.read_u8()?;
            if tag == tag_type::END {
                return Ok(compound);
            }
            let name = read_nbt_string(reader)?;
            let value = NbtValue::read_payload(reader, tag, depth + 1)?;
            compound.entries.push((name, value));
        }
    }
}

impl NbtValue {
    fn type_id(&self) -> u8 {
        match self {
            Self::Byte(_) => tag_type::BYTE,
            Self::Short(_) => tag_type::SHORT,
            Self::Int(_) => tag_type::INT,
            Self::Long(_) => tag_type::LONG,
            Self::Float(_) => tag_type::FLOAT,
            Self::Double(_) => tag_type::DOUBLE,
            Self::ByteArray(_) => tag_type::BYTE_ARRAY,
            Self::String(_) => tag_type::STRING,
            Self::List(_) => tag_type::LIST,
            Self::Compound(_) => tag_type::COMPOUND,
            Self::IntArray(_) => tag_type::INT_ARRAY,
            Self::LongArray(_) => tag_type::LONG_ARRAY,
        }
    }

    fn write_payload<W: Write>(&self, w: &mut W) -> Result<()> {
        match self {
            Self::Byte(v) => w.write_i8(*v)?,
            Self::Short(v) => w.write_i16::<BigEndian>(*v)?,
            Self::Int(v) => w.write_i32::<BigEndian>(*v)?,
            Self::Long(v) => w.write_i64::<BigEndian>(*v)?,
            Self::Float(v) => w.write_f32::<BigEndian>(*v)?,
            Self::Double(v) => w.write_f64::<BigEndian>(*v)?,
            Self::ByteArray(v) => {
                w.write_i32::<BigEndian>(v.len() as i32)?;
                for b in v {
                    w.write_i8(*b)?;
                }
            }
            Self::String(v) => write_nbt_string(w, v)?,
            Self::List(items) => {
                // Lists are homogeneous; the first element decides the type.
                let element = items.first().map_or(tag_type::END, Self::type_id);
                w.write_u8(element)?;
                w.write_i32::<BigEndian>(items.len() as i32)?;
                for item in items {
                    item.write_payload(w)?;
                }
            }
            Self::Compound(c) => c.write_body(w)?,
            Self::IntArray(v) => {
                w.write_i32::<BigEndian>(v.len() as i32)?;
                for i in v {
                    w.write_i32::<BigEndian>(*i)?;
                }
            }
            Self::LongArray(v) => {
                w.write_i32::<BigEndian>(v.len() as i32)?;
                for l in v {
                    w.write_i64::<BigEndian>(*l)?;
                }
            }
        }
        Ok(())
    }

    fn read_payload<R: Read>(r: &mut R, tag: u8, depth: usize) -> Result<Self> {
        if depth > MAX_DEPTH {
            return Err(ProtocolError::InvalidNbtTag(tag));
        }
        let value = match tag {
            tag_type::BYTE => Self::Byte(r.read_i8()?),
            tag_type::SHORT => Self::Short(r.read_i16::<BigEndian>()?),
            tag_type::INT => Self::Int(r.read_i32::<BigEndian>()?),
            tag_type::LONG => Self::Long(r.read_i64::<BigEndian>()?),
            tag_type::FLOAT => Self::Float(r.read_f32::<BigEndian>()?),
            tag_type::DOUBLE => Self::Double(r.read_f64::<BigEndian>()?),
            tag_type::BYTE_ARRAY => {
                let len = read_array_len(r)?;
                let mut v = Vec::with_capacity(len.min(4096));
                for _ in 0..len {
                    v.push(r.read_i8()?);
                }
                Self::ByteArray(v)
            }
            tag_type::STRING => Self::String(read_nbt_string(r)?),
            tag_type::LIST => {
                let element = r.read_u8()?;
                let len = read_array_len(r)?;
                if element == tag_type::END && len > 0 {
                    return Err(ProtocolError::InvalidNbtTag(element));
                }
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    items.push(Self::read_payload(r, element, depth + 1)?);
                }
                Self::List(items)
            }
            tag_type::COMPOUND => Self::Compound(NbtCompound::read_body(r, depth)?),
            tag_type::INT_ARRAY => {
                let len = read_array_len(r)?;
                let mut v = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    v.push(r.read_i32::<BigEndian>()?);
                }
                Self::IntArray(v)
            }
            tag_type::LONG_ARRAY => {
                let len = read_array_len(r)?;
                let mut v = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    v.push(r.read_i64::<BigEndian>()?);
                }
                Self::LongArray(v)
            }
            other => return Err(ProtocolError::InvalidNbtTag(other)),
        };
        Ok(value)
    }
}

fn read_array_len<R: Read>(r: &mut R) -> Result<usize> {
    let len = r.read_i32::<BigEndian>()?;
    usize::try_from(len).map_err(|_| ProtocolError::NegativeLength(len))
}

/// NBT strings carry a u16 byte length followed by Java's modified UTF-8.
fn write_nbt_string<W: Write>(w: &mut W, s: &str) -> Result<()> {
    let bytes = encode_modified_utf8(s);
    let len = u16::try_from(bytes.len()).map_err(|_| ProtocolError::StringTooLong {
        len: bytes.len(),
        max: u16::MAX as usize,
    })?;
    w.write_u16::<BigEndian>(len)?;
    w.write_all(&bytes)?;
    Ok(())
}

fn read_nbt_string<R: Read>(r: &mut R) -> Result<String> {
    let len = r.read_u16::<BigEndian>()? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    decode_modified_utf8(&buf)
}

/// UTF-16 code units, one to three bytes each. Surrogates are encoded separately and NUL is
/// `C0 80`, so no byte is ever zero and nothing needs four bytes.
fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();
    while let Some(lead) = iter.next() {
        let unit = match lead {
            0x01..=0x7F => u16::from(lead),
            0xC0..=0xDF => {
                let b2 = continuation(iter.next())?;
                (u16::from(lead & 0x1F) << 6) | b2
            }
            0xE0..=0xEF => {
                let b2 = continuation(iter.next())?;
                let b3 = continuation(iter.next())?;
                (u16::from(lead & 0x0F) << 12) | (b2 << 6) | b3
            }
            _ => return Err(ProtocolError::ModifiedUtf8),
        };
        units.push(unit);
    }
    // Unpaired surrogates are rejected here.
    String::from_utf16(&units).map_err(|_| ProtocolError::ModifiedUtf8)
}

fn continuation(byte: Option<u8>) -> Result<u16> {
    match byte {
        Some(b) if b & 0xC0 == 0x80 => Ok(u16::from(b & 0x3F)),
        _ => Err(ProtocolError::ModifiedUtf8),
    }
}

impl From<bool> for NbtValue {
    fn from(v: bool) -> Self {
        Self::Byte(i8::from(v))
    }
}

impl From<i8> for NbtValue {
    fn from(v: i8) -> Self {
        Self::Byte(v)
    }
}

impl From<i16> for NbtValue {
    fn from(v: i16) -> Self {
        Self::Short(v)
    }
}

impl From<i32> for NbtValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for NbtValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for NbtValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for NbtValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for NbtValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for NbtValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<NbtCompound> for NbtValue {
    fn from(v: NbtCompound) -> Self {
        Self::Compound(v)
    }
}

/// Macro for building NBT compounds ergonomically
///
/// # Example
/// ```
/// use mc_protocol::nbt;
///
/// let compound = nbt! {
///     "CustomModelData" => 10i32,
///     "PublicBukkitValues" => nbt! {
///         "hud:type" => "marker",
///     },
/// };
/// assert_eq!(compound.get_int("CustomModelData"), Some(10));
/// ```
#[macro_export]
macro_rules! nbt {
    () => {
        $crate::nbt::NbtCompound::new()
    };

    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut compound = $crate::nbt::NbtCompound::new();
        $(
            compound.insert($key, $value);
        )*
        compound
    }};
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_simple_compound_layout() {
        let compound = nbt! {
            "a" => 1i8,
        };

        let bytes = compound.to_network_bytes().unwrap();
        assert_eq!(
            bytes,
            vec![
                tag_type::COMPOUND,
                tag_type::BYTE,
                0,
                1,
                b'a',
                1,
                tag_type::END
            ]
        );
    }

    #[test]
    fn test_nested_compound_reads_back() {
        let compound = nbt! {
            "CustomModelData" => 10i32,
            "PublicBukkitValues" => nbt! {
                "hud:type" => "(´･ω･`)",
            },
            "list" => NbtValue::List(vec![NbtValue::Int(1), NbtValue::Int(2)]),
        };

        let bytes = compound.to_network_bytes().unwrap();
        let decoded = NbtCompound::read_network(&mut Cursor::new(&bytes))
            .unwrap()
            .unwrap();
        assert_eq!(decoded, compound);
        assert_eq!(
            decoded
                .get_compound("PublicBukkitValues")
                .and_then(|c| c.get_string("hud:type")),
            Some("(´･ω･`)")
        );
    }

    #[test]
    fn test_end_tag_is_absent_compound() {
        assert_eq!(NbtCompound::read_network(&mut Cursor::new(&[0u8])).unwrap(), None);
    }

    #[test]
    fn test_insert_replaces_existing_key() {
        let mut compound = nbt! { "k" => 1i32 };
        compound.insert("k", 2i32);
        assert_eq!(compound.get_int("k"), Some(2));
        assert_eq!(compound.iter().count(), 1);
    }

    #[test]
    fn test_strings_use_modified_utf8() {
        let value = "a\u{1F600}\u{0}";
        let mut buf = Vec::new();
        write_nbt_string(&mut buf, value).unwrap();
        assert_eq!(
            buf,
            vec![
                0x00, 0x09, // length
                0x61, // a
                0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80, // surrogate pair, three bytes each
                0xC0, 0x80, // NUL
            ]
        );
        assert_eq!(read_nbt_string(&mut Cursor::new(&buf)).unwrap(), value);
    }

    #[test]
    fn test_four_byte_utf8_rejected() {
        let bytes = [0x00, 0x04, 0xF0, 0x9F, 0x98, 0x80];
        assert!(matches!(
            read_nbt_string(&mut Cursor::new(&bytes)),
            Err(ProtocolError::ModifiedUtf8)
        ));
        let raw_nul = [0x00, 0x01, 0x00];
        assert!(read_nbt_string(&mut Cursor::new(&raw_nul)).is_err());
    }

    #[test]
    fn test_length_counts_encoded_bytes() {
        // 22000 chars, 66000 encoded bytes: over the u16 prefix.
        let compound = nbt! { "v" => "\u{20AC}".repeat(22_000) };
        assert!(matches!(
            compound.to_network_bytes(),
            Err(ProtocolError::StringTooLong { len: 66_000, .. })
        ));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let bytes = [tag_type::COMPOUND, 42, 0, 0];
        assert!(matches!(
            NbtCompound::read_network(&mut Cursor::new(&bytes)),
            Err(ProtocolError::InvalidNbtTag(42))
        ));
    }
}
