//! Item slot encoding (protocol 765): `bool present`, then `VarInt item id | i8 count | NBT`.

use std::io::{Read, Write};

use crate::nbt::NbtCompound;
use crate::{Decode, Encode, Result, VarInt};

/// An item as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlotItem {
    pub item_id: VarInt,
    pub count: i8,
    pub nbt: Option<NbtCompound>,
}

/// A possibly-empty slot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slot(pub Option<SlotItem>);

impl Slot {
    /// The empty slot. Clients render nothing for it.
    pub const EMPTY: Self = Slot(None);

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    #[must_use]
    pub fn item(&self) -> Option<&SlotItem> {
        self.0.as_ref()
    }
}

impl From<SlotItem> for Slot {
    fn from(item: SlotItem) -> Self {
        Slot(Some(item))
    }
}

impl Encode for SlotItem {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.item_id.encode(writer)?;
        self.count.encode(writer)?;
        match &self.nbt {
            Some(nbt) => nbt.write_network(writer),
            None => 0u8.encode(writer),
        }
    }
}

impl Decode<'_> for SlotItem {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            item_id: VarInt::decode(reader)?,
            count: i8::decode(reader)?,
            nbt: NbtCompound::read_network(reader)?,
        })
    }
}

impl Encode for Slot {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.0.encode(writer)
    }
}

impl Decode<'_> for Slot {
    fn decode<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Slot(Option::<SlotItem>::decode(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{nbt, to_bytes};

    #[test]
    fn test_empty_slot_is_single_false_byte() {
        assert_eq!(to_bytes(&Slot::EMPTY).unwrap(), vec![0]);
    }

    #[test]
    fn test_item_without_nbt_ends_with_end_tag() {
        let slot = Slot::from(SlotItem {
            item_id: VarInt(5),
            count: 1,
            nbt: None,
        });
        assert_eq!(to_bytes(&slot).unwrap(), vec![1, 5, 1, 0]);
    }

    #[test]
    fn test_item_with_nbt_decodes() {
        let slot = Slot::from(SlotItem {
            item_id: VarInt(880),
            count: 1,
            nbt: Some(nbt! { "CustomModelData" => 10i32 }),
        });
        let bytes = to_bytes(&slot).unwrap();
        let decoded = Slot::decode(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(decoded, slot);
    }
}
