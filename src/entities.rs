//! Entities and tile entities as opaque NBT compounds.
//!
//! Schematic formats disagree on almost everything about entity storage, so
//! the compound is carried verbatim and only positions get typed accessors.
//! In JSON contexts (the intermediate format) an entity is its SNBT string;
//! NBT formats embed the compound directly.

use std::collections::HashMap;

use fastnbt::{IntArray, Value};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::blocks::{BlockPos, EntityPos};
use crate::error::{Result, SchemError};
use crate::snbt;

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    nbt: HashMap<String, Value>,
}

impl Entity {
    pub fn from_compound(value: Value) -> Result<Self> {
        match value {
            Value::Compound(nbt) => Ok(Entity { nbt }),
            other => Err(SchemError::Unexpected(format!(
                "entity data must be a compound, got {other:?}"
            ))),
        }
    }

    pub fn from_snbt(s: &str) -> Result<Self> {
        Entity::from_compound(snbt::from_snbt(s)?)
    }

    pub fn to_compound(&self) -> Value {
        Value::Compound(self.nbt.clone())
    }

    pub fn into_compound(self) -> Value {
        Value::Compound(self.nbt)
    }

    pub fn to_snbt(&self) -> String {
        snbt::to_snbt(&self.to_compound())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.nbt.get(key)
    }

    /// The `Pos` double list, or the origin when absent.
    pub fn pos(&self) -> EntityPos {
        if let Some(Value::List(items)) = self.nbt.get("Pos") {
            if let [x, y, z] = items.as_slice() {
                if let (Some(x), Some(y), Some(z)) = (as_f64(x), as_f64(y), as_f64(z)) {
                    return EntityPos::new(x, y, z);
                }
            }
        }
        EntityPos::ORIGIN
    }

    pub fn block_pos(&self) -> BlockPos {
        self.pos().block_pos()
    }

    /// Tile-entity position: `x`/`y`/`z` int fields (litematic, structure)
    /// or a `Pos` int array (sponge).
    pub fn tile_pos(&self) -> Option<BlockPos> {
        if let (Some(x), Some(y), Some(z)) = (
            as_i32(self.nbt.get("x")?),
            as_i32(self.nbt.get("y")?),
            as_i32(self.nbt.get("z")?),
        ) {
            return Some(BlockPos::new(x, y, z));
        }
        None
    }

    fn tile_pos_from_array(&self) -> Option<BlockPos> {
        if let Some(Value::IntArray(arr)) = self.nbt.get("Pos") {
            let v: Vec<i32> = arr.iter().copied().collect();
            if let [x, y, z] = v.as_slice() {
                return Some(BlockPos::new(*x, *y, *z));
            }
        }
        None
    }

    /// Either tile-position convention.
    pub fn any_tile_pos(&self) -> Option<BlockPos> {
        self.tile_pos().or_else(|| self.tile_pos_from_array())
    }

    /// Re-emit the compound with `x`/`y`/`z` int keys (litematic and
    /// structure tile entities).
    pub fn to_compound_with_xyz(&self, pos: BlockPos) -> Value {
        let mut nbt = self.nbt.clone();
        if matches!(nbt.get("Pos"), Some(Value::IntArray(_))) {
            nbt.remove("Pos");
        }
        nbt.insert("x".to_string(), Value::Int(pos.x));
        nbt.insert("y".to_string(), Value::Int(pos.y));
        nbt.insert("z".to_string(), Value::Int(pos.z));
        Value::Compound(nbt)
    }

    /// Re-emit the compound with a `Pos` int array (sponge tile entities).
    pub fn to_compound_with_pos_array(&self, pos: BlockPos) -> Value {
        let mut nbt = self.nbt.clone();
        nbt.remove("x");
        nbt.remove("y");
        nbt.remove("z");
        nbt.insert(
            "Pos".to_string(),
            Value::IntArray(IntArray::new(vec![pos.x, pos.y, pos.z])),
        );
        Value::Compound(nbt)
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Double(v) => Some(*v),
        Value::Float(v) => Some(*v as f64),
        Value::Int(v) => Some(*v as f64),
        _ => None,
    }
}

fn as_i32(value: &Value) -> Option<i32> {
    match value {
        Value::Int(v) => Some(*v),
        Value::Short(v) => Some(*v as i32),
        Value::Byte(v) => Some(*v as i32),
        _ => None,
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_snbt())
    }
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Entity::from_snbt(&text).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pos_defaults_to_origin() {
        let entity = Entity::from_snbt("{id:\"minecraft:pig\"}").unwrap();
        assert_eq!(entity.pos(), EntityPos::ORIGIN);
    }

    #[test]
    fn pos_and_block_pos_from_double_list() {
        let entity = Entity::from_snbt("{Pos:[1.5D,64.0D,-3.5D],id:\"minecraft:pig\"}").unwrap();
        assert_eq!(entity.pos(), EntityPos::new(1.5, 64.0, -3.5));
        assert_eq!(entity.block_pos(), BlockPos::new(1, 64, -3));
    }

    #[test]
    fn tile_pos_conventions() {
        let xyz = Entity::from_snbt("{x:1,y:2,z:3,Id:\"minecraft:chest\"}").unwrap();
        assert_eq!(xyz.any_tile_pos(), Some(BlockPos::new(1, 2, 3)));

        let arr = Entity::from_snbt("{Pos:[I;4,5,6],Id:\"minecraft:chest\"}").unwrap();
        assert_eq!(arr.any_tile_pos(), Some(BlockPos::new(4, 5, 6)));

        let none = Entity::from_snbt("{Id:\"minecraft:chest\"}").unwrap();
        assert_eq!(none.any_tile_pos(), None);
    }

    #[test]
    fn rewriting_position_keys() {
        let entity = Entity::from_snbt("{x:1,y:2,z:3,Items:[]}").unwrap();
        let moved = entity.to_compound_with_pos_array(BlockPos::new(7, 8, 9));
        let moved = Entity::from_compound(moved).unwrap();
        assert_eq!(moved.any_tile_pos(), Some(BlockPos::new(7, 8, 9)));
        assert_eq!(moved.get("x"), None);

        let back = moved.to_compound_with_xyz(BlockPos::new(1, 1, 1));
        let back = Entity::from_compound(back).unwrap();
        assert_eq!(back.tile_pos(), Some(BlockPos::new(1, 1, 1)));
        assert_eq!(back.get("Pos"), None);
    }

    #[test]
    fn json_form_is_snbt_text() {
        let entity = Entity::from_snbt("{Pos:[1.0D,2.0D,3.0D],id:\"minecraft:pig\"}").unwrap();
        let json = serde_json::to_string(&entity).unwrap();
        assert_eq!(json, "\"{Pos:[1.0D,2.0D,3.0D],id:\\\"minecraft:pig\\\"}\"");
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entity);
    }
}
