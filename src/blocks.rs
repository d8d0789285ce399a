//! Block positions, block states and positioned blocks.
//!
//! `BlockState` keeps the NBT field casing (`Name` / `Properties`) so the
//! same model deserializes straight out of palettes in every NBT format, and
//! it round-trips the textual `namespace:name[k=v,…]` form used by Sponge
//! palette keys and the intermediate JSON format.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemError;

pub const AIR: &str = "minecraft:air";

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ORIGIN: BlockPos = BlockPos { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        BlockPos { x, y, z }
    }

    pub fn astuple(self) -> (i32, i32, i32) {
        (self.x, self.y, self.z)
    }
}

impl From<(i32, i32, i32)> for BlockPos {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        BlockPos { x, y, z }
    }
}

impl Add for BlockPos {
    type Output = BlockPos;

    fn add(self, other: BlockPos) -> BlockPos {
        BlockPos::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Add<(i32, i32, i32)> for BlockPos {
    type Output = BlockPos;

    fn add(self, other: (i32, i32, i32)) -> BlockPos {
        self + BlockPos::from(other)
    }
}

impl Sub for BlockPos {
    type Output = BlockPos;

    fn sub(self, other: BlockPos) -> BlockPos {
        BlockPos::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Sub<(i32, i32, i32)> for BlockPos {
    type Output = BlockPos;

    fn sub(self, other: (i32, i32, i32)) -> BlockPos {
        self - BlockPos::from(other)
    }
}

/// A floating-point position, used by entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPos {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl EntityPos {
    pub const ORIGIN: EntityPos = EntityPos {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        EntityPos { x, y, z }
    }

    pub fn astuple(self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// The containing block position (coordinates truncated toward zero).
    pub fn block_pos(self) -> BlockPos {
        BlockPos::new(self.x as i32, self.y as i32, self.z as i32)
    }
}

/// A block type plus its state properties, e.g.
/// `minecraft:oak_slab[type=top]`. Properties stay sorted so the textual form
/// is stable and the state is usable as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockState {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(
        rename = "Properties",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        BlockState {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_properties<K, V>(
        name: impl Into<String>,
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        BlockState {
            name: name.into(),
            properties: properties
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn air() -> Self {
        BlockState::new(AIR)
    }

    pub fn is_air(&self) -> bool {
        self.name == AIR
    }

    pub fn namespace(&self) -> &str {
        self.name.split(':').next().unwrap_or("")
    }

    pub fn base_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, base)) => base,
            None => &self.name,
        }
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl FromStr for BlockState {
    type Err = SchemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SchemError::InvalidBlockState(s.to_string());

        let (name, props) = match s.find('[') {
            Some(idx) => {
                let inner = s[idx..]
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
                    .ok_or_else(invalid)?;
                (&s[..idx], Some(inner))
            }
            None => (s, None),
        };

        let (namespace, base) = name.split_once(':').ok_or_else(invalid)?;
        if !is_word(namespace) || !is_word(base) {
            return Err(invalid());
        }

        let mut properties = BTreeMap::new();
        if let Some(inner) = props {
            if !inner.is_empty() {
                for pair in inner.split(',') {
                    let (key, value) = match pair.split_once('=') {
                        Some((k, v)) => (k.trim(), v.trim()),
                        None => (pair.trim(), ""),
                    };
                    properties.insert(
                        key.to_string(),
                        value.trim_matches('"').to_string(),
                    );
                }
            }
        }

        Ok(BlockState {
            name: name.to_string(),
            properties,
        })
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.properties.is_empty() {
            return write!(f, "{}", self.name);
        }
        let props: Vec<String> = self
            .properties
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        write!(f, "{}[{}]", self.name, props.join(","))
    }
}

/// A block state at a position within a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub pos: BlockPos,
    pub state: BlockState,
}

impl Block {
    pub fn new(pos: BlockPos, state: BlockState) -> Self {
        Block { pos, state }
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn blockpos_origin_and_tuple_conversion() {
        assert_eq!(BlockPos::ORIGIN, BlockPos::new(0, 0, 0));
        assert_eq!(BlockPos::from((1, 2, 3)), BlockPos::new(1, 2, 3));
        assert_eq!(BlockPos::new(1, 2, 3).astuple(), (1, 2, 3));
    }

    #[test]
    fn blockpos_arithmetic() {
        let p1 = BlockPos::new(4, -2, 9);
        let p2 = BlockPos::new(-1, 6, 3);
        assert_eq!(p1 + p2, BlockPos::new(3, 4, 12));
        assert_eq!(p1 - p2, BlockPos::new(5, -8, 6));
        assert_eq!(p1 + (1, 1, 1), BlockPos::new(5, -1, 10));
        assert_eq!(p1 - (1, 1, 1), BlockPos::new(3, -3, 8));
    }

    #[test]
    fn entitypos_truncates_toward_zero() {
        assert_eq!(
            EntityPos::new(1.9, -0.5, 2.1).block_pos(),
            BlockPos::new(1, 0, 2)
        );
    }

    #[test]
    fn parse_blockstate_strings() {
        assert_eq!(
            "minecraft:air".parse::<BlockState>().unwrap(),
            BlockState::new("minecraft:air")
        );
        assert_eq!(
            "minecraft:stone[]".parse::<BlockState>().unwrap(),
            BlockState::new("minecraft:stone")
        );
        assert_eq!(
            "minecraft:oak_slab[type=top]".parse::<BlockState>().unwrap(),
            BlockState::with_properties("minecraft:oak_slab", [("type", "top")])
        );
        // quoted values and stray spaces are tolerated
        assert_eq!(
            r#"minecraft:stone_stairs[half="bottom", facing="east"]"#
                .parse::<BlockState>()
                .unwrap(),
            BlockState::with_properties(
                "minecraft:stone_stairs",
                [("half", "bottom"), ("facing", "east")]
            )
        );
    }

    #[test]
    fn blockstate_to_string_sorts_properties() {
        let state = BlockState::with_properties(
            "minecraft:stone_stairs",
            [("half", "bottom"), ("facing", "east")],
        );
        assert_eq!(
            state.to_string(),
            "minecraft:stone_stairs[facing=east,half=bottom]"
        );
        assert_eq!(BlockState::new("minecraft:air").to_string(), "minecraft:air");
    }

    #[test]
    fn invalid_blockstates_are_rejected() {
        for bad in ["foo[", "minecraft:foo[", "foo", "minecraft:b?d"] {
            let err = bad.parse::<BlockState>().unwrap_err();
            assert!(
                err.to_string()
                    .contains("is an invalid blockstate representation"),
                "unexpected error for {bad}: {err}"
            );
        }
    }

    #[test]
    fn blockstate_works_as_map_key() {
        let mut map = BTreeMap::new();
        map.insert(BlockState::air(), 0);
        assert_eq!(map.get(&BlockState::air()), Some(&0));
        assert_eq!(map.get(&BlockState::new("minecraft:stone")), None);
    }

    #[test]
    fn namespace_and_base_name() {
        let state = BlockState::new("botania:mana_pool");
        assert_eq!(state.namespace(), "botania");
        assert_eq!(state.base_name(), "mana_pool");
    }
}
