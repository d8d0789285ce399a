//! Minecraft versions and cross-version block-state translation.
//!
//! Translation goes through a "universal" form (current naming): upgrade the
//! source state to universal, then downgrade to the target. The rules cover
//! the 1.13 flattening boundary for slabs and the 1.17 `grass_path` /
//! `dirt_path` rename; states without a rule pass through unchanged.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, warn};

use crate::blocks::{Block, BlockState};
use crate::error::{Result, SchemError};

/// First data version with flattened block states (1.13).
const FLATTENING: i32 = 1519;
/// First data version where `grass_path` became `dirt_path` (1.17).
const GRASS_PATH_RENAME: i32 = 2724;

/// Java releases this crate knows the data version for.
const KNOWN_VERSIONS: &[((u32, u32, u32), i32)] = &[
    ((1, 12, 2), 1343),
    ((1, 13, 1), 1628),
    ((1, 13, 2), 1631),
    ((1, 14, 4), 1976),
    ((1, 15, 2), 2230),
    ((1, 16, 2), 2578),
    ((1, 16, 5), 2586),
    ((1, 17, 1), 2730),
    ((1, 18, 2), 2975),
    ((1, 19, 2), 3120),
    ((1, 20, 1), 3465),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MinecraftVersion {
    pub release: (u32, u32, u32),
    pub data_version: i32,
}

impl MinecraftVersion {
    pub const V1_12_2: MinecraftVersion = MinecraftVersion {
        release: (1, 12, 2),
        data_version: 1343,
    };
    pub const V1_13_2: MinecraftVersion = MinecraftVersion {
        release: (1, 13, 2),
        data_version: 1631,
    };
    pub const V1_17_1: MinecraftVersion = MinecraftVersion {
        release: (1, 17, 1),
        data_version: 2730,
    };
    pub const V1_20_1: MinecraftVersion = MinecraftVersion {
        release: (1, 20, 1),
        data_version: 3465,
    };

    /// Look up a release by version string, e.g. `"1.20.1"`. A `major.minor`
    /// string resolves to the newest known patch release.
    pub fn from_release(s: &str) -> Result<Self> {
        let unknown = || SchemError::UnknownVersion(s.to_string());

        let mut parts = s.split('.');
        let major: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(unknown)?;
        let minor: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(unknown)?;
        let patch: Option<u32> = match parts.next() {
            Some(p) => Some(p.parse().map_err(|_| unknown())?),
            None => None,
        };
        if parts.next().is_some() {
            return Err(unknown());
        }

        let found = KNOWN_VERSIONS
            .iter()
            .filter(|((ma, mi, pa), _)| {
                *ma == major && *mi == minor && patch.is_none_or(|p| *pa == p)
            })
            .next_back();
        match found {
            Some(&(release, data_version)) => Ok(MinecraftVersion {
                release,
                data_version,
            }),
            None => Err(unknown()),
        }
    }

    /// Resolve a data version to the closest known release at or below it.
    /// The given data version is preserved so rewrites keep the exact value.
    pub fn from_data_version(data_version: i32) -> Self {
        let release = KNOWN_VERSIONS
            .iter()
            .filter(|&&(_, dv)| dv <= data_version)
            .next_back()
            .or(KNOWN_VERSIONS.first())
            .map(|&(release, _)| release)
            .unwrap_or((1, 12, 2));
        MinecraftVersion {
            release,
            data_version,
        }
    }

    /// Post-1.13 flattened block naming?
    pub fn flattened(&self) -> bool {
        self.data_version >= FLATTENING
    }
}

impl fmt::Display for MinecraftVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor, patch) = self.release;
        write!(f, "{major}.{minor}.{patch}")
    }
}

impl FromStr for MinecraftVersion {
    type Err = SchemError;

    fn from_str(s: &str) -> Result<Self> {
        MinecraftVersion::from_release(s)
    }
}

impl Serialize for MinecraftVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MinecraftVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        MinecraftVersion::from_release(&text).map_err(D::Error::custom)
    }
}

const WOOD_SPECIES: &[&str] = &["oak", "spruce", "birch", "jungle", "acacia", "dark_oak"];

/// Pre-flattening `stone_slab[variant=…]` values and their flattened names.
const STONE_SLAB_VARIANTS: &[(&str, &str)] = &[
    ("stone", "minecraft:smooth_stone_slab"),
    ("sandstone", "minecraft:sandstone_slab"),
    ("cobblestone", "minecraft:cobblestone_slab"),
    ("brick", "minecraft:brick_slab"),
    ("stone_brick", "minecraft:stone_brick_slab"),
    ("nether_brick", "minecraft:nether_brick_slab"),
    ("quartz", "minecraft:quartz_slab"),
];

/// Translates block states between Minecraft versions.
#[derive(Debug, Clone, Copy)]
pub struct BlockMapper {
    source: MinecraftVersion,
}

impl BlockMapper {
    pub fn new(source: MinecraftVersion) -> Self {
        BlockMapper { source }
    }

    pub fn map_block(&self, block: &Block, target: &MinecraftVersion) -> Block {
        Block {
            pos: block.pos,
            state: self.map_state(&block.state, target),
        }
    }

    pub fn map_state(&self, state: &BlockState, target: &MinecraftVersion) -> BlockState {
        if self.source == *target {
            return state.clone();
        }
        let universal = to_universal(state, &self.source);
        from_universal(universal, target)
    }
}

fn to_universal(state: &BlockState, source: &MinecraftVersion) -> BlockState {
    let mut state = state.clone();

    if !source.flattened() {
        let base = state.base_name().to_string();
        match base.as_str() {
            "wooden_slab" => {
                if let Some(variant) = state.properties.remove("variant") {
                    if WOOD_SPECIES.contains(&variant.as_str()) {
                        state.name = format!("minecraft:{variant}_slab");
                        rename_property(&mut state, "half", "type");
                    } else {
                        state.properties.insert("variant".to_string(), variant);
                    }
                }
            }
            "stone_slab" => {
                if let Some(variant) = state.properties.remove("variant") {
                    match STONE_SLAB_VARIANTS.iter().find(|(v, _)| *v == variant) {
                        Some((_, name)) => {
                            state.name = name.to_string();
                            rename_property(&mut state, "half", "type");
                        }
                        None => {
                            state.properties.insert("variant".to_string(), variant);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    if source.data_version < GRASS_PATH_RENAME && state.name == "minecraft:grass_path" {
        state.name = "minecraft:dirt_path".to_string();
    }

    state
}

fn from_universal(mut state: BlockState, target: &MinecraftVersion) -> BlockState {
    if target.data_version < GRASS_PATH_RENAME && state.name == "minecraft:dirt_path" {
        state.name = "minecraft:grass_path".to_string();
    }

    if !target.flattened() {
        let base = state.base_name().to_string();
        if let Some(species) = base.strip_suffix("_slab") {
            if WOOD_SPECIES.contains(&species) {
                state.name = "minecraft:wooden_slab".to_string();
                rename_property(&mut state, "type", "half");
                state
                    .properties
                    .insert("variant".to_string(), species.to_string());
            } else if let Some((variant, _)) = STONE_SLAB_VARIANTS
                .iter()
                .find(|(_, name)| name.strip_prefix("minecraft:") == Some(base.as_str()))
            {
                state.name = "minecraft:stone_slab".to_string();
                rename_property(&mut state, "type", "half");
                state
                    .properties
                    .insert("variant".to_string(), variant.to_string());
            } else {
                warn!(state = %state, "no pre-flattening form known, leaving as-is");
            }
        } else if !state.properties.is_empty() {
            debug!(state = %state, "passing state through the flattening boundary unchanged");
        }
    }

    state
}

fn rename_property(state: &mut BlockState, from: &str, to: &str) {
    if let Some(value) = state.properties.remove(from) {
        state.properties.insert(to.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use crate::blocks::BlockPos;

    use super::*;

    fn v(s: &str) -> MinecraftVersion {
        MinecraftVersion::from_release(s).unwrap()
    }

    fn block(state: BlockState) -> Block {
        Block::new(BlockPos::ORIGIN, state)
    }

    #[test]
    fn release_lookup() {
        assert_eq!(v("1.20.1").data_version, 3465);
        assert_eq!(v("1.12.2").data_version, 1343);
        // major.minor resolves to the newest known patch
        assert_eq!(v("1.13").release, (1, 13, 2));
        assert!(MinecraftVersion::from_release("1.99.0").is_err());
        assert!(MinecraftVersion::from_release("nonsense").is_err());
    }

    #[test]
    fn data_version_lookup_preserves_exact_value() {
        let version = MinecraftVersion::from_data_version(3465);
        assert_eq!(version.release, (1, 20, 1));
        // a snapshot between releases keeps its data version
        let version = MinecraftVersion::from_data_version(2728);
        assert_eq!(version.release, (1, 16, 5));
        assert_eq!(version.data_version, 2728);
    }

    #[test]
    fn display_and_serde_form() {
        assert_eq!(v("1.20.1").to_string(), "1.20.1");
        let json = serde_json::to_string(&v("1.16.2")).unwrap();
        assert_eq!(json, "\"1.16.2\"");
        let back: MinecraftVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.16.2"));
    }

    #[test]
    fn unchanged_block_maps_to_itself() {
        let stone = block(BlockState::new("minecraft:stone"));
        let mapper = BlockMapper::new(v("1.12.2"));
        assert_eq!(mapper.map_block(&stone, &v("1.20.1")), stone);
    }

    #[test]
    fn pre_flattening_slab_flattens() {
        let old = block(BlockState::with_properties(
            "minecraft:wooden_slab",
            [("variant", "spruce"), ("half", "top")],
        ));
        let new = block(BlockState::with_properties(
            "minecraft:spruce_slab",
            [("type", "top")],
        ));
        let mapper = BlockMapper::new(v("1.12.2"));
        assert_eq!(mapper.map_block(&old, &v("1.13.1")), new);
    }

    #[test]
    fn flattened_slab_downgrades() {
        let new = block(BlockState::with_properties(
            "minecraft:spruce_slab",
            [("type", "top")],
        ));
        let old = block(BlockState::with_properties(
            "minecraft:wooden_slab",
            [("variant", "spruce"), ("half", "top")],
        ));
        let mapper = BlockMapper::new(v("1.13.2"));
        assert_eq!(mapper.map_block(&new, &v("1.12.2")), old);
    }

    #[test]
    fn stone_slab_variant_special_case() {
        let old = block(BlockState::with_properties(
            "minecraft:stone_slab",
            [("variant", "stone"), ("half", "bottom")],
        ));
        let new = block(BlockState::with_properties(
            "minecraft:smooth_stone_slab",
            [("type", "bottom")],
        ));
        let up = BlockMapper::new(v("1.12.2"));
        assert_eq!(up.map_block(&old, &v("1.20.1")), new);

        let down = BlockMapper::new(v("1.20.1"));
        assert_eq!(down.map_block(&new, &v("1.12.2")), old);
    }

    #[test]
    fn renamed_block_tracks_the_1_17_boundary() {
        let grass_path = block(BlockState::new("minecraft:grass_path"));
        let dirt_path = block(BlockState::new("minecraft:dirt_path"));

        let up = BlockMapper::new(v("1.16.2"));
        assert_eq!(up.map_block(&grass_path, &v("1.17.1")), dirt_path);

        let down = BlockMapper::new(v("1.20.1"));
        assert_eq!(down.map_block(&dirt_path, &v("1.16.2")), grass_path);
    }

    #[test]
    fn same_version_skips_translation() {
        let odd = block(BlockState::with_properties(
            "minecraft:wooden_slab",
            [("variant", "not_a_species")],
        ));
        let mapper = BlockMapper::new(v("1.12.2"));
        assert_eq!(mapper.map_block(&odd, &v("1.12.2")), odd);
    }
}
