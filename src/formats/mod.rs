//! The schematic format family: shared traits, metadata and detection.
//!
//! Every format implements [`Region`] (what's inside) and
//! [`SchematicFormat`] (how it loads, dumps and converts). Conversion reads
//! the source's regions into the target's constructor; the intermediate JSON
//! format is the pivot when nothing more direct exists.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blocks::{Block, BlockPos, BlockState};
use crate::entities::Entity;
use crate::error::{Result, SchemError};
use crate::version_map::{BlockMapper, MinecraftVersion};
use crate::{nbt, snbt};

pub mod blueprint;
pub mod building_gadgets;
pub mod intermediate;
pub mod litematic;
pub mod sponge;
pub mod structure;

pub type BlockMatrix = BTreeMap<(i32, i32, i32), Block>;
pub type TileEntityMatrix = BTreeMap<(i32, i32, i32), Entity>;

/// A contiguous chunk of schematic content. Single-region formats implement
/// this directly on the schematic type.
pub trait Region {
    fn block_matrix(&self) -> Result<BlockMatrix>;
    fn entities(&self) -> Result<Vec<Entity>>;
    fn tile_entity_matrix(&self) -> Result<TileEntityMatrix>;
    fn origin(&self) -> BlockPos;
    fn minecraft_version(&self) -> Result<MinecraftVersion>;

    fn blocks(&self) -> Result<Vec<Block>> {
        Ok(self.block_matrix()?.into_values().collect())
    }

    fn tile_entities(&self) -> Result<Vec<Entity>> {
        Ok(self.tile_entity_matrix()?.into_values().collect())
    }

    /// Distinct block states in first-seen order.
    fn palette(&self) -> Result<Vec<BlockState>> {
        let mut palette = Vec::new();
        for block in self.blocks()? {
            if !palette.contains(&block.state) {
                palette.push(block.state);
            }
        }
        Ok(palette)
    }

    fn bounding_box(&self) -> Result<(BlockPos, BlockPos)> {
        let mut bounds: Option<(BlockPos, BlockPos)> = None;
        for block in self.blocks()? {
            let p = block.pos;
            bounds = Some(match bounds {
                None => (p, p),
                Some((lo, hi)) => (
                    BlockPos::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                    BlockPos::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
                ),
            });
        }
        Ok(bounds.unwrap_or((BlockPos::ORIGIN, BlockPos::ORIGIN)))
    }

    fn size(&self) -> Result<(i32, i32, i32)> {
        if self.block_matrix()?.is_empty() {
            return Ok((0, 0, 0));
        }
        let (lo, hi) = self.bounding_box()?;
        Ok((
            (hi.x - lo.x).abs() + 1,
            (hi.y - lo.y).abs() + 1,
            (hi.z - lo.z).abs() + 1,
        ))
    }

    fn translated_block_matrix(&self, target: &MinecraftVersion) -> Result<BlockMatrix> {
        let source = self.minecraft_version()?;
        if source == *target {
            return self.block_matrix();
        }
        let mapper = BlockMapper::new(source);
        Ok(self
            .block_matrix()?
            .into_iter()
            .map(|(pos, block)| (pos, mapper.map_block(&block, target)))
            .collect())
    }

    fn translated_blocks(&self, target: &MinecraftVersion) -> Result<Vec<Block>> {
        Ok(self.translated_block_matrix(target)?.into_values().collect())
    }

    fn translated_palette(&self, target: &MinecraftVersion) -> Result<Vec<BlockState>> {
        let mut palette = Vec::new();
        for block in self.translated_blocks(target)? {
            if !palette.contains(&block.state) {
                palette.push(block.state);
            }
        }
        Ok(palette)
    }

    // Entity translation is not version-aware (yet); these exist so format
    // writers can treat every part of a region uniformly.
    fn translated_entities(&self, _target: &MinecraftVersion) -> Result<Vec<Entity>> {
        self.entities()
    }

    fn translated_tile_entity_matrix(
        &self,
        _target: &MinecraftVersion,
    ) -> Result<TileEntityMatrix> {
        self.tile_entity_matrix()
    }

    fn translated_tile_entities(&self, target: &MinecraftVersion) -> Result<Vec<Entity>> {
        Ok(self
            .translated_tile_entity_matrix(target)?
            .into_values()
            .collect())
    }
}

/// Name, author and friends: the lowest common denominator across formats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchematicMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Building Gadgets serializer ids, carried so v1 templates survive a
    /// round trip through other formats.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub serializers: Vec<String>,
}

/// A loaded schematic of any format.
pub trait Schematic {
    fn name(&self) -> String;
    fn metadata(&self) -> SchematicMetadata;
    fn minecraft_version(&self) -> Result<MinecraftVersion>;
    fn regions(&self) -> Vec<&dyn Region>;

    fn region(&self, idx: usize) -> Option<&dyn Region> {
        self.regions().into_iter().nth(idx)
    }
}

/// Load/dump/convert surface of a concrete format.
pub trait SchematicFormat: Schematic + Sized {
    const DESCRIPTION: &'static str;
    const EXTENSION: &'static str;

    fn default_version() -> MinecraftVersion;

    fn load(bytes: &[u8]) -> Result<Self>;

    fn dump(&self) -> Result<Vec<u8>>;

    /// Build this format from any other schematic, translating block states
    /// when `target` differs from the source version.
    fn from_schematic(source: &dyn Schematic, target: Option<&MinecraftVersion>) -> Result<Self>;

    fn check_size(width: i32, height: i32, length: i32) -> Result<()> {
        let _ = (width, height, length);
        Ok(())
    }
}

/// The region of a single-region source, or an error naming the overflow.
pub(crate) fn single_region(source: &dyn Schematic) -> Result<&dyn Region> {
    let regions = source.regions();
    if regions.len() > 1 {
        return Err(SchemError::TooManyRegions(regions.len()));
    }
    regions
        .into_iter()
        .next()
        .ok_or_else(|| SchemError::Unexpected("source schematic has no regions".to_string()))
}

/// Region contents after optional version translation, gathered once so
/// format writers don't repeat the translated-vs-raw dance.
pub(crate) struct ResolvedRegion {
    pub blocks: Vec<Block>,
    pub palette: Vec<BlockState>,
    pub entities: Vec<Entity>,
    pub tile_entities: TileEntityMatrix,
    pub version: MinecraftVersion,
}

pub(crate) fn resolve_region(
    region: &dyn Region,
    target: Option<&MinecraftVersion>,
) -> Result<ResolvedRegion> {
    let source = region.minecraft_version()?;
    match target {
        Some(target) if *target != source => Ok(ResolvedRegion {
            blocks: region.translated_blocks(target)?,
            palette: region.translated_palette(target)?,
            entities: region.translated_entities(target)?,
            tile_entities: region.translated_tile_entity_matrix(target)?,
            version: *target,
        }),
        _ => Ok(ResolvedRegion {
            blocks: region.blocks()?,
            palette: region.palette()?,
            entities: region.entities()?,
            tile_entities: region.tile_entity_matrix()?,
            version: source,
        }),
    }
}

/// Narrow an axis length to the i16 header fields several formats use.
pub(crate) fn axis_i16(axis: &'static str, value: i32) -> Result<i16> {
    i16::try_from(value).map_err(|_| SchemError::SizeLimit {
        axis,
        value: value as i64,
        max: i16::MAX as i64,
    })
}

/// Ensure the palette has an air entry for dense formats; returns the palette
/// and the air index.
pub(crate) fn palette_with_air(mut palette: Vec<BlockState>) -> (Vec<BlockState>, usize) {
    match palette.iter().position(BlockState::is_air) {
        Some(idx) => (palette, idx),
        None => {
            palette.insert(0, BlockState::air());
            (palette, 0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    BuildingGadgetsV0,
    BuildingGadgetsV1,
    BuildingGadgetsV2,
    Intermediate,
    Litematic,
    Blueprint,
    Sponge { version: i32 },
    Structure,
}

/// Identify the schematic format of a raw payload: JSON envelopes first,
/// then (possibly gzipped) NBT, then SNBT.
pub fn detect(bytes: &[u8]) -> Result<DetectedFormat> {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(bytes) {
        debug!("payload parses as json");
        if json.get("header").is_some() {
            return Ok(DetectedFormat::BuildingGadgetsV1);
        }
        if json.get("statePosArrayList").is_some() {
            return Ok(DetectedFormat::BuildingGadgetsV2);
        }
        if json.get("minecraft_version").is_some() {
            return Ok(DetectedFormat::Intermediate);
        }
        return Err(SchemError::UnknownFormat);
    }

    if let Ok(raw) = nbt::decompress(bytes) {
        if let Ok(fastnbt::Value::Compound(root)) = fastnbt::from_bytes::<fastnbt::Value>(&raw) {
            debug!("payload parses as nbt");
            if root.contains_key("Regions") {
                return Ok(DetectedFormat::Litematic);
            }
            if root.contains_key("required_mods") {
                return Ok(DetectedFormat::Blueprint);
            }
            if nbt::root_name(&raw).as_deref() == Some("Schematic") {
                if let Some(fastnbt::Value::Int(version)) = root.get("Version") {
                    return Ok(DetectedFormat::Sponge { version: *version });
                }
            }
            if root.contains_key("blocks") && root.contains_key("DataVersion") {
                return Ok(DetectedFormat::Structure);
            }
            return Err(SchemError::UnknownFormat);
        }
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        if let Ok(fastnbt::Value::Compound(root)) = snbt::from_snbt(text) {
            debug!("payload parses as snbt");
            if root.contains_key("stateIntArray") {
                return Ok(DetectedFormat::BuildingGadgetsV0);
            }
        }
    }

    Err(SchemError::UnknownFormat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_with_air_reuses_existing_entry() {
        let palette = vec![BlockState::new("minecraft:stone"), BlockState::air()];
        let (palette, air) = palette_with_air(palette);
        assert_eq!(air, 1);
        assert_eq!(palette.len(), 2);
    }

    #[test]
    fn palette_with_air_inserts_at_front() {
        let palette = vec![BlockState::new("minecraft:stone")];
        let (palette, air) = palette_with_air(palette);
        assert_eq!(air, 0);
        assert!(palette[0].is_air());
        assert_eq!(palette[1], BlockState::new("minecraft:stone"));
    }

    #[test]
    fn metadata_serializes_sparsely() {
        let metadata = SchematicMetadata {
            name: Some("One Stone Block".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&metadata).unwrap(),
            r#"{"name":"One Stone Block"}"#
        );
        let back: SchematicMetadata = serde_json::from_str("{}").unwrap();
        assert_eq!(back, SchematicMetadata::default());
    }

    #[test]
    fn detect_rejects_garbage() {
        assert!(matches!(
            detect(b"certainly not a schematic"),
            Err(SchemError::UnknownFormat)
        ));
        assert!(matches!(detect(b"{}"), Err(SchemError::UnknownFormat)));
    }
}
