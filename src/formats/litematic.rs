//! Litematica `.litematic` schematics.
//!
//! Gzipped NBT with an anonymous root. The only multi-region format here:
//! `Regions` maps region names to independently-paletted, bit-packed block
//! volumes. Region entry width is `max(2, ceil(log2(palette_len)))` bits and
//! entries may straddle long boundaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fastnbt::{LongArray, Value};
use serde::{Deserialize, Serialize};

use crate::blocks::{Block, BlockPos, BlockState};
use crate::entities::Entity;
use crate::error::{Result, SchemError};
use crate::formats::{
    BlockMatrix, Region, Schematic, SchematicFormat, SchematicMetadata, TileEntityMatrix,
    palette_with_air, resolve_region,
};
use crate::nbt::{self, PackedBits};
use crate::version_map::MinecraftVersion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LitematicMetadata {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "RegionCount")]
    pub region_count: i32,
    /// Epoch millis.
    #[serde(rename = "TimeCreated")]
    pub time_created: i64,
    #[serde(rename = "TimeModified")]
    pub time_modified: i64,
    #[serde(rename = "TotalBlocks")]
    pub total_blocks: i32,
    #[serde(rename = "TotalVolume")]
    pub total_volume: i32,
    #[serde(rename = "EnclosingSize")]
    pub enclosing_size: BlockPos,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LitematicRegion {
    #[serde(rename = "Position")]
    pub position: BlockPos,
    #[serde(rename = "Size")]
    pub size: BlockPos,
    #[serde(rename = "BlockStatePalette")]
    pub block_state_palette: Vec<BlockState>,
    #[serde(rename = "BlockStates")]
    pub block_states: LongArray,
    #[serde(rename = "Entities", default)]
    pub entities: Vec<Value>,
    #[serde(rename = "TileEntities", default)]
    pub tile_entities: Vec<Value>,
    #[serde(rename = "PendingBlockTicks", default)]
    pub pending_block_ticks: Vec<Value>,
    #[serde(rename = "PendingFluidTicks", default)]
    pub pending_fluid_ticks: Vec<Value>,
    /// Set by the parent schematic after parsing; regions don't carry their
    /// own version on disk.
    #[serde(skip)]
    minecraft_version: Option<MinecraftVersion>,
}

impl Region for LitematicRegion {
    fn block_matrix(&self) -> Result<BlockMatrix> {
        let (width, height, length) = (
            self.size.x.abs(),
            self.size.y.abs(),
            self.size.z.abs(),
        );
        let palette = &self.block_state_palette;
        let bits = nbt::width_for(palette.len());
        let volume = (width as usize) * (height as usize) * (length as usize);
        let storage: Vec<i64> = self.block_states.iter().copied().collect();
        let needed = (volume * bits as usize).div_ceil(64);
        if storage.len() < needed {
            return Err(SchemError::Unexpected(format!(
                "BlockStates holds {} longs but the region needs {needed}",
                storage.len()
            )));
        }
        let packed = PackedBits::from_longs(storage, bits, volume);

        let mut matrix = BlockMatrix::new();
        for x in 0..width {
            for y in 0..height {
                for z in 0..length {
                    let i = (x + z * width + y * length * width) as usize;
                    let idx = packed.get(i) as usize;
                    let state = palette.get(idx).ok_or(SchemError::PaletteIndex {
                        index: idx,
                        len: palette.len(),
                    })?;
                    if state.is_air() {
                        continue;
                    }
                    matrix.insert(
                        (x, y, z),
                        Block::new(BlockPos::new(x, y, z), state.clone()),
                    );
                }
            }
        }
        Ok(matrix)
    }

    fn entities(&self) -> Result<Vec<Entity>> {
        self.entities
            .iter()
            .map(|value| Entity::from_compound(value.clone()))
            .collect()
    }

    fn tile_entity_matrix(&self) -> Result<TileEntityMatrix> {
        let mut matrix = TileEntityMatrix::new();
        for value in &self.tile_entities {
            let entity = Entity::from_compound(value.clone())?;
            let pos = entity.any_tile_pos().unwrap_or_else(|| entity.block_pos());
            matrix.insert(pos.astuple(), entity);
        }
        Ok(matrix)
    }

    fn origin(&self) -> BlockPos {
        BlockPos::ORIGIN
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        self.minecraft_version.ok_or_else(|| {
            SchemError::Unexpected(
                "litematic region improperly initialized, missing Minecraft version".to_string(),
            )
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LitematicSchematic {
    #[serde(rename = "Metadata")]
    pub metadata: LitematicMetadata,
    #[serde(rename = "Regions")]
    pub regions: BTreeMap<String, LitematicRegion>,
    #[serde(rename = "Version")]
    pub version: i32,
    #[serde(rename = "SubVersion", default, skip_serializing_if = "Option::is_none")]
    pub sub_version: Option<i32>,
    #[serde(rename = "MinecraftDataVersion")]
    pub minecraft_data_version: i32,
}

impl LitematicSchematic {
    fn attach_versions(&mut self) {
        let version = MinecraftVersion::from_data_version(self.minecraft_data_version);
        for region in self.regions.values_mut() {
            region.minecraft_version = Some(version);
        }
    }
}

impl Schematic for LitematicSchematic {
    fn name(&self) -> String {
        if self.metadata.name.is_empty() {
            "unknown litematic schematic".to_string()
        } else {
            self.metadata.name.clone()
        }
    }

    fn metadata(&self) -> SchematicMetadata {
        SchematicMetadata {
            name: Some(self.name()),
            author: Some(self.metadata.author.clone()),
            description: Some(self.metadata.description.clone()),
            date: DateTime::from_timestamp_millis(self.metadata.time_created),
            serializers: Vec::new(),
        }
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        Ok(MinecraftVersion::from_data_version(
            self.minecraft_data_version,
        ))
    }

    fn regions(&self) -> Vec<&dyn Region> {
        self.regions.values().map(|r| r as &dyn Region).collect()
    }
}

impl SchematicFormat for LitematicSchematic {
    const DESCRIPTION: &'static str = "Litematica schematic (.litematic files)";
    const EXTENSION: &'static str = "litematic";

    fn default_version() -> MinecraftVersion {
        MinecraftVersion::V1_20_1
    }

    fn load(bytes: &[u8]) -> Result<Self> {
        let mut schematic: LitematicSchematic = nbt::from_bytes(bytes)?;
        schematic.attach_versions();
        Ok(schematic)
    }

    fn dump(&self) -> Result<Vec<u8>> {
        nbt::to_gzip_bytes(self, "")
    }

    fn from_schematic(source: &dyn Schematic, target: Option<&MinecraftVersion>) -> Result<Self> {
        let mut regions = BTreeMap::new();
        let mut total_blocks: i32 = 0;
        let mut outer_lo = BlockPos::ORIGIN;
        let mut outer_hi = BlockPos::ORIGIN;

        for (idx, region) in source.regions().into_iter().enumerate() {
            let (mut lo, mut hi) = region.bounding_box()?;
            let mut offset = BlockPos::ORIGIN;
            if lo != BlockPos::ORIGIN {
                offset = lo;
                hi = hi - offset;
                lo = BlockPos::ORIGIN;
            }

            outer_lo = BlockPos::new(
                outer_lo.x.min(lo.x).min(hi.x),
                outer_lo.y.min(lo.y).min(hi.y),
                outer_lo.z.min(lo.z).min(hi.z),
            );
            outer_hi = BlockPos::new(
                outer_hi.x.max(lo.x).max(hi.x),
                outer_hi.y.max(lo.y).max(hi.y),
                outer_hi.z.max(lo.z).max(hi.z),
            );

            let (width, height, length) = region.size()?;
            let origin = region.origin();
            let resolved = resolve_region(region, target)?;
            let (mut palette, air) = palette_with_air(resolved.palette.clone());

            let mut region_blocks: BTreeMap<i32, usize> = BTreeMap::new();
            for block in &resolved.blocks {
                if block.state.is_air() {
                    continue;
                }
                let state_idx = match palette.iter().position(|s| *s == block.state) {
                    Some(i) => i,
                    None => {
                        palette.push(block.state.clone());
                        palette.len() - 1
                    }
                };
                let rel = block.pos - offset;
                let i = rel.x + rel.z * width + rel.y * length * width;
                region_blocks.insert(i, state_idx);
            }

            let volume = (width as i64 * height as i64 * length as i64).max(0) as usize;
            let bits = nbt::width_for(palette.len());
            let values: Vec<u64> = (0..volume as i32)
                .map(|i| region_blocks.get(&i).copied().unwrap_or(air) as u64)
                .collect();
            let packed = PackedBits::pack(&values, bits);
            total_blocks += region_blocks.len() as i32;

            let tile_entities: Vec<Value> = resolved
                .tile_entities
                .iter()
                .map(|(&(x, y, z), entity)| {
                    entity.to_compound_with_xyz(BlockPos::new(x, y, z) - offset)
                })
                .collect();
            let entities: Vec<Value> =
                resolved.entities.iter().map(Entity::to_compound).collect();

            regions.insert(
                format!("Converted Region {idx}"),
                LitematicRegion {
                    position: origin,
                    size: BlockPos::new(width, height, length),
                    block_state_palette: palette,
                    block_states: LongArray::new(packed.into_longs()),
                    entities,
                    tile_entities,
                    pending_block_ticks: Vec::new(),
                    pending_fluid_ticks: Vec::new(),
                    minecraft_version: Some(resolved.version),
                },
            );
        }

        let enclosing = BlockPos::new(
            (outer_hi.x - outer_lo.x).abs() + 1,
            (outer_hi.y - outer_lo.y).abs() + 1,
            (outer_hi.z - outer_lo.z).abs() + 1,
        );
        let total_volume = enclosing.x * enclosing.y * enclosing.z;

        let source_metadata = source.metadata();
        let timestamp = source_metadata
            .date
            .unwrap_or_else(Utc::now)
            .timestamp_millis();

        let minecraft_data_version = match target {
            Some(version) => version.data_version,
            None => source.minecraft_version()?.data_version,
        };

        Ok(LitematicSchematic {
            metadata: LitematicMetadata {
                name: source.name(),
                author: source_metadata.author.unwrap_or_default(),
                description: source_metadata.description.unwrap_or_default(),
                region_count: regions.len() as i32,
                time_created: timestamp,
                time_modified: timestamp,
                total_blocks,
                total_volume,
                enclosing_size: enclosing,
            },
            regions,
            version: 6,
            sub_version: Some(1),
            minecraft_data_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stone_region() -> LitematicRegion {
        let palette = vec![BlockState::air(), BlockState::new("minecraft:stone")];
        let packed = PackedBits::pack(&[1], nbt::width_for(palette.len()));
        LitematicRegion {
            position: BlockPos::ORIGIN,
            size: BlockPos::new(1, 1, 1),
            block_state_palette: palette,
            block_states: LongArray::new(packed.into_longs()),
            entities: Vec::new(),
            tile_entities: Vec::new(),
            pending_block_ticks: Vec::new(),
            pending_fluid_ticks: Vec::new(),
            minecraft_version: Some(MinecraftVersion::V1_20_1),
        }
    }

    #[test]
    fn region_decodes_packed_blocks() {
        let region = stone_region();
        let matrix = region.block_matrix().unwrap();
        assert_eq!(matrix.len(), 1);
        assert_eq!(
            matrix.get(&(0, 0, 0)).map(|b| b.name()),
            Some("minecraft:stone")
        );
    }

    #[test]
    fn region_without_version_reports_an_error() {
        let mut region = stone_region();
        region.minecraft_version = None;
        assert!(Region::minecraft_version(&region).is_err());
    }

    #[test]
    fn palette_index_out_of_range_is_reported() {
        let mut region = stone_region();
        region.block_state_palette = vec![BlockState::air()];
        // width is now 2 bits for a 1-entry palette but the stored index is 1
        let err = region.block_matrix().unwrap_err();
        assert!(matches!(err, SchemError::PaletteIndex { index: 1, len: 1 }));
    }
}
