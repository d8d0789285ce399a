//! The generic intermediate JSON format, the pivot for every conversion.
//!
//! Regions hold only non-air blocks, rebased so the smallest occupied corner
//! sits at the origin. Entities keep their SNBT form inside the JSON.

use serde::{Deserialize, Serialize};

use crate::blocks::{Block, BlockPos};
use crate::entities::Entity;
use crate::error::Result;
use crate::formats::{
    BlockMatrix, Region, Schematic, SchematicFormat, SchematicMetadata, TileEntityMatrix,
    resolve_region,
};
use crate::version_map::MinecraftVersion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediateRegion {
    pub minecraft_version: MinecraftVersion,
    pub origin: BlockPos,
    pub size: (i32, i32, i32),
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tile_entities: Vec<Entity>,
}

impl IntermediateRegion {
    pub fn from_region(region: &dyn Region, target: Option<&MinecraftVersion>) -> Result<Self> {
        let resolved = resolve_region(region, target)?;
        let mut blocks = resolved.blocks;

        let offset = match blocks.iter().map(|b| b.pos).reduce(|lo, p| {
            BlockPos::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z))
        }) {
            Some(min) => min,
            None => BlockPos::ORIGIN,
        };
        for block in &mut blocks {
            block.pos = block.pos - offset;
        }
        blocks.retain(|block| !block.state.is_air());

        Ok(IntermediateRegion {
            minecraft_version: resolved.version,
            origin: region.origin() - offset,
            size: region.size()?,
            blocks,
            entities: resolved.entities,
            tile_entities: resolved.tile_entities.into_values().collect(),
        })
    }
}

impl Region for IntermediateRegion {
    fn block_matrix(&self) -> Result<BlockMatrix> {
        Ok(self
            .blocks
            .iter()
            .map(|block| (block.pos.astuple(), block.clone()))
            .collect())
    }

    fn entities(&self) -> Result<Vec<Entity>> {
        Ok(self.entities.clone())
    }

    fn tile_entity_matrix(&self) -> Result<TileEntityMatrix> {
        Ok(self
            .tile_entities
            .iter()
            .map(|entity| {
                let pos = entity.any_tile_pos().unwrap_or_else(|| entity.block_pos());
                (pos.astuple(), entity.clone())
            })
            .collect())
    }

    fn origin(&self) -> BlockPos {
        self.origin
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        Ok(self.minecraft_version)
    }

    fn size(&self) -> Result<(i32, i32, i32)> {
        Ok(self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediateSchematic {
    pub metadata: SchematicMetadata,
    pub name: String,
    pub regions: Vec<IntermediateRegion>,
    pub minecraft_version: MinecraftVersion,
}

impl Schematic for IntermediateSchematic {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn metadata(&self) -> SchematicMetadata {
        self.metadata.clone()
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        Ok(self.minecraft_version)
    }

    fn regions(&self) -> Vec<&dyn Region> {
        self.regions.iter().map(|r| r as &dyn Region).collect()
    }
}

impl SchematicFormat for IntermediateSchematic {
    const DESCRIPTION: &'static str = "Generic Intermediate JSON Format";
    const EXTENSION: &'static str = "json";

    fn default_version() -> MinecraftVersion {
        MinecraftVersion::V1_20_1
    }

    fn load(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn dump(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn from_schematic(source: &dyn Schematic, target: Option<&MinecraftVersion>) -> Result<Self> {
        let regions = source
            .regions()
            .into_iter()
            .map(|region| IntermediateRegion::from_region(region, target))
            .collect::<Result<Vec<_>>>()?;

        let minecraft_version = match target {
            Some(version) => *version,
            None => source.minecraft_version()?,
        };

        Ok(IntermediateSchematic {
            metadata: source.metadata(),
            name: source.name(),
            regions,
            minecraft_version,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::blocks::BlockState;

    use super::*;

    fn one_stone_block() -> IntermediateSchematic {
        IntermediateSchematic {
            metadata: SchematicMetadata {
                name: Some("One Stone Block".to_string()),
                author: Some("Steve McMaster".to_string()),
                ..Default::default()
            },
            name: "One Stone Block".to_string(),
            regions: vec![IntermediateRegion {
                minecraft_version: MinecraftVersion::V1_20_1,
                origin: BlockPos::ORIGIN,
                size: (1, 1, 1),
                blocks: vec![Block::new(
                    BlockPos::ORIGIN,
                    BlockState::new("minecraft:stone"),
                )],
                entities: vec![],
                tile_entities: vec![],
            }],
            minecraft_version: MinecraftVersion::V1_20_1,
        }
    }

    #[test]
    fn json_roundtrip() {
        let schematic = one_stone_block();
        let bytes = schematic.dump().unwrap();
        let back = IntermediateSchematic::load(&bytes).unwrap();
        assert_eq!(back, schematic);
    }

    #[test]
    fn from_region_rebases_and_drops_air() {
        let region = IntermediateRegion {
            minecraft_version: MinecraftVersion::V1_20_1,
            origin: BlockPos::new(10, 5, 10),
            size: (2, 1, 1),
            blocks: vec![
                Block::new(BlockPos::new(10, 5, 10), BlockState::air()),
                Block::new(BlockPos::new(11, 5, 10), BlockState::new("minecraft:stone")),
            ],
            entities: vec![],
            tile_entities: vec![],
        };

        let rebased = IntermediateRegion::from_region(&region, None).unwrap();
        assert_eq!(rebased.origin, BlockPos::ORIGIN);
        assert_eq!(rebased.blocks.len(), 1);
        assert_eq!(rebased.blocks[0].pos, BlockPos::new(1, 0, 0));
    }

    #[test]
    fn region_size_is_explicit_not_derived() {
        let schematic = one_stone_block();
        let regions = schematic.regions();
        assert_eq!(regions[0].size().unwrap(), (1, 1, 1));
    }
}
