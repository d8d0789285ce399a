//! Vanilla structure-block / Create `.nbt` schematics.
//!
//! Gzipped NBT, anonymous root. Blocks are a sparse list of
//! `{pos: [x,y,z], state: <palette idx>, nbt?}` compounds; positions are NBT
//! int lists rather than compounds, hence the serde adapters.

use fastnbt::Value;
use serde::{Deserialize, Serialize};

use crate::blocks::{Block, BlockPos, BlockState, EntityPos};
use crate::entities::Entity;
use crate::error::{Result, SchemError};
use crate::formats::{
    BlockMatrix, Region, Schematic, SchematicFormat, SchematicMetadata, TileEntityMatrix,
    resolve_region, single_region,
};
use crate::nbt;
use crate::version_map::MinecraftVersion;

mod block_pos_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::blocks::BlockPos;

    pub fn serialize<S: Serializer>(
        pos: &BlockPos,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        [pos.x, pos.y, pos.z].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<BlockPos, D::Error> {
        let [x, y, z] = <[i32; 3]>::deserialize(deserializer)?;
        Ok(BlockPos::new(x, y, z))
    }
}

mod entity_pos_list {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::blocks::EntityPos;

    pub fn serialize<S: Serializer>(
        pos: &EntityPos,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        [pos.x, pos.y, pos.z].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<EntityPos, D::Error> {
        let [x, y, z] = <[f64; 3]>::deserialize(deserializer)?;
        Ok(EntityPos::new(x, y, z))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureBlock {
    #[serde(with = "block_pos_list")]
    pub pos: BlockPos,
    pub state: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbt: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureEntity {
    #[serde(rename = "blockPos", with = "block_pos_list")]
    pub block_pos: BlockPos,
    #[serde(with = "entity_pos_list")]
    pub pos: EntityPos,
    pub nbt: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureSchematic {
    #[serde(rename = "DataVersion")]
    pub data_version: i32,
    pub blocks: Vec<StructureBlock>,
    pub palette: Vec<BlockState>,
    #[serde(default)]
    pub entities: Vec<StructureEntity>,
    #[serde(with = "block_pos_list")]
    pub size: BlockPos,
}

impl Region for StructureSchematic {
    fn block_matrix(&self) -> Result<BlockMatrix> {
        let mut matrix = BlockMatrix::new();
        for block in &self.blocks {
            let state = self
                .palette
                .get(block.state as usize)
                .ok_or(SchemError::PaletteIndex {
                    index: block.state as usize,
                    len: self.palette.len(),
                })?;
            matrix.insert(
                block.pos.astuple(),
                Block::new(block.pos, state.clone()),
            );
        }
        Ok(matrix)
    }

    fn entities(&self) -> Result<Vec<Entity>> {
        self.entities
            .iter()
            .map(|entity| Entity::from_compound(entity.nbt.clone()))
            .collect()
    }

    fn tile_entity_matrix(&self) -> Result<TileEntityMatrix> {
        let mut matrix = TileEntityMatrix::new();
        for block in &self.blocks {
            if let Some(nbt) = &block.nbt {
                matrix.insert(block.pos.astuple(), Entity::from_compound(nbt.clone())?);
            }
        }
        Ok(matrix)
    }

    fn origin(&self) -> BlockPos {
        BlockPos::ORIGIN
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        Ok(MinecraftVersion::from_data_version(self.data_version))
    }

    fn size(&self) -> Result<(i32, i32, i32)> {
        Ok(self.size.astuple())
    }

    fn palette(&self) -> Result<Vec<BlockState>> {
        Ok(self.palette.clone())
    }
}

impl Schematic for StructureSchematic {
    fn name(&self) -> String {
        "unknown nbt structure schematic".to_string()
    }

    fn metadata(&self) -> SchematicMetadata {
        SchematicMetadata::default()
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        Region::minecraft_version(self)
    }

    fn regions(&self) -> Vec<&dyn Region> {
        vec![self]
    }
}

impl SchematicFormat for StructureSchematic {
    const DESCRIPTION: &'static str = "Create schematic / Minecraft structure (.nbt files)";
    const EXTENSION: &'static str = "nbt";

    fn default_version() -> MinecraftVersion {
        MinecraftVersion::V1_20_1
    }

    fn load(bytes: &[u8]) -> Result<Self> {
        nbt::from_bytes(bytes)
    }

    fn dump(&self) -> Result<Vec<u8>> {
        nbt::to_gzip_bytes(self, "")
    }

    fn from_schematic(source: &dyn Schematic, target: Option<&MinecraftVersion>) -> Result<Self> {
        let region = single_region(source)?;
        let resolved = resolve_region(region, target)?;
        let mut palette = resolved.palette.clone();

        let mut blocks = Vec::with_capacity(resolved.blocks.len());
        for block in &resolved.blocks {
            let state = match palette.iter().position(|s| *s == block.state) {
                Some(idx) => idx,
                None => {
                    palette.push(block.state.clone());
                    palette.len() - 1
                }
            };
            blocks.push(StructureBlock {
                pos: block.pos,
                state: state as i32,
                nbt: resolved
                    .tile_entities
                    .get(&block.pos.astuple())
                    .map(Entity::to_compound),
            });
        }

        let entities = resolved
            .entities
            .iter()
            .map(|entity| StructureEntity {
                block_pos: entity.block_pos(),
                pos: entity.pos(),
                nbt: entity.to_compound(),
            })
            .collect();

        let (width, height, length) = region.size()?;
        Ok(StructureSchematic {
            data_version: resolved.version.data_version,
            blocks,
            palette,
            entities,
            size: BlockPos::new(width, height, length),
        })
    }
}
