//! Structurize / MineColonies `.blueprint` files.
//!
//! Gzipped NBT, anonymous root, lowercase field names. The block volume is a
//! dense array of 16-bit palette indices packed two-per-int, iterated in
//! y-z-x major order. Structurize's own placeholder blocks
//! (`structurize:…substitution`) count as empty space.

use fastnbt::{IntArray, Value};
use serde::{Deserialize, Serialize};

use crate::blocks::{Block, BlockPos, BlockState};
use crate::entities::Entity;
use crate::error::{Result, SchemError};
use crate::formats::{
    BlockMatrix, Region, Schematic, SchematicFormat, SchematicMetadata, TileEntityMatrix,
    axis_i16, palette_with_air, resolve_region, single_region,
};
use crate::nbt;
use crate::version_map::MinecraftVersion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructurizeData {
    pub primary_offset: BlockPos,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionalData {
    pub structurize: StructurizeData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructurizeBlueprint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architects: Option<Vec<String>>,
    pub blocks: IntArray,
    #[serde(default)]
    pub entities: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcversion: Option<i32>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_data: Option<OptionalData>,
    pub palette: Vec<BlockState>,
    pub required_mods: Vec<String>,
    pub size_x: i16,
    pub size_y: i16,
    pub size_z: i16,
    #[serde(default)]
    pub tile_entities: Vec<Value>,
    pub version: i8,
}

fn is_substitution(state: &BlockState) -> bool {
    state.name.starts_with("structurize:") && state.name.ends_with("substitution")
}

impl Region for StructurizeBlueprint {
    fn block_matrix(&self) -> Result<BlockMatrix> {
        let (sx, sy, sz) = (
            self.size_x as i32,
            self.size_y as i32,
            self.size_z as i32,
        );
        let volume = (sx as i64 * sy as i64 * sz as i64).max(0) as usize;
        let words: Vec<i32> = self.blocks.iter().copied().collect();
        let indices = nbt::unpack_u16_pairs(&words, volume);

        let mut matrix = BlockMatrix::new();
        for y in 0..sy {
            for z in 0..sz {
                for x in 0..sx {
                    let flat = (y * sz * sx + z * sx + x) as usize;
                    let idx = *indices.get(flat).ok_or_else(|| {
                        SchemError::Unexpected(
                            "blocks array shorter than the declared volume".to_string(),
                        )
                    })? as usize;
                    let state = self.palette.get(idx).ok_or(SchemError::PaletteIndex {
                        index: idx,
                        len: self.palette.len(),
                    })?;
                    if state.is_air() || is_substitution(state) {
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

    // The blueprint entity payloads are Forge-serialized and not usable as
    // plain Minecraft entities, so reads expose none.
    fn entities(&self) -> Result<Vec<Entity>> {
        Ok(Vec::new())
    }

    fn tile_entity_matrix(&self) -> Result<TileEntityMatrix> {
        Ok(TileEntityMatrix::new())
    }

    fn origin(&self) -> BlockPos {
        BlockPos::ORIGIN
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        Ok(match self.mcversion {
            Some(data_version) => MinecraftVersion::from_data_version(data_version),
            None => Self::default_version(),
        })
    }

    fn size(&self) -> Result<(i32, i32, i32)> {
        Ok((
            self.size_x as i32,
            self.size_y as i32,
            self.size_z as i32,
        ))
    }

    fn palette(&self) -> Result<Vec<BlockState>> {
        Ok(self
            .palette
            .iter()
            .filter(|state| !state.is_air() && !is_substitution(state))
            .cloned()
            .collect())
    }
}

impl Schematic for StructurizeBlueprint {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn metadata(&self) -> SchematicMetadata {
        SchematicMetadata {
            name: Some(self.name.clone()),
            author: self
                .architects
                .as_ref()
                .and_then(|architects| architects.first().cloned()),
            ..Default::default()
        }
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        Region::minecraft_version(self)
    }

    fn regions(&self) -> Vec<&dyn Region> {
        vec![self]
    }
}

impl SchematicFormat for StructurizeBlueprint {
    const DESCRIPTION: &'static str = "Structurize / MineColonies Blueprint (.blueprint files)";
    const EXTENSION: &'static str = "blueprint";

    fn default_version() -> MinecraftVersion {
        MinecraftVersion::V1_12_2
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
        let (width, height, length) = region.size()?;
        let (min_corner, _) = region.bounding_box()?;
        let (mut palette, air) = palette_with_air(resolved.palette.clone());

        let mut matrix = BlockMatrix::new();
        for block in &resolved.blocks {
            let rel = block.pos - min_corner;
            matrix.insert(rel.astuple(), block.clone());
        }

        let mut required_mods = Vec::new();
        let mut indices: Vec<u16> = Vec::with_capacity((width * height * length).max(0) as usize);
        for y in 0..height {
            for z in 0..length {
                for x in 0..width {
                    let idx = match matrix.get(&(x, y, z)) {
                        Some(block) => {
                            let namespace = block.state.namespace();
                            if namespace != "minecraft"
                                && !required_mods.iter().any(|m| m == namespace)
                            {
                                required_mods.push(namespace.to_string());
                            }
                            match palette.iter().position(|s| *s == block.state) {
                                Some(idx) => idx,
                                None => {
                                    palette.push(block.state.clone());
                                    palette.len() - 1
                                }
                            }
                        }
                        None => air,
                    };
                    let idx = u16::try_from(idx).map_err(|_| {
                        SchemError::Unexpected(
                            "palette too large for blueprint 16-bit indices".to_string(),
                        )
                    })?;
                    indices.push(idx);
                }
            }
        }

        let tile_entities: Vec<Value> = resolved
            .tile_entities
            .iter()
            .map(|(&(x, y, z), entity)| {
                entity.to_compound_with_xyz(BlockPos::new(x, y, z) - min_corner)
            })
            .collect();
        let entities: Vec<Value> = resolved.entities.iter().map(Entity::to_compound).collect();

        Ok(StructurizeBlueprint {
            architects: source.metadata().author.map(|author| vec![author]),
            blocks: IntArray::new(nbt::pack_u16_pairs(&indices)),
            entities,
            mcversion: Some(resolved.version.data_version),
            name: source.name(),
            optional_data: None,
            palette,
            required_mods,
            size_x: axis_i16("size_x", width)?,
            size_y: axis_i16("size_y", height)?,
            size_z: axis_i16("size_z", length)?,
            tile_entities,
            version: 1,
        })
    }
}
