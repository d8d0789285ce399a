//! Sponge `.schem` schematics, versions 1 and 2.
//!
//! Gzipped NBT with the root compound named `Schematic`. Block data is a
//! varint stream of palette indices in `x + z*W + y*W*L` order.

use std::collections::BTreeMap;

use chrono::DateTime;
use fastnbt::{ByteArray, IntArray, Value};
use serde::{Deserialize, Serialize};

use crate::blocks::{Block, BlockPos, BlockState};
use crate::entities::Entity;
use crate::error::{Result, SchemError};
use crate::formats::{
    BlockMatrix, Region, ResolvedRegion, Schematic, SchematicFormat, SchematicMetadata,
    TileEntityMatrix, axis_i16, palette_with_air, resolve_region, single_region,
};
use crate::nbt;
use crate::version_map::MinecraftVersion;

const ROOT_NAME: &str = "Schematic";

pub(crate) fn read_varints(data: &[i8]) -> Result<Vec<u32>> {
    let mut out = Vec::new();
    let mut value: u32 = 0;
    let mut shift = 0;
    for &byte in data {
        let byte = byte as u8;
        value |= ((byte & 0x7f) as u32) << shift;
        if byte & 0x80 != 0 {
            shift += 7;
            if shift > 28 {
                return Err(SchemError::Unexpected(
                    "varint in BlockData exceeds 32 bits".to_string(),
                ));
            }
        } else {
            out.push(value);
            value = 0;
            shift = 0;
        }
    }
    if shift != 0 {
        return Err(SchemError::Unexpected(
            "truncated varint at end of BlockData".to_string(),
        ));
    }
    Ok(out)
}

pub(crate) fn write_varints(values: impl IntoIterator<Item = u32>) -> Vec<i8> {
    let mut out = Vec::new();
    for value in values {
        let mut v = value;
        loop {
            if v & !0x7f == 0 {
                out.push(v as u8 as i8);
                break;
            }
            out.push((v as u8 & 0x7f | 0x80) as i8);
            v >>= 7;
        }
    }
    out
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpongeMetadata {
    #[serde(rename = "Name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Author", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Epoch millis.
    #[serde(rename = "Date", default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
    #[serde(
        rename = "RequiredMods",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub required_mods: Option<Vec<String>>,
}

impl SpongeMetadata {
    fn to_shared(&self, fallback_name: String) -> SchematicMetadata {
        SchematicMetadata {
            name: Some(self.name.clone().unwrap_or(fallback_name)),
            author: self.author.clone(),
            description: None,
            date: self.date.and_then(DateTime::from_timestamp_millis),
            serializers: Vec::new(),
        }
    }

    fn from_shared(metadata: &SchematicMetadata, name: String, required_mods: Vec<String>) -> Self {
        SpongeMetadata {
            name: Some(name),
            author: metadata.author.clone(),
            date: metadata.date.map(|d| d.timestamp_millis()),
            required_mods: if required_mods.is_empty() {
                None
            } else {
                Some(required_mods)
            },
        }
    }
}

fn inverse_palette(palette: &BTreeMap<String, i32>) -> Result<BTreeMap<u32, BlockState>> {
    palette
        .iter()
        .map(|(key, &idx)| Ok((idx as u32, key.parse()?)))
        .collect()
}

fn decode_block_matrix(
    width: i16,
    length: i16,
    palette: &BTreeMap<String, i32>,
    block_data: &ByteArray,
) -> Result<BlockMatrix> {
    let palette = inverse_palette(palette)?;
    let bytes: Vec<i8> = block_data.iter().copied().collect();
    let indices = read_varints(&bytes)?;

    let mut matrix = BlockMatrix::new();
    if indices.is_empty() {
        return Ok(matrix);
    }
    let (w, l) = (width as i32, length as i32);
    if w <= 0 || l <= 0 {
        return Err(SchemError::Unexpected(
            "block data present but dimensions are zero".to_string(),
        ));
    }

    for (i, idx) in indices.into_iter().enumerate() {
        let i = i as i32;
        let x = i % w;
        let z = (i / w) % l;
        let y = i / (w * l);
        let state = palette.get(&idx).ok_or(SchemError::PaletteIndex {
            index: idx as usize,
            len: palette.len(),
        })?;
        matrix.insert((x, y, z), Block::new(BlockPos::new(x, y, z), state.clone()));
    }
    Ok(matrix)
}

fn tile_entity_matrix_of(compounds: &[Value]) -> Result<TileEntityMatrix> {
    let mut matrix = TileEntityMatrix::new();
    for value in compounds {
        let entity = Entity::from_compound(value.clone())?;
        let pos = entity.any_tile_pos().unwrap_or_else(|| entity.block_pos());
        matrix.insert(pos.astuple(), entity);
    }
    Ok(matrix)
}

/// Block layout shared by both sponge versions.
struct DenseLayout {
    resolved: ResolvedRegion,
    width: i16,
    height: i16,
    length: i16,
    min_corner: BlockPos,
    palette: Vec<BlockState>,
    indices: Vec<u32>,
    required_mods: Vec<String>,
}

fn dense_layout(region: &dyn Region, target: Option<&MinecraftVersion>) -> Result<DenseLayout> {
    let resolved = resolve_region(region, target)?;
    let (width, height, length) = region.size()?;
    let (min_corner, _) = region.bounding_box()?;
    let (mut palette, air) = palette_with_air(resolved.palette.clone());

    let volume = (width as i64 * height as i64 * length as i64).max(0) as usize;
    let mut indices = vec![air as u32; volume];
    let mut required_mods = Vec::new();

    for block in &resolved.blocks {
        let namespace = block.state.namespace();
        if namespace != "minecraft" && !required_mods.iter().any(|m| m == namespace) {
            required_mods.push(namespace.to_string());
        }

        let idx = match palette.iter().position(|state| *state == block.state) {
            Some(idx) => idx,
            None => {
                palette.push(block.state.clone());
                palette.len() - 1
            }
        };

        let rel = block.pos - min_corner;
        let i = rel.x + rel.z * width + rel.y * width * length;
        if (0..volume as i32).contains(&i) {
            indices[i as usize] = idx as u32;
        }
    }

    Ok(DenseLayout {
        resolved,
        width: axis_i16("Width", width)?,
        height: axis_i16("Height", height)?,
        length: axis_i16("Length", length)?,
        min_corner,
        palette,
        indices,
        required_mods,
    })
}

fn palette_compound(palette: &[BlockState]) -> BTreeMap<String, i32> {
    palette
        .iter()
        .enumerate()
        .map(|(idx, state)| (state.to_string(), idx as i32))
        .collect()
}

fn tile_entity_compounds(layout: &DenseLayout) -> Vec<Value> {
    layout
        .resolved
        .tile_entities
        .iter()
        .map(|(&(x, y, z), entity)| {
            let pos = BlockPos::new(x, y, z) - layout.min_corner;
            entity.to_compound_with_pos_array(pos)
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpongeSchematicV1 {
    #[serde(rename = "Version")]
    pub version: i32,
    #[serde(rename = "Metadata", default)]
    pub metadata: SpongeMetadata,
    #[serde(rename = "Width")]
    pub width: i16,
    #[serde(rename = "Height")]
    pub height: i16,
    #[serde(rename = "Length")]
    pub length: i16,
    #[serde(rename = "Offset")]
    pub offset: IntArray,
    #[serde(rename = "PaletteMax")]
    pub palette_max: i32,
    #[serde(rename = "Palette")]
    pub palette: BTreeMap<String, i32>,
    #[serde(rename = "BlockData")]
    pub block_data: ByteArray,
    #[serde(rename = "TileEntities", default)]
    pub tile_entities: Vec<Value>,
}

impl Region for SpongeSchematicV1 {
    fn block_matrix(&self) -> Result<BlockMatrix> {
        decode_block_matrix(self.width, self.length, &self.palette, &self.block_data)
    }

    fn entities(&self) -> Result<Vec<Entity>> {
        Ok(Vec::new())
    }

    fn tile_entity_matrix(&self) -> Result<TileEntityMatrix> {
        tile_entity_matrix_of(&self.tile_entities)
    }

    fn origin(&self) -> BlockPos {
        BlockPos::ORIGIN
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        // The v1 header carries no version information; 1.13.2 is the guess
        // the format's era justifies.
        Ok(MinecraftVersion::V1_13_2)
    }

    fn size(&self) -> Result<(i32, i32, i32)> {
        Ok((self.width as i32, self.height as i32, self.length as i32))
    }

    fn palette(&self) -> Result<Vec<BlockState>> {
        let inverse = inverse_palette(&self.palette)?;
        Ok(inverse.into_values().collect())
    }
}

impl Schematic for SpongeSchematicV1 {
    fn name(&self) -> String {
        self.metadata
            .name
            .clone()
            .unwrap_or_else(|| format!("unknown sponge schematic, v{}", self.version))
    }

    fn metadata(&self) -> SchematicMetadata {
        self.metadata.to_shared(self.name())
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        Region::minecraft_version(self)
    }

    fn regions(&self) -> Vec<&dyn Region> {
        vec![self]
    }
}

impl SchematicFormat for SpongeSchematicV1 {
    const DESCRIPTION: &'static str = "Sponge v1 (.schem files)";
    const EXTENSION: &'static str = "schem";

    fn default_version() -> MinecraftVersion {
        MinecraftVersion::V1_13_2
    }

    fn load(bytes: &[u8]) -> Result<Self> {
        nbt::from_bytes(bytes)
    }

    fn dump(&self) -> Result<Vec<u8>> {
        nbt::to_gzip_bytes(self, ROOT_NAME)
    }

    fn from_schematic(source: &dyn Schematic, target: Option<&MinecraftVersion>) -> Result<Self> {
        let region = single_region(source)?;
        let layout = dense_layout(region, target)?;
        let tile_entities = tile_entity_compounds(&layout);

        Ok(SpongeSchematicV1 {
            version: 1,
            metadata: SpongeMetadata::from_shared(
                &source.metadata(),
                source.name(),
                layout.required_mods.clone(),
            ),
            width: layout.width,
            height: layout.height,
            length: layout.length,
            offset: IntArray::new(vec![
                layout.min_corner.x,
                layout.min_corner.y,
                layout.min_corner.z,
            ]),
            palette_max: layout.palette.len() as i32,
            palette: palette_compound(&layout.palette),
            block_data: ByteArray::new(write_varints(layout.indices.iter().copied())),
            tile_entities,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpongeSchematicV2 {
    #[serde(rename = "Version")]
    pub version: i32,
    #[serde(rename = "DataVersion")]
    pub data_version: i32,
    #[serde(rename = "Metadata", default)]
    pub metadata: SpongeMetadata,
    #[serde(rename = "Width")]
    pub width: i16,
    #[serde(rename = "Height")]
    pub height: i16,
    #[serde(rename = "Length")]
    pub length: i16,
    #[serde(rename = "Offset")]
    pub offset: IntArray,
    #[serde(rename = "PaletteMax")]
    pub palette_max: i32,
    #[serde(rename = "Palette")]
    pub palette: BTreeMap<String, i32>,
    #[serde(rename = "BlockData")]
    pub block_data: ByteArray,
    #[serde(rename = "BlockEntities", default)]
    pub block_entities: Vec<Value>,
    #[serde(rename = "Entities", default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<Value>,
}

impl Region for SpongeSchematicV2 {
    fn block_matrix(&self) -> Result<BlockMatrix> {
        decode_block_matrix(self.width, self.length, &self.palette, &self.block_data)
    }

    fn entities(&self) -> Result<Vec<Entity>> {
        self.entities
            .iter()
            .map(|value| Entity::from_compound(value.clone()))
            .collect()
    }

    fn tile_entity_matrix(&self) -> Result<TileEntityMatrix> {
        tile_entity_matrix_of(&self.block_entities)
    }

    fn origin(&self) -> BlockPos {
        BlockPos::ORIGIN
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        Ok(MinecraftVersion::from_data_version(self.data_version))
    }

    fn size(&self) -> Result<(i32, i32, i32)> {
        Ok((self.width as i32, self.height as i32, self.length as i32))
    }

    fn palette(&self) -> Result<Vec<BlockState>> {
        let inverse = inverse_palette(&self.palette)?;
        Ok(inverse.into_values().collect())
    }
}

impl Schematic for SpongeSchematicV2 {
    fn name(&self) -> String {
        self.metadata
            .name
            .clone()
            .unwrap_or_else(|| format!("unknown sponge schematic, v{}", self.version))
    }

    fn metadata(&self) -> SchematicMetadata {
        self.metadata.to_shared(self.name())
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        Region::minecraft_version(self)
    }

    fn regions(&self) -> Vec<&dyn Region> {
        vec![self]
    }
}

impl SchematicFormat for SpongeSchematicV2 {
    const DESCRIPTION: &'static str = "Sponge v2 (.schem files)";
    const EXTENSION: &'static str = "schem";

    fn default_version() -> MinecraftVersion {
        MinecraftVersion::V1_17_1
    }

    fn load(bytes: &[u8]) -> Result<Self> {
        nbt::from_bytes(bytes)
    }

    fn dump(&self) -> Result<Vec<u8>> {
        nbt::to_gzip_bytes(self, ROOT_NAME)
    }

    fn from_schematic(source: &dyn Schematic, target: Option<&MinecraftVersion>) -> Result<Self> {
        let region = single_region(source)?;
        let layout = dense_layout(region, target)?;
        let block_entities = tile_entity_compounds(&layout);
        let entities: Vec<Value> = layout
            .resolved
            .entities
            .iter()
            .map(Entity::to_compound)
            .collect();

        Ok(SpongeSchematicV2 {
            version: 2,
            data_version: layout.resolved.version.data_version,
            metadata: SpongeMetadata::from_shared(
                &source.metadata(),
                source.name(),
                layout.required_mods.clone(),
            ),
            width: layout.width,
            height: layout.height,
            length: layout.length,
            offset: IntArray::new(vec![
                layout.min_corner.x,
                layout.min_corner.y,
                layout.min_corner.z,
            ]),
            palette_max: layout.palette.len() as i32,
            palette: palette_compound(&layout.palette),
            block_data: ByteArray::new(write_varints(layout.indices.iter().copied())),
            block_entities,
            entities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_roundtrip() {
        let values = [0u32, 1, 127, 128, 255, 300, 16384, u32::MAX];
        let bytes = write_varints(values.iter().copied());
        assert_eq!(read_varints(&bytes).unwrap(), values);
    }

    #[test]
    fn varints_below_128_are_single_bytes() {
        let bytes = write_varints([0, 5, 127]);
        assert_eq!(bytes, vec![0, 5, 127]);
    }

    #[test]
    fn truncated_varint_is_an_error() {
        assert!(read_varints(&[-0x80i8 /* 0x80: continuation, no tail */]).is_err());
    }

    #[test]
    fn decode_reports_missing_palette_entries() {
        let mut palette = BTreeMap::new();
        palette.insert("minecraft:stone".to_string(), 0);
        let data = ByteArray::new(vec![0, 1]);
        let err = decode_block_matrix(2, 1, &palette, &data).unwrap_err();
        assert!(matches!(err, SchemError::PaletteIndex { index: 1, len: 1 }));
    }

    #[test]
    fn decode_index_order_is_x_z_y() {
        let mut palette = BTreeMap::new();
        palette.insert("minecraft:air".to_string(), 0);
        palette.insert("minecraft:stone".to_string(), 1);
        // 2x2x2 volume, stone at flat index 3 -> x=1, z=1, y=0
        let data = ByteArray::new(write_varints([0, 0, 0, 1, 0, 0, 0, 0]));
        let matrix = decode_block_matrix(2, 2, &palette, &data).unwrap();
        assert_eq!(
            matrix.get(&(1, 0, 1)).map(|b| b.name()),
            Some("minecraft:stone")
        );
    }
}
