//! Building Gadgets templates, all three generations.
//!
//! - v0 (Minecraft 1.12): a bare SNBT compound with packed 24-bit positions.
//! - v1 (1.14–1.19): a JSON envelope whose `body` is base64 of gzipped NBT,
//!   block positions packed into longs.
//! - v2 (1.20+): a JSON envelope whose `statePosArrayList` is an SNBT string
//!   over a dense state array.

use std::collections::{BTreeMap, HashMap};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use fastnbt::{IntArray, Value};
use serde::{Deserialize, Serialize};

use crate::blocks::{Block, BlockPos, BlockState};
use crate::entities::Entity;
use crate::error::{Result, SchemError};
use crate::formats::{
    BlockMatrix, Region, Schematic, SchematicFormat, SchematicMetadata, TileEntityMatrix,
    resolve_region, single_region,
};
use crate::version_map::MinecraftVersion;
use crate::{nbt, snbt};

/// `{X: …, Y: …, Z: …}` compounds; lowercase keys are accepted on read.
mod bg_pos {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::blocks::BlockPos;

    #[derive(Serialize, Deserialize)]
    struct Raw {
        #[serde(rename = "X", alias = "x")]
        x: i32,
        #[serde(rename = "Y", alias = "y")]
        y: i32,
        #[serde(rename = "Z", alias = "z")]
        z: i32,
    }

    pub fn serialize<S: Serializer>(
        pos: &BlockPos,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        Raw {
            x: pos.x,
            y: pos.y,
            z: pos.z,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<BlockPos, D::Error> {
        let raw = Raw::deserialize(deserializer)?;
        Ok(BlockPos::new(raw.x, raw.y, raw.z))
    }
}

// ---------------------------------------------------------------------------
// v0

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingGadgetsV0MapEntry {
    #[serde(rename = "mapSlot")]
    pub map_slot: i16,
    #[serde(rename = "mapState")]
    pub map_state: BlockState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingGadgetsV0Schematic {
    #[serde(rename = "stateIntArray")]
    pub state_int_array: IntArray,
    pub dim: i32,
    #[serde(rename = "posIntArray")]
    pub pos_int_array: IntArray,
    #[serde(rename = "startPos", with = "bg_pos")]
    pub start_pos: BlockPos,
    #[serde(rename = "endPos", with = "bg_pos")]
    pub end_pos: BlockPos,
    #[serde(rename = "mapIntState")]
    pub map_int_state: Vec<BuildingGadgetsV0MapEntry>,
}

/// Positions are packed as three sign-extended bytes: `x<<16 | y<<8 | z`.
fn v0_pos_from_int(v: i32) -> BlockPos {
    BlockPos::new(
        (v >> 16 & 0xFF) as u8 as i8 as i32,
        (v >> 8 & 0xFF) as u8 as i8 as i32,
        (v & 0xFF) as u8 as i8 as i32,
    )
}

impl Region for BuildingGadgetsV0Schematic {
    fn block_matrix(&self) -> Result<BlockMatrix> {
        let palette: HashMap<i16, &BlockState> = self
            .map_int_state
            .iter()
            .map(|entry| (entry.map_slot, &entry.map_state))
            .collect();

        let positions: Vec<BlockPos> = self
            .pos_int_array
            .iter()
            .map(|&v| v0_pos_from_int(v))
            .collect();
        let offset = positions
            .iter()
            .copied()
            .reduce(|lo, p| BlockPos::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)))
            .unwrap_or(BlockPos::ORIGIN);

        let mut matrix = BlockMatrix::new();
        for (idx, pos) in positions.into_iter().enumerate() {
            let slot = self
                .state_int_array
                .iter()
                .nth(idx)
                .copied()
                .ok_or_else(|| {
                    SchemError::Unexpected(
                        "posIntArray and stateIntArray lengths differ".to_string(),
                    )
                })?;
            let state = palette
                .get(&(slot as i16))
                .ok_or(SchemError::PaletteIndex {
                    index: slot as usize,
                    len: palette.len(),
                })?;
            let pos = pos - offset;
            matrix.insert(pos.astuple(), Block::new(pos, (*state).clone()));
        }
        Ok(matrix)
    }

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
        Ok(MinecraftVersion::V1_12_2)
    }
}

impl Schematic for BuildingGadgetsV0Schematic {
    fn name(&self) -> String {
        "unknown 1.12 building gadgets template".to_string()
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

impl SchematicFormat for BuildingGadgetsV0Schematic {
    const DESCRIPTION: &'static str = "Building Gadgets (Minecraft 1.12) Template";
    const EXTENSION: &'static str = "txt";

    fn default_version() -> MinecraftVersion {
        MinecraftVersion::V1_12_2
    }

    fn load(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| SchemError::Unexpected(format!("template is not utf-8: {e}")))?;
        Ok(fastnbt::from_value(&snbt::from_snbt(text)?)?)
    }

    fn dump(&self) -> Result<Vec<u8>> {
        let value = fastnbt::to_value(self)?;
        Ok(snbt::to_snbt(&value).into_bytes())
    }

    fn from_schematic(
        _source: &dyn Schematic,
        _target: Option<&MinecraftVersion>,
    ) -> Result<Self> {
        Err(SchemError::Unsupported(
            "converting into Building Gadgets 1.12 templates",
        ))
    }
}

// ---------------------------------------------------------------------------
// v1

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_y: i32,
    pub max_z: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialListEntry {
    pub item_type: String,
    pub count: i32,
    pub item: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialList {
    pub root_type: String,
    #[serde(default)]
    pub root_entry: Vec<MaterialListEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingGadgetsV1Header {
    pub version: String,
    pub mc_version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub bounding_box: BoundingBox,
    pub material_list: MaterialList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingGadgetsV1BlockData {
    pub data: Value,
    pub state: BlockState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serializer: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingGadgetsV1Bounds {
    #[serde(rename = "minX")]
    pub min_x: i32,
    #[serde(rename = "minY")]
    pub min_y: i32,
    #[serde(rename = "minZ")]
    pub min_z: i32,
    #[serde(rename = "maxX")]
    pub max_x: i32,
    #[serde(rename = "maxY")]
    pub max_y: i32,
    #[serde(rename = "maxZ")]
    pub max_z: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingGadgetsV1BodyHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub bounds: BuildingGadgetsV1Bounds,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingGadgetsV1Body {
    pub data: Vec<BuildingGadgetsV1BlockData>,
    pub pos: Vec<i64>,
    pub header: BuildingGadgetsV1BodyHeader,
    pub serializer: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct V1Envelope {
    header: BuildingGadgetsV1Header,
    body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingGadgetsV1Schematic {
    pub header: BuildingGadgetsV1Header,
    pub body: BuildingGadgetsV1Body,
}

/// `state<<40 | x<<24 | y<<16 | z` with 16-bit x/z and 8-bit y.
pub(crate) fn v1_unpack_pos(v: i64) -> (BlockPos, u32) {
    let x = (v >> 24 & 0xFFFF) as i32;
    let y = (v >> 16 & 0xFF) as i32;
    let z = (v & 0xFFFF) as i32;
    let state = (v >> 40 & 0xFFFFFF) as u32;
    (BlockPos::new(x, y, z), state)
}

pub(crate) fn v1_pack_pos(pos: BlockPos, state: u32) -> i64 {
    ((state as i64 & 0xFFFFFF) << 40)
        | ((pos.x as i64 & 0xFFFF) << 24)
        | ((pos.y as i64 & 0xFF) << 16)
        | (pos.z as i64 & 0xFFFF)
}

const V1_MAX_WIDTH: i32 = 65535;
const V1_MAX_HEIGHT: i32 = 255;
const V1_MAX_LENGTH: i32 = 65535;

impl Region for BuildingGadgetsV1Schematic {
    fn block_matrix(&self) -> Result<BlockMatrix> {
        let palette: Vec<&BlockState> = self.body.data.iter().map(|d| &d.state).collect();
        let mut matrix = BlockMatrix::new();
        for &packed in &self.body.pos {
            let (pos, idx) = v1_unpack_pos(packed);
            let state = palette.get(idx as usize).ok_or(SchemError::PaletteIndex {
                index: idx as usize,
                len: palette.len(),
            })?;
            matrix.insert(pos.astuple(), Block::new(pos, (*state).clone()));
        }
        Ok(matrix)
    }

    fn entities(&self) -> Result<Vec<Entity>> {
        Ok(Vec::new())
    }

    fn tile_entity_matrix(&self) -> Result<TileEntityMatrix> {
        Ok(TileEntityMatrix::new())
    }

    fn origin(&self) -> BlockPos {
        let bb = &self.header.bounding_box;
        BlockPos::new(bb.min_x, bb.min_y, bb.min_z)
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        MinecraftVersion::from_release(&self.header.mc_version)
    }

    fn bounding_box(&self) -> Result<(BlockPos, BlockPos)> {
        let bb = &self.header.bounding_box;
        Ok((
            BlockPos::new(bb.min_x, bb.min_y, bb.min_z),
            BlockPos::new(bb.max_x, bb.max_y, bb.max_z),
        ))
    }

    fn size(&self) -> Result<(i32, i32, i32)> {
        let bb = &self.header.bounding_box;
        Ok((
            bb.max_x - bb.min_x + 1,
            bb.max_y - bb.min_y + 1,
            bb.max_z - bb.min_z + 1,
        ))
    }
}

impl Schematic for BuildingGadgetsV1Schematic {
    fn name(&self) -> String {
        if self.header.name.is_empty() {
            "unknown building gadgets v1 schematic".to_string()
        } else {
            self.header.name.clone()
        }
    }

    fn metadata(&self) -> SchematicMetadata {
        SchematicMetadata {
            name: Some(self.name()),
            author: self.header.author.clone(),
            serializers: self.body.serializer.clone(),
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

impl SchematicFormat for BuildingGadgetsV1Schematic {
    const DESCRIPTION: &'static str = "Building Gadgets (Minecraft 1.14-1.19) Template";
    const EXTENSION: &'static str = "txt";

    fn default_version() -> MinecraftVersion {
        MinecraftVersion::V1_17_1
    }

    fn load(bytes: &[u8]) -> Result<Self> {
        let envelope: V1Envelope = serde_json::from_slice(bytes)?;
        let body_bytes = BASE64.decode(envelope.body.as_bytes())?;
        let body: BuildingGadgetsV1Body = nbt::from_bytes(&body_bytes)?;
        Ok(BuildingGadgetsV1Schematic {
            header: envelope.header,
            body,
        })
    }

    fn dump(&self) -> Result<Vec<u8>> {
        let body_bytes = nbt::to_gzip_bytes(&self.body, "")?;
        let envelope = V1Envelope {
            header: self.header.clone(),
            body: BASE64.encode(&body_bytes),
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    fn check_size(width: i32, height: i32, length: i32) -> Result<()> {
        if width > V1_MAX_WIDTH {
            return Err(SchemError::SizeLimit {
                axis: "Width",
                value: width as i64,
                max: V1_MAX_WIDTH as i64,
            });
        }
        if height > V1_MAX_HEIGHT {
            return Err(SchemError::SizeLimit {
                axis: "Height",
                value: height as i64,
                max: V1_MAX_HEIGHT as i64,
            });
        }
        if length > V1_MAX_LENGTH {
            return Err(SchemError::SizeLimit {
                axis: "Length",
                value: length as i64,
                max: V1_MAX_LENGTH as i64,
            });
        }
        Ok(())
    }

    fn from_schematic(source: &dyn Schematic, target: Option<&MinecraftVersion>) -> Result<Self> {
        let region = single_region(source)?;
        let (pos1, pos2) = region.bounding_box()?;
        let (width, height, length) = region.size()?;
        Self::check_size(width, height, length)?;

        let metadata = source.metadata();
        let serializers = if metadata.serializers.is_empty() {
            vec!["buildinggadgets:dummy_serializer".to_string()]
        } else {
            metadata.serializers.clone()
        };

        let resolved = resolve_region(region, target)?;

        let mut data: Vec<BuildingGadgetsV1BlockData> = Vec::new();
        let mut pos = Vec::new();
        for block in &resolved.blocks {
            if block.state.is_air() {
                continue;
            }
            let idx = match data.iter().position(|entry| entry.state == block.state) {
                Some(idx) => idx,
                None => {
                    data.push(BuildingGadgetsV1BlockData {
                        data: Value::Compound(HashMap::new()),
                        state: block.state.clone(),
                        serializer: Some(0),
                    });
                    data.len() - 1
                }
            };
            pos.push(v1_pack_pos(block.pos - pos1, idx as u32));
        }

        let name = source.name();
        let author = metadata.author.clone().unwrap_or_default();
        let version = resolved.version.to_string();
        let rel = pos2 - pos1;

        Ok(BuildingGadgetsV1Schematic {
            header: BuildingGadgetsV1Header {
                version: version.clone(),
                mc_version: version,
                name: name.clone(),
                author: Some(author.clone()),
                bounding_box: BoundingBox {
                    min_x: 0,
                    min_y: 0,
                    min_z: 0,
                    max_x: rel.x,
                    max_y: rel.y,
                    max_z: rel.z,
                },
                material_list: MaterialList {
                    root_type: "buildinggadgets:entries".to_string(),
                    root_entry: Vec::new(),
                },
            },
            body: BuildingGadgetsV1Body {
                data,
                pos,
                header: BuildingGadgetsV1BodyHeader {
                    author: Some(author),
                    bounds: BuildingGadgetsV1Bounds {
                        min_x: 0,
                        min_y: 0,
                        min_z: 0,
                        max_x: rel.x,
                        max_y: rel.y,
                        max_z: rel.z,
                    },
                    name,
                },
                serializer: serializers,
            },
        })
    }
}

// ---------------------------------------------------------------------------
// v2

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePosArrayList {
    #[serde(rename = "blockstatemap")]
    pub blockstate_map: Vec<BlockState>,
    #[serde(rename = "startpos", with = "bg_pos")]
    pub start_pos: BlockPos,
    #[serde(rename = "endpos", with = "bg_pos")]
    pub end_pos: BlockPos,
    #[serde(rename = "statelist")]
    pub state_list: IntArray,
}

#[derive(Serialize, Deserialize)]
struct V2Envelope {
    name: String,
    #[serde(rename = "statePosArrayList")]
    state_pos_array_list: String,
    #[serde(rename = "requiredItems")]
    required_items: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildingGadgetsV2Schematic {
    pub name: String,
    pub state_pos_array_list: StatePosArrayList,
    pub required_items: BTreeMap<String, i64>,
}

const V2_MAX_AXIS: i32 = 500;
const V2_MAX_VOLUME: i64 = 100000;

impl Region for BuildingGadgetsV2Schematic {
    fn block_matrix(&self) -> Result<BlockMatrix> {
        let palette = &self.state_pos_array_list.blockstate_map;
        let (width, height, length) = self.size()?;

        let state_list: Vec<i32> = self.state_pos_array_list.state_list.iter().copied().collect();
        let mut matrix = BlockMatrix::new();
        for y in 0..height {
            for z in 0..length {
                for x in 0..width {
                    let i = (x + y * width + z * height * width) as usize;
                    let idx = *state_list.get(i).ok_or_else(|| {
                        SchemError::Unexpected(
                            "statelist shorter than the template volume".to_string(),
                        )
                    })? as usize;
                    let state = palette.get(idx).ok_or(SchemError::PaletteIndex {
                        index: idx,
                        len: palette.len(),
                    })?;
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
        Ok(Vec::new())
    }

    fn tile_entity_matrix(&self) -> Result<TileEntityMatrix> {
        Ok(TileEntityMatrix::new())
    }

    fn origin(&self) -> BlockPos {
        self.state_pos_array_list.start_pos
    }

    fn minecraft_version(&self) -> Result<MinecraftVersion> {
        Ok(MinecraftVersion::V1_20_1)
    }

    fn bounding_box(&self) -> Result<(BlockPos, BlockPos)> {
        Ok((
            self.state_pos_array_list.start_pos,
            self.state_pos_array_list.end_pos,
        ))
    }

    fn size(&self) -> Result<(i32, i32, i32)> {
        let dim = self.state_pos_array_list.end_pos - self.state_pos_array_list.start_pos;
        Ok((dim.x.abs() + 1, dim.y.abs() + 1, dim.z.abs() + 1))
    }
}

impl Schematic for BuildingGadgetsV2Schematic {
    fn name(&self) -> String {
        if self.name.is_empty() {
            "unknown building gadgets v2 schematic".to_string()
        } else {
            self.name.clone()
        }
    }

    fn metadata(&self) -> SchematicMetadata {
        SchematicMetadata {
            name: Some(self.name()),
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

impl SchematicFormat for BuildingGadgetsV2Schematic {
    const DESCRIPTION: &'static str = "Building Gadgets 2 (Minecraft 1.20+) Template";
    const EXTENSION: &'static str = "txt";

    fn default_version() -> MinecraftVersion {
        MinecraftVersion::V1_20_1
    }

    fn load(bytes: &[u8]) -> Result<Self> {
        let envelope: V2Envelope = serde_json::from_slice(bytes)?;
        let value = snbt::from_snbt(&envelope.state_pos_array_list)?;
        Ok(BuildingGadgetsV2Schematic {
            name: envelope.name,
            state_pos_array_list: fastnbt::from_value(&value)?,
            required_items: envelope.required_items,
        })
    }

    fn dump(&self) -> Result<Vec<u8>> {
        let value = fastnbt::to_value(&self.state_pos_array_list)?;
        let envelope = V2Envelope {
            name: self.name.clone(),
            state_pos_array_list: snbt::to_snbt(&value),
            required_items: self.required_items.clone(),
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    fn check_size(width: i32, height: i32, length: i32) -> Result<()> {
        for (axis, value) in [("Width", width), ("Height", height), ("Length", length)] {
            if value > V2_MAX_AXIS {
                return Err(SchemError::SizeLimit {
                    axis,
                    value: value as i64,
                    max: V2_MAX_AXIS as i64,
                });
            }
        }
        let volume = width as i64 * height as i64 * length as i64;
        if volume > V2_MAX_VOLUME {
            return Err(SchemError::VolumeLimit {
                volume,
                max: V2_MAX_VOLUME,
            });
        }
        Ok(())
    }

    fn from_schematic(source: &dyn Schematic, target: Option<&MinecraftVersion>) -> Result<Self> {
        let region = single_region(source)?;
        let (pos1, pos2) = region.bounding_box()?;
        let (width, height, length) = region.size()?;
        Self::check_size(width, height, length)?;

        let resolved = resolve_region(region, target)?;
        let (mut palette, air) =
            crate::formats::palette_with_air(resolved.palette.clone());

        let volume = (width as i64 * height as i64 * length as i64).max(0) as usize;
        let mut state_list = vec![air as i32; volume];
        let mut required_items: BTreeMap<String, i64> = BTreeMap::new();

        for block in &resolved.blocks {
            if block.state.is_air() {
                continue;
            }
            let idx = match palette.iter().position(|s| *s == block.state) {
                Some(idx) => idx,
                None => {
                    palette.push(block.state.clone());
                    palette.len() - 1
                }
            };
            let rel = block.pos - pos1;
            let i = rel.x + rel.y * width + rel.z * width * height;
            if (0..volume as i32).contains(&i) {
                state_list[i as usize] = idx as i32;
            }
            *required_items.entry(block.state.name.clone()).or_insert(0) += 1;
        }

        Ok(BuildingGadgetsV2Schematic {
            name: source.name(),
            state_pos_array_list: StatePosArrayList {
                blockstate_map: palette,
                start_pos: BlockPos::ORIGIN,
                end_pos: pos2 - pos1,
                state_list: IntArray::new(state_list),
            },
            required_items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v0_positions_sign_extend() {
        assert_eq!(v0_pos_from_int(0x010203), BlockPos::new(1, 2, 3));
        assert_eq!(v0_pos_from_int(0x00FF00), BlockPos::new(0, -1, 0));
        assert_eq!(v0_pos_from_int(0xFF0080), BlockPos::new(-1, 0, -128));
    }

    #[test]
    fn v1_pos_packing_roundtrip() {
        for (pos, state) in [
            (BlockPos::new(0, 0, 0), 0),
            (BlockPos::new(1, 2, 3), 7),
            (BlockPos::new(65535, 255, 65535), 0xFFFFFF),
        ] {
            let packed = v1_pack_pos(pos, state);
            assert_eq!(v1_unpack_pos(packed), (pos, state));
        }
    }

    #[test]
    fn v0_template_parses_from_snbt() {
        let text = "{stateIntArray:[I;0],dim:0,posIntArray:[I;0],startPos:{X:0,Y:0,Z:0},\
                    endPos:{X:0,Y:0,Z:0},mapIntState:[{mapSlot:0S,mapState:{Name:\"minecraft:stone\"}}]}";
        let template = BuildingGadgetsV0Schematic::load(text.as_bytes()).unwrap();
        let matrix = template.block_matrix().unwrap();
        assert_eq!(matrix.len(), 1);
        assert_eq!(
            matrix.get(&(0, 0, 0)).map(|b| b.name()),
            Some("minecraft:stone")
        );

        // and back out through SNBT
        let dumped = template.dump().unwrap();
        let again = BuildingGadgetsV0Schematic::load(&dumped).unwrap();
        assert_eq!(again.block_matrix().unwrap(), matrix);
    }

    #[test]
    fn v0_cannot_be_written_from_other_formats() {
        let text = "{stateIntArray:[I;0],dim:0,posIntArray:[I;0],startPos:{X:0,Y:0,Z:0},\
                    endPos:{X:0,Y:0,Z:0},mapIntState:[{mapSlot:0S,mapState:{Name:\"minecraft:stone\"}}]}";
        let template = BuildingGadgetsV0Schematic::load(text.as_bytes()).unwrap();
        assert!(matches!(
            BuildingGadgetsV1Schematic::from_schematic(&template, None),
            Ok(_)
        ));
        assert!(matches!(
            BuildingGadgetsV0Schematic::from_schematic(&template, None),
            Err(SchemError::Unsupported(_))
        ));
    }

    #[test]
    fn v2_size_limits() {
        assert!(BuildingGadgetsV2Schematic::check_size(1, 1, 1).is_ok());
        assert!(matches!(
            BuildingGadgetsV2Schematic::check_size(501, 1, 1),
            Err(SchemError::SizeLimit { axis: "Width", .. })
        ));
        assert!(matches!(
            BuildingGadgetsV2Schematic::check_size(500, 500, 500),
            Err(SchemError::VolumeLimit { .. })
        ));
    }

    #[test]
    fn v1_size_limits() {
        assert!(matches!(
            BuildingGadgetsV1Schematic::check_size(1, 256, 1),
            Err(SchemError::SizeLimit { axis: "Height", .. })
        ));
    }
}
