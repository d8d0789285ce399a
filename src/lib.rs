//! schemlib — typed parsing of Minecraft schematics
//!
//! This crate reads and writes the common schematic file formats (Sponge
//! `.schem` v1/v2, Litematica `.litematic`, vanilla structure `.nbt`,
//! Structurize `.blueprint`, Building Gadgets templates v0/v1/v2 and a
//! generic intermediate JSON form) as typed, validated models. Loaded
//! schematics expose their contents through the [`Schematic`] and [`Region`]
//! traits and convert into any writable format via
//! [`SchematicFormat::from_schematic`], optionally translating block states
//! between Minecraft versions on the way.
//!
//! ```rust,no_run
//! use schemlib::{LitematicSchematic, SchematicFormat, SpongeSchematicV2};
//!
//! # fn main() -> schemlib::Result<()> {
//! let bytes = std::fs::read("house.litematic")?;
//! let litematic = LitematicSchematic::load(&bytes)?;
//! let schem = SpongeSchematicV2::from_schematic(&litematic, None)?;
//! std::fs::write("house.schem", schem.dump()?)?;
//! # Ok(())
//! # }
//! ```

pub mod blocks;
pub mod entities;
pub mod error;
pub mod formats;
pub mod nbt;
pub mod snbt;
pub mod version_map;

pub use crate::blocks::{Block, BlockPos, BlockState, EntityPos};
pub use crate::entities::Entity;
pub use crate::error::{Result, SchemError};
pub use crate::formats::blueprint::StructurizeBlueprint;
pub use crate::formats::building_gadgets::{
    BuildingGadgetsV0Schematic, BuildingGadgetsV1Schematic, BuildingGadgetsV2Schematic,
};
pub use crate::formats::intermediate::IntermediateSchematic;
pub use crate::formats::litematic::LitematicSchematic;
pub use crate::formats::sponge::{SpongeSchematicV1, SpongeSchematicV2};
pub use crate::formats::structure::StructureSchematic;
pub use crate::formats::{
    DetectedFormat, Region, Schematic, SchematicFormat, SchematicMetadata, detect,
};
pub use crate::version_map::{BlockMapper, MinecraftVersion};
