//! Cross-format conversion behavior: chains through every writable format,
//! version translation on the way, tile entities, and multi-region sources.

use anyhow::Result;
use schemlib::formats::intermediate::IntermediateRegion;
use schemlib::version_map::MinecraftVersion;
use schemlib::{
    Block, BlockPos, BlockState, BuildingGadgetsV1Schematic, BuildingGadgetsV2Schematic, Entity,
    IntermediateSchematic, LitematicSchematic, Region, SchemError, Schematic, SchematicFormat,
    SchematicMetadata, SpongeSchematicV1, SpongeSchematicV2, StructureSchematic,
    StructurizeBlueprint,
};

fn single_region_schematic(
    name: &str,
    version: MinecraftVersion,
    blocks: Vec<Block>,
    tile_entities: Vec<Entity>,
) -> IntermediateSchematic {
    let size = (1, 1, 1);
    IntermediateSchematic {
        metadata: SchematicMetadata {
            name: Some(name.to_string()),
            ..Default::default()
        },
        name: name.to_string(),
        regions: vec![IntermediateRegion {
            minecraft_version: version,
            origin: BlockPos::ORIGIN,
            size,
            blocks,
            entities: vec![],
            tile_entities,
        }],
        minecraft_version: version,
    }
}

fn stone() -> Vec<Block> {
    vec![Block::new(
        BlockPos::ORIGIN,
        BlockState::new("minecraft:stone"),
    )]
}

fn assert_stone_region(schematic: &dyn Schematic) -> Result<()> {
    let regions = schematic.regions();
    assert_eq!(regions.len(), 1);
    let blocks: Vec<Block> = regions[0]
        .blocks()?
        .into_iter()
        .filter(|b| !b.state.is_air())
        .collect();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].state.name, "minecraft:stone");
    Ok(())
}

#[test]
fn conversion_chain_through_every_format() -> Result<()> {
    let start = single_region_schematic("chain", MinecraftVersion::V1_20_1, stone(), vec![]);

    let sponge2 =
        SpongeSchematicV2::from_schematic(&start, Some(&SpongeSchematicV2::default_version()))?;
    assert_stone_region(&sponge2)?;

    let litematic =
        LitematicSchematic::from_schematic(&sponge2, Some(&LitematicSchematic::default_version()))?;
    assert_stone_region(&litematic)?;

    let structure =
        StructureSchematic::from_schematic(&litematic, Some(&StructureSchematic::default_version()))?;
    assert_stone_region(&structure)?;

    let blueprint =
        StructurizeBlueprint::from_schematic(&structure, Some(&StructurizeBlueprint::default_version()))?;
    assert_stone_region(&blueprint)?;

    let bg1 = BuildingGadgetsV1Schematic::from_schematic(
        &blueprint,
        Some(&BuildingGadgetsV1Schematic::default_version()),
    )?;
    assert_stone_region(&bg1)?;

    let bg2 = BuildingGadgetsV2Schematic::from_schematic(
        &bg1,
        Some(&BuildingGadgetsV2Schematic::default_version()),
    )?;
    assert_stone_region(&bg2)?;

    let back = IntermediateSchematic::from_schematic(&bg2, None)?;
    assert_stone_region(&back)?;
    assert_eq!(back.regions[0].blocks.len(), 1);
    Ok(())
}

#[test]
fn sponge_v1_roundtrips_through_litematic() -> Result<()> {
    let start = single_region_schematic("roundtrip", MinecraftVersion::V1_13_2, stone(), vec![]);
    let schem = SpongeSchematicV1::from_schematic(&start, None)?;
    let litematic = LitematicSchematic::from_schematic(&schem, None)?;
    let again = SpongeSchematicV1::from_schematic(&litematic, None)?;
    assert_stone_region(&again)?;
    assert_eq!(Region::size(&again)?, (1, 1, 1));
    Ok(())
}

#[test]
fn translation_happens_during_conversion() -> Result<()> {
    let old_slab = vec![Block::new(
        BlockPos::ORIGIN,
        BlockState::with_properties(
            "minecraft:wooden_slab",
            [("variant", "spruce"), ("half", "top")],
        ),
    )];
    let source = single_region_schematic(
        "slab",
        MinecraftVersion::V1_12_2,
        old_slab,
        vec![],
    );

    let schem = SpongeSchematicV2::from_schematic(&source, Some(&MinecraftVersion::V1_20_1))?;
    let expected = BlockState::with_properties("minecraft:spruce_slab", [("type", "top")]);
    assert!(
        schem.palette.contains_key(&expected.to_string()),
        "palette should hold the flattened slab, got {:?}",
        schem.palette.keys().collect::<Vec<_>>()
    );
    assert_eq!(schem.data_version, MinecraftVersion::V1_20_1.data_version);
    Ok(())
}

#[test]
fn no_translation_when_versions_match() -> Result<()> {
    let source = single_region_schematic("same", MinecraftVersion::V1_20_1, stone(), vec![]);
    let schem = SpongeSchematicV2::from_schematic(&source, Some(&MinecraftVersion::V1_20_1))?;
    assert!(schem.palette.contains_key("minecraft:stone"));
    Ok(())
}

#[test]
fn tile_entities_change_position_convention_per_format() -> Result<()> {
    let chest = Entity::from_snbt("{x:0,y:0,z:0,Id:\"minecraft:chest\",Items:[]}")?;
    let source = single_region_schematic(
        "chest",
        MinecraftVersion::V1_20_1,
        stone(),
        vec![chest],
    );

    // sponge stores tile entity positions as a Pos int array
    let schem = SpongeSchematicV2::from_schematic(&source, None)?;
    assert_eq!(schem.block_entities.len(), 1);
    let entity = Entity::from_compound(schem.block_entities[0].clone())?;
    assert_eq!(entity.any_tile_pos(), Some(BlockPos::ORIGIN));
    assert_eq!(entity.get("x"), None);

    // litematic goes back to x/y/z int fields
    let litematic = LitematicSchematic::from_schematic(&schem, None)?;
    let region = litematic.regions.values().next().expect("one region");
    assert_eq!(region.tile_entities.len(), 1);
    let entity = Entity::from_compound(region.tile_entities[0].clone())?;
    assert_eq!(entity.tile_pos(), Some(BlockPos::ORIGIN));

    // structure attaches the compound to the block entry
    let structure = StructureSchematic::from_schematic(&litematic, None)?;
    assert!(structure.blocks[0].nbt.is_some());
    Ok(())
}

#[test]
fn multi_region_sources_only_fit_litematic() -> Result<()> {
    let region = IntermediateRegion {
        minecraft_version: MinecraftVersion::V1_20_1,
        origin: BlockPos::ORIGIN,
        size: (1, 1, 1),
        blocks: stone(),
        entities: vec![],
        tile_entities: vec![],
    };
    let source = IntermediateSchematic {
        metadata: SchematicMetadata::default(),
        name: "twins".to_string(),
        regions: vec![region.clone(), region],
        minecraft_version: MinecraftVersion::V1_20_1,
    };

    let litematic = LitematicSchematic::from_schematic(&source, None)?;
    assert_eq!(litematic.regions.len(), 2);
    assert_eq!(litematic.metadata.region_count, 2);

    match SpongeSchematicV2::from_schematic(&source, None) {
        Err(SchemError::TooManyRegions(2)) => {}
        other => panic!("expected TooManyRegions, got {other:?}"),
    }
    Ok(())
}

#[test]
fn litematic_dump_load_preserves_multiple_regions() -> Result<()> {
    let region = IntermediateRegion {
        minecraft_version: MinecraftVersion::V1_20_1,
        origin: BlockPos::ORIGIN,
        size: (1, 1, 1),
        blocks: stone(),
        entities: vec![],
        tile_entities: vec![],
    };
    let source = IntermediateSchematic {
        metadata: SchematicMetadata::default(),
        name: "twins".to_string(),
        regions: vec![region.clone(), region],
        minecraft_version: MinecraftVersion::V1_20_1,
    };

    let litematic = LitematicSchematic::from_schematic(&source, None)?;
    let bytes = litematic.dump()?;
    let loaded = LitematicSchematic::load(&bytes)?;
    assert_eq!(loaded.regions.len(), 2);
    for region in loaded.regions() {
        assert_eq!(region.minecraft_version()?, MinecraftVersion::V1_20_1);
        assert_eq!(region.blocks()?.len(), 1);
    }
    Ok(())
}

#[test]
fn entities_survive_the_intermediate_json() -> Result<()> {
    let pig = Entity::from_snbt("{Pos:[0.5D,0.0D,0.5D],id:\"minecraft:pig\"}")?;
    let mut source = single_region_schematic("pig", MinecraftVersion::V1_20_1, stone(), vec![]);
    source.regions[0].entities.push(pig.clone());

    let bytes = source.dump()?;
    let loaded = IntermediateSchematic::load(&bytes)?;
    assert_eq!(loaded.regions[0].entities, vec![pig.clone()]);

    // and through a sponge v2 conversion
    let schem = SpongeSchematicV2::from_schematic(&loaded, None)?;
    assert_eq!(schem.entities.len(), 1);
    let back = Entity::from_compound(schem.entities[0].clone())?;
    assert_eq!(back.pos(), pig.pos());
    Ok(())
}
