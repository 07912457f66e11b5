use alignmark_core::{cell_id, Unit};
use alignmark_io::read_gds_file;
use alignmark_pattern::config::{OutputConfig, SizeConfig};
use alignmark_pattern::{
    generate_single_cross, write_array, CrossConfig, MarkConfig, CROSS_CELL, EXAMPLE_FILENAME,
    TOP_CELL,
};

fn small_config(dir: &std::path::Path) -> MarkConfig {
    MarkConfig {
        pattern: Some(SizeConfig {
            size: 4.0,
            unit: Unit::Millimeter,
        }),
        output: OutputConfig {
            directory: dir.to_path_buf(),
            filename: None,
            overwrite: false,
        },
        ..MarkConfig::default()
    }
}

#[test]
fn array_survives_gds_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());

    let (array, path) = write_array(&config).unwrap();
    assert_eq!(path, dir.path().join("76.2mm_wafer_alignmentMarks.gds"));

    let db = read_gds_file(&path).unwrap();
    assert_eq!(db.cell_names(), vec![TOP_CELL, CROSS_CELL]);
    assert_eq!(db.top_cell, Some(cell_id(TOP_CELL)));

    let top = db.find_cell_by_name(TOP_CELL).unwrap();
    assert_eq!(top.instance_count(), array.plan.cross_count());
    assert_eq!(top.instance_count(), 12);

    let cross = db.find_cell_by_name(CROSS_CELL).unwrap();
    assert_eq!(cross.shape_count(), 1);
    let layer = db.layer_stack.get(cross.shapes[0].layer_id).unwrap();
    assert_eq!((layer.gds_layer, layer.gds_datatype), (1, 0));

    let text_layer = db.layer_stack.by_gds(2, 0).unwrap();
    let written_area: i64 = top
        .shapes_on_layer(text_layer.id)
        .map(|p| p.area())
        .sum();
    let original = array.layout.find_cell_by_name(TOP_CELL).unwrap();
    let expected_area: i64 = original.shapes.iter().map(|s| s.polygon.area()).sum();
    assert_eq!(written_area, expected_area);

    assert_eq!(
        db.cell_bbox(&cell_id(TOP_CELL)),
        array.layout.cell_bbox(&cell_id(TOP_CELL))
    );
}

#[test]
fn repeated_runs_do_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_config(dir.path());

    let (_, first) = write_array(&config).unwrap();
    let (_, second) = write_array(&config).unwrap();
    assert_ne!(first, second);
    assert_eq!(second, dir.path().join("76.2mm_wafer_alignmentMarks_1.gds"));
    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap()
    );
}

#[test]
fn single_cross_example_writes_one_instance() {
    let dir = tempfile::tempdir().unwrap();
    let db = generate_single_cross(&CrossConfig::example(), &Default::default()).unwrap();
    let path = alignmark_io::save_layout(&db, dir.path(), EXAMPLE_FILENAME, true).unwrap();
    assert_eq!(path, dir.path().join("Experimental Pattern.gds"));

    let read = read_gds_file(&path).unwrap();
    let top = read.find_cell_by_name(TOP_CELL).unwrap();
    assert_eq!(top.instance_count(), 1);
    assert_eq!(top.instances[0].cell_id, cell_id(CROSS_CELL));
}
