use uipack_core::ctm::{AtlasLayout, MASK_E, MASK_N, MASK_S, MASK_W, ctm_mask, ctm_tile_offset};
use uipack_core::geom::{CellSet, Rect};

#[test]
fn full_mask_table() {
    let cases: [(u8, (u32, u32)); 16] = [
        (0, (0, 0)),
        // Horizontal strip row.
        (MASK_E, (1, 0)),
        (MASK_E | MASK_W, (2, 0)),
        (MASK_W, (3, 0)),
        // Vertical strip column.
        (MASK_S, (0, 1)),
        (MASK_N | MASK_S, (0, 2)),
        (MASK_N, (0, 3)),
        // Nine-slice interior.
        (MASK_S | MASK_E, (1, 1)),
        (MASK_S | MASK_E | MASK_W, (2, 1)),
        (MASK_S | MASK_W, (3, 1)),
        (MASK_N | MASK_S | MASK_E, (1, 2)),
        (MASK_N | MASK_S | MASK_E | MASK_W, (2, 2)),
        (MASK_N | MASK_S | MASK_W, (3, 2)),
        (MASK_N | MASK_E, (1, 3)),
        (MASK_N | MASK_E | MASK_W, (2, 3)),
        (MASK_N | MASK_W, (3, 3)),
    ];
    for (mask, expected) in cases {
        assert_eq!(ctm_tile_offset(mask), expected, "mask {mask:#06b}");
    }
}

#[test]
fn high_bits_are_ignored() {
    assert_eq!(ctm_tile_offset(0xF0), (0, 0));
    assert_eq!(ctm_tile_offset(0xF0 | MASK_E), (1, 0));
}

#[test]
fn rect_cells_resolve_nine_slice() {
    let cells: CellSet = Rect::new(0, 0, 2, 2).cell_set();
    // Corners, edges and center of a 3x3 block.
    assert_eq!(ctm_tile_offset(ctm_mask(&cells, 0, 0)), (1, 1));
    assert_eq!(ctm_tile_offset(ctm_mask(&cells, 1, 0)), (2, 1));
    assert_eq!(ctm_tile_offset(ctm_mask(&cells, 2, 0)), (3, 1));
    assert_eq!(ctm_tile_offset(ctm_mask(&cells, 0, 1)), (1, 2));
    assert_eq!(ctm_tile_offset(ctm_mask(&cells, 1, 1)), (2, 2));
    assert_eq!(ctm_tile_offset(ctm_mask(&cells, 2, 2)), (3, 3));
}

#[test]
fn single_row_resolves_as_strip() {
    let cells: CellSet = Rect::new(3, 5, 6, 5).cell_set();
    assert_eq!(ctm_tile_offset(ctm_mask(&cells, 3, 5)), (1, 0));
    assert_eq!(ctm_tile_offset(ctm_mask(&cells, 4, 5)), (2, 0));
    assert_eq!(ctm_tile_offset(ctm_mask(&cells, 6, 5)), (3, 0));
}

#[test]
fn layout_mask_overrides_win() {
    let mapping = serde_json::json!({
        "tile_px": 16,
        "module": {"ctm_size_tiles": 4},
        "ctm_origins": {
            "button": {"module": [2, 0]},
            "scaled": {"tile": [9, 4]},
        },
        "entry_tool_modules": {
            "button_standard": {"base": "button"},
            "not_a_tool": {"base": "button"},
        },
        "ctm_mask_to_offset": {"15": [3, 0]},
    });
    let layout = AtlasLayout::from_json(&mapping).expect("mapping");
    assert_eq!(layout.module_origin("button"), Some((8, 0)));
    assert_eq!(layout.module_origin("scaled"), Some((9, 4)));
    assert_eq!(layout.tile_offset(15), (3, 0));
    // Non-overridden masks fall through to the standard table.
    assert_eq!(layout.tile_offset(MASK_E), (1, 0));
}
