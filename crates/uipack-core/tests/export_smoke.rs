use image::{Rgba, RgbaImage};
use serde_json::Value;
use uipack_core::atlas::{AtlasSource, SkinPack};
use uipack_core::ctm::AtlasLayout;
use uipack_core::compose::{compose_block, compose_variant, requires_component_export};
use uipack_core::error::Result;
use uipack_core::export::{ArtifactWriter, ExportConfig, plan_export, runtime_manifest, write_export};
use uipack_core::geom::Rect;
use uipack_core::model::{Entry, EntryMeta, HoverText, PageAction, Project, Tool};
use uipack_core::pack::BlockKey;

/// Synthetic modules atlas: every 16px tile gets a distinct uniform color so
/// blits can be traced back to their source tile.
fn test_atlas() -> AtlasSource {
    let img = RgbaImage::from_fn(256, 256, |x, y| {
        let tx = (x / 16) as u8;
        let ty = (y / 16) as u8;
        Rgba([tx * 16, ty * 16, 7, 255])
    });
    AtlasSource::from_image(img, 16).expect("atlas")
}

fn entry(id: i32, uid: i64, tool: Tool, rect: Rect) -> Entry {
    Entry {
        id,
        uid,
        tool,
        rect,
        active: false,
        label: String::new(),
        meta: EntryMeta::default(),
    }
}

fn sample_project() -> Project {
    let mut project = Project::new(16);
    project.name = "demo".into();
    let page = project.page_mut(1).expect("page 1");
    page.grid.set(0, 5, true);

    let mut a = entry(1, 1, Tool::ButtonStandard, Rect::new(0, 0, 1, 0));
    a.meta.hover = Some(HoverText {
        enabled: true,
        text: "hi".into(),
    });
    page.insert(a);

    let mut b = entry(2, 2, Tool::ButtonStandard, Rect::new(0, 2, 1, 2));
    b.meta.action = PageAction::Goto { page: 1 };
    page.insert(b);

    page.insert(entry(3, 3, Tool::ButtonToggle, Rect::new(4, 0, 4, 0)));

    let mut list = entry(4, 4, Tool::SelectList, Rect::new(6, 0, 8, 2));
    list.label = "a, b,,c".into();
    page.insert(list);

    page.insert(entry(5, 5, Tool::TextSlot, Rect::new(10, 0, 10, 0)));
    project
}

#[test]
fn variant_blits_the_mapped_tile() {
    let atlas = test_atlas();
    let layout = AtlasLayout::default();
    let img = compose_variant(&atlas, &layout, Rect::new(3, 3, 3, 3), "button").expect("variant");
    assert_eq!(img.dimensions(), (16, 16));
    // Single cell has mask 0: tile (0, 0) of the button module at tile (8, 0).
    assert_eq!(*img.get_pixel(0, 0), Rgba([8 * 16, 0, 7, 255]));
}

#[test]
fn block_quadrants_hold_the_variants() {
    let atlas = test_atlas();
    let layout = AtlasLayout::default();
    let e = entry(1, 1, Tool::ButtonStandard, Rect::new(0, 0, 1, 0));
    let block = compose_block(&atlas, &layout, &e)
        .expect("compose")
        .expect("button exports");
    assert_eq!(block.dimensions(), (64, 32));

    let base = compose_variant(&atlas, &layout, e.rect, "button").expect("base");
    let hover = compose_variant(&atlas, &layout, e.rect, "button_hover").expect("hover");
    let locked = compose_variant(&atlas, &layout, e.rect, "button_locked").expect("locked");
    assert_eq!(*block.get_pixel(0, 0), *base.get_pixel(0, 0));
    assert_eq!(*block.get_pixel(0, 16), *hover.get_pixel(0, 0));
    assert_eq!(*block.get_pixel(32, 0), *locked.get_pixel(0, 0));
    // No locked_hover module mapped: bottom-right falls back to locked.
    assert_eq!(*block.get_pixel(32, 16), *locked.get_pixel(0, 0));
}

#[test]
fn only_buttons_export_blocks() {
    let layout = AtlasLayout::default();
    assert!(requires_component_export(
        &layout,
        &entry(1, 1, Tool::ButtonStandard, Rect::new(0, 0, 0, 0))
    ));
    assert!(requires_component_export(
        &layout,
        &entry(1, 1, Tool::ButtonToggle, Rect::new(0, 0, 0, 0))
    ));
    for tool in [Tool::TextSlot, Tool::TextEntry, Tool::SelectList, Tool::ItemSlot] {
        assert!(!requires_component_export(
            &layout,
            &entry(1, 1, tool, Rect::new(0, 0, 0, 0))
        ));
    }
}

#[test]
fn plan_groups_same_size_buttons() {
    let project = sample_project();
    let layout = AtlasLayout::default();
    let plan = plan_export(&project, &layout, &ExportConfig::default());

    assert_eq!(plan.components.len(), 5);
    assert_eq!(plan.block_reps.len(), 2);
    assert!(plan.block_reps.contains_key(&BlockKey::Button { w: 2, h: 1 }));
    assert!(plan.block_reps.contains_key(&BlockKey::Toggle {
        w: 1,
        h: 1,
        locked: false,
        active: false
    }));
    assert_eq!(plan.sheets.sheets.len(), 1);
}

#[test]
fn plan_without_grouping_is_per_entry() {
    let project = sample_project();
    let layout = AtlasLayout::default();
    let cfg = ExportConfig {
        group_by_size: false,
        ..ExportConfig::default()
    };
    let plan = plan_export(&project, &layout, &cfg);
    // Three buttons, three unique blocks.
    assert_eq!(plan.block_reps.len(), 3);
    assert!(plan.block_reps.contains_key(&BlockKey::Unique { uid: 1 }));
}

#[test]
fn manifest_shape() {
    let project = sample_project();
    let layout = AtlasLayout::default();
    let plan = plan_export(&project, &layout, &ExportConfig::default());
    let manifest = runtime_manifest(&project, &layout, &plan, &["stone".to_string()]);

    assert_eq!(manifest["version"], Value::from(3));
    assert_eq!(manifest["gui_name"], Value::from("demo"));
    assert_eq!(manifest["size"], Value::from(16));
    assert_eq!(manifest["skin_packs"][0], Value::from("stone"));

    let comps = manifest["pages"][0]["components"]
        .as_array()
        .expect("components");
    assert_eq!(comps.len(), 5);

    let button = &comps[0];
    assert_eq!(button["type"], Value::from("button"));
    assert_eq!(button["hover_text"], Value::from("hi"));
    assert_eq!(button["sheet"], Value::from(1));
    let tex_x = button["tex"]["x"].as_u64().expect("tex x");
    assert_eq!(button["disabled_tex"]["x"], Value::from(tex_x + 32));
    assert_eq!(button["disabled_tex"]["y"], button["tex"]["y"]);

    let goto_button = &comps[1];
    assert_eq!(goto_button["open_page"], Value::from(1));
    // Same size: the two buttons share one block.
    assert_eq!(goto_button["tex"], button["tex"]);

    let toggle = &comps[2];
    assert_eq!(toggle["type"], Value::from("toggle_button"));
    assert_eq!(toggle["toggled"], Value::from(false));
    let tx = toggle["tex"]["x"].as_u64().expect("toggle tex x");
    let ty = toggle["tex"]["y"].as_u64().expect("toggle tex y");
    assert_eq!(toggle["toggle_tex"]["x"], Value::from(tx + 16));
    assert_eq!(toggle["toggle_tex"]["y"], Value::from(ty));
    assert_eq!(toggle["disabled_tex"]["y"], Value::from(ty + 16));
    assert_eq!(toggle["toggle_disabled_tex"], toggle["disabled_tex"]);

    let list = &comps[3];
    assert_eq!(list["type"], Value::from("scroll_list"));
    assert_eq!(
        list["items"],
        serde_json::json!(["a", "b", "c"])
    );
    assert!(list.get("label").is_none());
    assert!(list.get("sheet").is_none());

    let slot = &comps[4];
    assert_eq!(slot["type"], Value::from("label"));
    assert!(slot.get("sheet").is_none());
}

#[derive(Default)]
struct MemWriter {
    pngs: Vec<(String, u32, u32)>,
    jsons: Vec<String>,
}

impl ArtifactWriter for MemWriter {
    fn write_png(&mut self, rel: &str, image: &RgbaImage) -> Result<()> {
        self.pngs
            .push((rel.to_string(), image.width(), image.height()));
        Ok(())
    }

    fn write_json(&mut self, rel: &str, _value: &Value) -> Result<()> {
        self.jsons.push(rel.to_string());
        Ok(())
    }
}

#[test]
fn export_writes_per_pack_artifacts() {
    let project = sample_project();
    let layout = AtlasLayout::default();
    let packs = vec![SkinPack {
        name: "stone".into(),
        modules: test_atlas(),
        background: None,
    }];

    let mut writer = MemWriter::default();
    let manifest = write_export(
        &project,
        &layout,
        &ExportConfig::default(),
        &packs,
        &mut writer,
    )
    .expect("export");

    let names: Vec<&str> = writer.pngs.iter().map(|(n, _, _)| n.as_str()).collect();
    assert_eq!(names, vec!["stone/sheet_1.png", "stone/background_page_1.png"]);
    // Sheets are sheet_px square; backgrounds are full page resolution.
    assert_eq!((writer.pngs[0].1, writer.pngs[0].2), (256, 256));
    assert_eq!((writer.pngs[1].1, writer.pngs[1].2), (256, 256));
    assert_eq!(writer.jsons, vec!["gui_manifest.json"]);
    assert_eq!(manifest["version"], Value::from(3));
}
