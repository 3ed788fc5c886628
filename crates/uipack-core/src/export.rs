use crate::atlas::SkinPack;
use crate::compose::{blit_image, compose_block, render_background_page, requires_component_export};
use crate::ctm::AtlasLayout;
use crate::error::{Result, UiPackError};
use crate::model::{PageAction, Project, Tool};
use crate::pack::{BlockKey, BlockSpec, SheetPlan, plan_sheets};
use image::RgbaImage;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Runtime manifest format version.
pub const MANIFEST_VERSION: u64 = 3;

/// Export policy knobs.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Output sheet edge in pixels.
    pub sheet_px: u32,
    /// Reuse one texture block per button size instead of one per entry.
    pub group_by_size: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sheet_px: 256,
            group_by_size: true,
        }
    }
}

/// One manifest component: a placed element plus (for buttons) where its
/// texture block landed.
#[derive(Debug, Clone)]
pub struct Component {
    pub id: i64,
    pub page: i32,
    pub kind: &'static str,
    pub x: i32,
    pub y: i32,
    pub w_tiles: u32,
    pub h_tiles: u32,
    pub label: String,
    pub items: Vec<String>,
    pub locked: bool,
    pub hover_text: Option<String>,
    pub open_page: Option<i32>,
    pub close_gui: bool,
    pub toggled: Option<bool>,
    pub block_key: Option<BlockKey>,
}

/// Theme-independent export plan: the component list, the sheet layout and,
/// per block key, a representative (page id, entry id) to compose from.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub components: Vec<Component>,
    pub sheets: SheetPlan,
    pub block_reps: BTreeMap<BlockKey, (i32, i32)>,
}

/// Build the packing plan and component list for a project snapshot. Pure
/// over the snapshot; the same input always yields the same plan.
#[instrument(skip_all)]
pub fn plan_export(project: &Project, layout: &AtlasLayout, cfg: &ExportConfig) -> ExportPlan {
    let mut components: Vec<Component> = Vec::new();
    let mut specs: Vec<BlockSpec> = Vec::new();
    let mut block_reps: BTreeMap<BlockKey, (i32, i32)> = BTreeMap::new();

    for page in project.pages() {
        for entry in page.entries() {
            if entry.tool == Tool::Background {
                continue;
            }

            let r = entry.rect.normalized();
            let (w_tiles, h_tiles) = (r.width(), r.height());
            let w_px = w_tiles * layout.tile_px;
            let h_px = h_tiles * layout.tile_px;
            if w_px == 0 || h_px == 0 {
                continue;
            }

            let uid = if entry.uid > 0 {
                entry.uid
            } else {
                entry.id as i64
            };

            let kind = entry.tool.component_type();
            let items = if kind == "scroll_list" {
                entry
                    .label
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            } else {
                Vec::new()
            };

            let block_key = if requires_component_export(layout, entry) {
                let key = if cfg.group_by_size {
                    match entry.tool {
                        // Toggle blocks bake locked/active variants, so size
                        // grouping still splits on those.
                        Tool::ButtonToggle => BlockKey::Toggle {
                            w: w_tiles,
                            h: h_tiles,
                            locked: entry.meta.locked,
                            active: entry.active,
                        },
                        _ => BlockKey::Button {
                            w: w_tiles,
                            h: h_tiles,
                        },
                    }
                } else {
                    BlockKey::Unique { uid }
                };
                if !block_reps.contains_key(&key) {
                    block_reps.insert(key, (page.page_id, entry.id));
                    // Blocks are always 2x2 variant quadrants.
                    specs.push(BlockSpec {
                        key,
                        w_px: w_px * 2,
                        h_px: h_px * 2,
                    });
                }
                Some(key)
            } else {
                None
            };

            components.push(Component {
                id: uid,
                page: page.page_id,
                kind,
                x: r.x0,
                y: r.y0,
                w_tiles,
                h_tiles,
                label: entry.label.clone(),
                items,
                locked: entry.meta.locked,
                hover_text: entry
                    .meta
                    .hover_enabled()
                    .then(|| project.hover_tooltip_text(entry)),
                open_page: project.resolve_open_page(page.page_id, entry),
                close_gui: entry.tool == Tool::ButtonStandard
                    && matches!(entry.meta.action, PageAction::Close),
                toggled: (entry.tool == Tool::ButtonToggle).then_some(entry.active),
                block_key,
            });
        }
    }

    components.sort_by_key(|c| (c.page, c.id));

    let sheets = plan_sheets(&specs, cfg.sheet_px, layout.tile_px);
    debug!(
        components = components.len(),
        blocks = specs.len(),
        sheets = sheets.sheets.len(),
        "export plan ready"
    );

    ExportPlan {
        components,
        sheets,
        block_reps,
    }
}

fn component_value(c: &Component, plan: &ExportPlan, tile_px: u32) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("id".into(), json!(c.id));
    obj.insert("type".into(), json!(c.kind));
    obj.insert("offset".into(), json!({"x": c.x, "y": c.y}));
    obj.insert("size_tiles".into(), json!({"w": c.w_tiles, "h": c.h_tiles}));
    if c.kind == "scroll_list" {
        obj.insert("items".into(), json!(c.items));
    } else {
        obj.insert("label".into(), json!(c.label));
    }
    if c.locked {
        obj.insert("locked".into(), Value::Bool(true));
    }
    if let Some(text) = &c.hover_text {
        obj.insert("hover_text".into(), json!(text));
    }
    if let Some(page) = c.open_page {
        obj.insert("open_page".into(), json!(page));
    }
    if c.close_gui {
        obj.insert("close_gui".into(), Value::Bool(true));
    }
    if let Some(toggled) = c.toggled {
        obj.insert("toggled".into(), json!(toggled));
    }

    if let Some(pos) = c.block_key.and_then(|k| plan.sheets.index.get(&k)) {
        obj.insert("sheet".into(), json!(pos.sheet));
        obj.insert("tex".into(), json!({"x": pos.x, "y": pos.y}));
        let w_px = c.w_tiles * tile_px;
        let h_px = c.h_tiles * tile_px;
        // Quadrant origins inside the 2x2 block: the right column holds the
        // on/locked variants, the bottom-right the disabled state.
        match c.kind {
            "toggle_button" => {
                obj.insert("toggle_tex".into(), json!({"x": pos.x + w_px, "y": pos.y}));
                obj.insert(
                    "disabled_tex".into(),
                    json!({"x": pos.x + w_px, "y": pos.y + h_px}),
                );
                obj.insert(
                    "toggle_disabled_tex".into(),
                    json!({"x": pos.x + w_px, "y": pos.y + h_px}),
                );
            }
            "button" => {
                obj.insert("disabled_tex".into(), json!({"x": pos.x + w_px, "y": pos.y}));
            }
            _ => {}
        }
    }

    Value::Object(obj)
}

/// Build the versioned runtime manifest: format version, grid size, skin
/// pack list and per-page component lists (ordered by component id).
pub fn runtime_manifest(
    project: &Project,
    layout: &AtlasLayout,
    plan: &ExportPlan,
    skin_packs: &[String],
) -> Value {
    let pages: Vec<Value> = project
        .sorted_page_ids()
        .into_iter()
        .map(|pid| {
            let comps: Vec<Value> = plan
                .components
                .iter()
                .filter(|c| c.page == pid)
                .map(|c| component_value(c, plan, layout.tile_px))
                .collect();
            json!({"page": pid, "components": comps})
        })
        .collect();

    json!({
        "version": MANIFEST_VERSION,
        "gui_name": project.name,
        "size": project.grid_n,
        "skin_packs": skin_packs,
        "pages": pages,
    })
}

/// Destination for export artifacts. The filesystem implementation is
/// `DirWriter`; tests use in-memory writers.
pub trait ArtifactWriter {
    fn write_png(&mut self, rel: &str, image: &RgbaImage) -> Result<()>;
    fn write_json(&mut self, rel: &str, value: &Value) -> Result<()>;
}

/// Writes artifacts under a root directory, clearing it first so repeated
/// exports replace prior content.
pub struct DirWriter {
    root: PathBuf,
}

impl DirWriter {
    pub fn create(root: &Path) -> Result<Self> {
        if root.exists() {
            if !root.is_dir() {
                return Err(UiPackError::InvalidOutput(root.to_path_buf()));
            }
            for child in fs::read_dir(root)? {
                let child = child?;
                if child.file_type()?.is_dir() {
                    fs::remove_dir_all(child.path())?;
                } else {
                    fs::remove_file(child.path())?;
                }
            }
        } else {
            fs::create_dir_all(root)?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn prepare(&self, rel: &str) -> Result<PathBuf> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}

impl ArtifactWriter for DirWriter {
    fn write_png(&mut self, rel: &str, image: &RgbaImage) -> Result<()> {
        let path = self.prepare(rel)?;
        image.save(&path)?;
        Ok(())
    }

    fn write_json(&mut self, rel: &str, value: &Value) -> Result<()> {
        let path = self.prepare(rel)?;
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| UiPackError::Encode(e.to_string()))?;
        fs::write(&path, text)?;
        Ok(())
    }
}

/// Run the full export: compose and write the sheets and page backgrounds of
/// every skin pack, then the runtime manifest. The first failing artifact
/// aborts the export; callers discard partial output by re-exporting into
/// the same (cleared) destination.
#[instrument(skip_all)]
pub fn write_export(
    project: &Project,
    layout: &AtlasLayout,
    cfg: &ExportConfig,
    packs: &[SkinPack],
    writer: &mut dyn ArtifactWriter,
) -> Result<Value> {
    let plan = plan_export(project, layout, cfg);

    for pack in packs {
        for (i, sheet) in plan.sheets.sheets.iter().enumerate() {
            let mut img = RgbaImage::new(sheet.w, sheet.h);
            for &(key, x, y) in &sheet.placements {
                let Some(&(pid, eid)) = plan.block_reps.get(&key) else {
                    continue;
                };
                let Some(entry) = project.page(pid).and_then(|p| p.entry(eid)) else {
                    continue;
                };
                if let Some(block) = compose_block(&pack.modules, layout, entry)? {
                    blit_image(&mut img, &block, x, y);
                }
            }
            writer.write_png(&format!("{}/sheet_{}.png", pack.name, i + 1), &img)?;
        }

        for page in project.pages() {
            let img =
                render_background_page(&pack.modules, layout, pack.background.as_ref(), page)?;
            writer.write_png(
                &format!("{}/background_page_{}.png", pack.name, page.page_id),
                &img,
            )?;
        }
    }

    let names: Vec<String> = packs.iter().map(|p| p.name.clone()).collect();
    let manifest = runtime_manifest(project, layout, &plan, &names);
    writer.write_json("gui_manifest.json", &manifest)?;

    info!(
        packs = packs.len(),
        sheets = plan.sheets.sheets.len(),
        "export complete"
    );
    Ok(manifest)
}

/// Convenience wrapper: export into `out_root` on disk (cleared first).
pub fn export_to_dir(
    project: &Project,
    layout: &AtlasLayout,
    cfg: &ExportConfig,
    packs: &[SkinPack],
    out_root: &Path,
) -> Result<Value> {
    let mut writer = DirWriter::create(out_root)?;
    write_export(project, layout, cfg, packs, &mut writer)
}
