use crate::background::{compress_background, decompress_background};
use crate::error::{Result, UiPackError};
use crate::geom::{Grid, Rect};
use crate::model::{Entry, EntryMeta, Page, Project, Tool};
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Current save document version. Version history:
/// 1 — single implicit page, raw boolean background grid
/// 2 — multi-page wrapper, raw boolean background grids
/// 3 — per-page `background_rects` rectangle compression
pub const DOCUMENT_VERSION: u64 = 3;

/// Serialize a project as the current (v3) document.
pub fn document_value(project: &Project) -> Value {
    let pages: Vec<Value> = project
        .pages()
        .map(|p| {
            let rects: Vec<Value> = compress_background(&p.grid)
                .iter()
                .map(|r| json!({"x0": r.x0, "y0": r.y0, "x1": r.x1, "y1": r.y1}))
                .collect();
            let entries: Vec<Value> = p
                .entries()
                .map(|e| {
                    json!({
                        "id": e.id,
                        "uid": e.uid,
                        "tool": e.tool.as_str(),
                        "rect": {"x0": e.rect.x0, "y0": e.rect.y0, "x1": e.rect.x1, "y1": e.rect.y1},
                        "active": e.active,
                        "label": e.label,
                        "meta": e.meta.to_legacy_value(),
                    })
                })
                .collect();
            json!({
                "page_id": p.page_id,
                "background_rects": rects,
                "entries": entries,
            })
        })
        .collect();

    json!({
        "version": DOCUMENT_VERSION,
        "gui_name": project.name,
        "grid_n": project.grid_n,
        "start_page_id": project.start_page_id,
        "next_uid": project.next_uid,
        "pages": pages,
    })
}

pub fn document_json(project: &Project) -> Result<String> {
    serde_json::to_string_pretty(&document_value(project))
        .map_err(|e| UiPackError::Encode(e.to_string()))
}

pub fn parse_document(s: &str) -> Result<Project> {
    let v: Value = serde_json::from_str(s)
        .map_err(|e| UiPackError::InvalidDocument(format!("not valid JSON: {e}")))?;
    parse_document_value(&v)
}

/// Parse a saved document, accepting the current version and the two prior
/// ones. Validation is all-or-nothing: any structural error fails the whole
/// load without partial state.
pub fn parse_document_value(root: &Value) -> Result<Project> {
    let obj = root
        .as_object()
        .ok_or_else(|| UiPackError::InvalidDocument("expected a JSON object".into()))?;

    let version = obj.get("version").and_then(Value::as_u64).unwrap_or(0);
    if !(1..=DOCUMENT_VERSION).contains(&version) {
        return Err(UiPackError::InvalidDocument(format!(
            "unsupported version {version} (expected 1..={DOCUMENT_VERSION})"
        )));
    }

    let grid_n = obj.get("grid_n").and_then(Value::as_u64).unwrap_or(0) as usize;
    if grid_n != 16 && grid_n != 32 {
        return Err(UiPackError::InvalidDocument(format!(
            "grid_n must be 16 or 32, got {grid_n}"
        )));
    }

    // v1 documents have no pages wrapper: treat the whole document as one
    // implicit page.
    let single_page;
    let pages: &[Value] = match obj.get("pages") {
        Some(Value::Array(list)) => list.as_slice(),
        Some(_) => {
            return Err(UiPackError::InvalidDocument("pages must be a list".into()));
        }
        None => {
            single_page = [json!({
                "page_id": 1,
                "background": obj.get("background").cloned().unwrap_or(Value::Null),
                "entries": obj.get("entries").cloned().unwrap_or_else(|| json!([])),
            })];
            &single_page
        }
    };
    if pages.is_empty() {
        return Err(UiPackError::InvalidDocument(
            "pages must be a non-empty list".into(),
        ));
    }

    let mut uids = UidAllocator::new(obj.get("next_uid").and_then(Value::as_i64).unwrap_or(1));
    let mut loaded: Vec<Page> = Vec::new();

    for pobj in pages {
        let pmap = pobj
            .as_object()
            .ok_or_else(|| UiPackError::InvalidDocument("invalid page object".into()))?;
        let page_id = pmap.get("page_id").and_then(Value::as_i64).unwrap_or(1) as i32;

        let grid = parse_background(pmap, grid_n, page_id)?;
        let mut page = Page::new(page_id, grid_n);
        page.grid = grid;

        let entries = match pmap.get("entries") {
            None => &[] as &[Value],
            Some(Value::Array(list)) => list.as_slice(),
            Some(_) => {
                return Err(UiPackError::InvalidDocument(format!(
                    "entries must be a list for page {page_id}"
                )));
            }
        };

        for eobj in entries {
            let emap = eobj
                .as_object()
                .ok_or_else(|| UiPackError::InvalidDocument("invalid entry object".into()))?;
            let raw_tool = emap.get("tool").and_then(Value::as_str).unwrap_or("");
            // Unknown tools are skipped, not fatal.
            let Some(tool) = Tool::from_saved(raw_tool) else {
                continue;
            };
            let rect = parse_rect(emap.get("rect")).ok_or_else(|| {
                UiPackError::InvalidDocument(format!("entry without valid rect on page {page_id}"))
            })?;
            let id = emap.get("id").and_then(Value::as_i64).ok_or_else(|| {
                UiPackError::InvalidDocument(format!("entry without id on page {page_id}"))
            })? as i32;
            let uid = uids.alloc(emap.get("uid").and_then(Value::as_i64));
            page.insert(Entry {
                id,
                uid,
                tool,
                rect: rect.normalized(),
                active: emap.get("active").and_then(Value::as_bool).unwrap_or(false),
                label: emap
                    .get("label")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
                meta: emap
                    .get("meta")
                    .map(EntryMeta::from_legacy_value)
                    .unwrap_or_default(),
            });
        }

        loaded.push(page);
    }

    let mut project = Project::from_pages(grid_n, loaded);
    project.name = obj
        .get("gui_name")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    project.next_uid = uids.finish();

    let start = obj
        .get("start_page_id")
        .and_then(Value::as_i64)
        .unwrap_or(1) as i32;
    if project.page(start).is_some() {
        project.start_page_id = start;
    }
    Ok(project)
}

fn parse_background(
    pmap: &serde_json::Map<String, Value>,
    grid_n: usize,
    page_id: i32,
) -> Result<Grid> {
    if let Some(Value::Array(list)) = pmap.get("background_rects") {
        let mut rects: Vec<Rect> = Vec::new();
        for robj in list {
            if let Some(r) = parse_rect(Some(robj)) {
                rects.push(r);
            }
        }
        return Ok(decompress_background(&rects, grid_n));
    }

    // Legacy raw boolean grid (v1/v2): dimensions must match exactly.
    let rows = pmap
        .get("background")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            UiPackError::InvalidDocument(format!("background missing for page {page_id}"))
        })?;
    if rows.len() != grid_n {
        return Err(UiPackError::InvalidDocument(format!(
            "background has invalid dimensions for page {page_id}"
        )));
    }
    let mut grid = Grid::new(grid_n);
    for (y, row) in rows.iter().enumerate() {
        let cells = row.as_array().filter(|r| r.len() == grid_n).ok_or_else(|| {
            UiPackError::InvalidDocument(format!(
                "background has invalid dimensions for page {page_id}"
            ))
        })?;
        for (x, cell) in cells.iter().enumerate() {
            grid.set(x as i32, y as i32, cell.as_bool().unwrap_or(false));
        }
    }
    Ok(grid)
}

fn parse_rect(v: Option<&Value>) -> Option<Rect> {
    let obj = v?.as_object()?;
    Some(Rect::new(
        obj.get("x0")?.as_i64()? as i32,
        obj.get("y0")?.as_i64()? as i32,
        obj.get("x1")?.as_i64()? as i32,
        obj.get("y1")?.as_i64()? as i32,
    ))
}

/// Allocates project-wide unique ids on load: explicitly stored positive,
/// unseen uids are preserved; everything else gets the next free value from
/// a counter seeded by the stored `next_uid`. After the run the next uid is
/// strictly above every uid handed out.
struct UidAllocator {
    used: BTreeSet<i64>,
    counter: i64,
    max_seen: i64,
}

impl UidAllocator {
    fn new(next_uid: i64) -> Self {
        Self {
            used: BTreeSet::new(),
            counter: next_uid.max(1),
            max_seen: 0,
        }
    }

    fn alloc(&mut self, requested: Option<i64>) -> i64 {
        if let Some(rid) = requested {
            if rid > 0 && !self.used.contains(&rid) {
                self.used.insert(rid);
                self.max_seen = self.max_seen.max(rid);
                return rid;
            }
        }
        while self.used.contains(&self.counter) {
            self.counter += 1;
        }
        let uid = self.counter;
        self.used.insert(uid);
        self.max_seen = self.max_seen.max(uid);
        self.counter += 1;
        uid
    }

    fn finish(&self) -> i64 {
        self.counter.max(self.max_seen + 1)
    }
}
