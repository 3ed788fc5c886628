use crate::geom::{Grid, Rect};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Closed set of element kinds the editor can place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Background,
    ButtonStandard,
    ButtonToggle,
    TextEntry,
    SelectList,
    TextSlot,
    ItemSlot,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Background => "background",
            Tool::ButtonStandard => "button_standard",
            Tool::ButtonToggle => "button_toggle",
            Tool::TextEntry => "text_entry",
            Tool::SelectList => "select_list",
            Tool::TextSlot => "text_slot",
            Tool::ItemSlot => "item_slot",
        }
    }

    /// Resolve a tool name from a saved document. Deprecated names map to
    /// their nearest current equivalent; unrecognized names return `None`
    /// and the caller skips the entry.
    pub fn from_saved(name: &str) -> Option<Tool> {
        match name {
            "background" => Some(Tool::Background),
            "button_standard" => Some(Tool::ButtonStandard),
            // Removed tool: press buttons behave like standard buttons now.
            "button_press" => Some(Tool::ButtonStandard),
            "button_toggle" => Some(Tool::ButtonToggle),
            "text_entry" => Some(Tool::TextEntry),
            "select_list" => Some(Tool::SelectList),
            "text_slot" => Some(Tool::TextSlot),
            "item_slot" => Some(Tool::ItemSlot),
            _ => None,
        }
    }

    /// Component type name used in the runtime manifest.
    pub fn component_type(&self) -> &'static str {
        match self {
            Tool::Background => "background",
            Tool::ButtonStandard => "button",
            Tool::ButtonToggle => "toggle_button",
            Tool::TextSlot => "label",
            Tool::TextEntry => "text_field",
            Tool::SelectList => "scroll_list",
            Tool::ItemSlot => "item_slot",
        }
    }
}

/// Navigation behavior of a standard button, replacing the legacy untyped
/// `page_change` meta map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PageAction {
    #[default]
    None,
    Next {
        wrap: bool,
    },
    Prev {
        wrap: bool,
    },
    Goto {
        page: i32,
    },
    Close,
}

impl PageAction {
    pub fn from_legacy_value(v: &Value) -> PageAction {
        let Some(obj) = v.as_object() else {
            return PageAction::None;
        };
        let mode = obj.get("mode").and_then(Value::as_str).unwrap_or("none");
        let wrap = obj
            .get("modulo")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        match mode {
            "next" => PageAction::Next { wrap },
            "prev" => PageAction::Prev { wrap },
            "close" => PageAction::Close,
            "goto" => {
                let page = obj
                    .get("target_page_id")
                    .and_then(Value::as_i64)
                    .unwrap_or(1) as i32;
                PageAction::Goto { page }
            }
            _ => PageAction::None,
        }
    }

    /// Encode in the legacy `page_change` shape; `None` encodes to nothing.
    pub fn to_legacy_value(&self) -> Option<Value> {
        match self {
            PageAction::None => None,
            PageAction::Next { wrap } => Some(json!({"mode": "next", "modulo": wrap})),
            PageAction::Prev { wrap } => Some(json!({"mode": "prev", "modulo": wrap})),
            PageAction::Goto { page } => {
                Some(json!({"mode": "goto", "target_page_id": page, "modulo": false}))
            }
            PageAction::Close => Some(json!({"mode": "close"})),
        }
    }
}

/// Hover tooltip settings of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoverText {
    pub enabled: bool,
    pub text: String,
}

/// Typed per-entry metadata. Saved documents carry this as a free-form map;
/// the legacy codecs below translate both ways.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMeta {
    pub locked: bool,
    pub disabled: bool,
    pub hover: Option<HoverText>,
    pub action: PageAction,
}

impl EntryMeta {
    pub fn from_legacy_value(v: &Value) -> EntryMeta {
        let Some(obj) = v.as_object() else {
            return EntryMeta::default();
        };
        let hover = obj.get("hover").and_then(Value::as_object).map(|h| HoverText {
            enabled: h.get("enabled").and_then(Value::as_bool).unwrap_or(false),
            text: h
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim()
                .to_string(),
        });
        EntryMeta {
            locked: obj.get("locked").and_then(Value::as_bool).unwrap_or(false),
            disabled: obj
                .get("disabled")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            hover,
            action: obj
                .get("page_change")
                .map(PageAction::from_legacy_value)
                .unwrap_or_default(),
        }
    }

    pub fn to_legacy_value(&self) -> Value {
        let mut obj = serde_json::Map::new();
        if self.locked {
            obj.insert("locked".into(), Value::Bool(true));
        }
        if self.disabled {
            obj.insert("disabled".into(), Value::Bool(true));
        }
        if let Some(h) = &self.hover {
            obj.insert("hover".into(), json!({"enabled": h.enabled, "text": h.text}));
        }
        if let Some(pc) = self.action.to_legacy_value() {
            obj.insert("page_change".into(), pc);
        }
        Value::Object(obj)
    }

    pub fn hover_enabled(&self) -> bool {
        self.hover.as_ref().is_some_and(|h| h.enabled)
    }
}

/// A placed element. `id` is page-scoped, `uid` is unique across the whole
/// project and stable across saves and exports.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: i32,
    pub uid: i64,
    pub tool: Tool,
    pub rect: Rect,
    pub active: bool,
    pub label: String,
    pub meta: EntryMeta,
}

/// One grid/layout unit: painted background plus placed entries, with a
/// cell lookup for hit-testing. Entries own their cells; placing over an
/// existing entry removes it first.
#[derive(Debug, Clone)]
pub struct Page {
    pub page_id: i32,
    pub grid: Grid,
    entries: BTreeMap<i32, Entry>,
    cell_to_entry: Vec<Option<i32>>,
    next_entry_id: i32,
}

impl Page {
    pub fn new(page_id: i32, n: usize) -> Self {
        Self {
            page_id,
            grid: Grid::new(n),
            entries: BTreeMap::new(),
            cell_to_entry: vec![None; n * n],
            next_entry_id: 1,
        }
    }

    fn n(&self) -> usize {
        self.grid.n()
    }

    fn cell_index(&self, x: i32, y: i32) -> Option<usize> {
        let n = self.n();
        if x < 0 || y < 0 || x as usize >= n || y as usize >= n {
            return None;
        }
        Some(y as usize * n + x as usize)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn entry(&self, id: i32) -> Option<&Entry> {
        self.entries.get(&id)
    }

    pub fn entry_at(&self, x: i32, y: i32) -> Option<&Entry> {
        let idx = self.cell_index(x, y)?;
        self.cell_to_entry[idx].and_then(|id| self.entries.get(&id))
    }

    /// Insert an entry with an explicit id, clearing any entries whose cells
    /// intersect its rectangle first, then claiming every in-bounds cell.
    pub fn insert(&mut self, entry: Entry) {
        let mut doomed: Vec<i32> = Vec::new();
        for (x, y) in entry.rect.cells() {
            if let Some(idx) = self.cell_index(x, y) {
                if let Some(old) = self.cell_to_entry[idx] {
                    if old != entry.id && !doomed.contains(&old) {
                        doomed.push(old);
                    }
                }
            }
        }
        for id in doomed {
            self.remove_entry(id);
        }

        for (x, y) in entry.rect.cells() {
            if let Some(idx) = self.cell_index(x, y) {
                self.cell_to_entry[idx] = Some(entry.id);
            }
        }
        self.next_entry_id = self.next_entry_id.max(entry.id + 1);
        self.entries.insert(entry.id, entry);
    }

    /// Place a new entry, allocating the next page-scoped id.
    pub fn place(&mut self, uid: i64, tool: Tool, rect: Rect) -> i32 {
        let id = self.next_entry_id;
        self.insert(Entry {
            id,
            uid,
            tool,
            rect: rect.normalized(),
            active: false,
            label: String::new(),
            meta: EntryMeta::default(),
        });
        id
    }

    pub fn remove_entry(&mut self, id: i32) {
        if let Some(e) = self.entries.remove(&id) {
            for (x, y) in e.rect.cells() {
                if let Some(idx) = self.cell_index(x, y) {
                    if self.cell_to_entry[idx] == Some(id) {
                        self.cell_to_entry[idx] = None;
                    }
                }
            }
        }
    }
}

/// Immutable snapshot of an edited layout: the export pipeline's only input.
#[derive(Debug, Clone)]
pub struct Project {
    pub grid_n: usize,
    pub name: String,
    pub start_page_id: i32,
    pub next_uid: i64,
    pages: BTreeMap<i32, Page>,
}

impl Project {
    pub fn new(grid_n: usize) -> Self {
        let mut pages = BTreeMap::new();
        pages.insert(1, Page::new(1, grid_n));
        Self {
            grid_n,
            name: String::new(),
            start_page_id: 1,
            next_uid: 1,
            pages,
        }
    }

    /// Build a project from pre-constructed pages (used by the document
    /// loader). Must not be called with an empty page list.
    pub fn from_pages(grid_n: usize, pages: Vec<Page>) -> Self {
        let mut map = BTreeMap::new();
        for page in pages {
            map.insert(page.page_id, page);
        }
        Self {
            grid_n,
            name: String::new(),
            start_page_id: map.keys().next().copied().unwrap_or(1),
            next_uid: 1,
            pages: map,
        }
    }

    /// Allocate the next project-wide unique id.
    pub fn alloc_uid(&mut self) -> i64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    pub fn page(&self, id: i32) -> Option<&Page> {
        self.pages.get(&id)
    }

    pub fn page_mut(&mut self, id: i32) -> Option<&mut Page> {
        self.pages.get_mut(&id)
    }

    pub fn add_page(&mut self, page: Page) {
        self.pages.insert(page.page_id, page);
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }

    pub fn sorted_page_ids(&self) -> Vec<i32> {
        self.pages.keys().copied().collect()
    }

    /// Resolve the page a standard button's action opens, if any. `Next` and
    /// `Prev` walk the sorted page-id list, wrapping only when requested;
    /// `Goto` must name an existing page; `Close` opens nothing.
    pub fn resolve_open_page(&self, page_id: i32, entry: &Entry) -> Option<i32> {
        if entry.tool != Tool::ButtonStandard {
            return None;
        }
        let ids = self.sorted_page_ids();
        if ids.is_empty() {
            return None;
        }
        match entry.meta.action {
            PageAction::None | PageAction::Close => None,
            PageAction::Goto { page } => self.pages.contains_key(&page).then_some(page),
            PageAction::Next { wrap } | PageAction::Prev { wrap } => {
                let cur = ids.iter().position(|&p| p == page_id)?;
                let step: isize = match entry.meta.action {
                    PageAction::Next { .. } => 1,
                    _ => -1,
                };
                let idx = cur as isize + step;
                if wrap {
                    let len = ids.len() as isize;
                    Some(ids[idx.rem_euclid(len) as usize])
                } else if idx < 0 || idx as usize >= ids.len() {
                    None
                } else {
                    Some(ids[idx as usize])
                }
            }
        }
    }

    /// Tooltip text for an entry when hover text is enabled: the custom text
    /// if present, otherwise a per-tool summary.
    pub fn hover_tooltip_text(&self, entry: &Entry) -> String {
        if let Some(h) = &entry.meta.hover {
            if !h.text.is_empty() {
                return h.text.clone();
            }
        }
        match entry.tool {
            Tool::ButtonToggle => {
                format!("Toggle: {}", if entry.active { "ON" } else { "OFF" })
            }
            Tool::ButtonStandard => match entry.meta.action {
                PageAction::None => "Standard: action=none".to_string(),
                PageAction::Close => "Standard: action=close_gui".to_string(),
                PageAction::Goto { page } => {
                    format!("Standard: goto page {page} (no-wrap)")
                }
                PageAction::Next { wrap } => {
                    format!("Standard: next ({})", if wrap { "wrap" } else { "no-wrap" })
                }
                PageAction::Prev { wrap } => {
                    format!("Standard: prev ({})", if wrap { "wrap" } else { "no-wrap" })
                }
            },
            Tool::TextEntry if !entry.label.is_empty() => {
                format!("Text entry: {}", entry.label)
            }
            Tool::TextEntry => "Text entry".to_string(),
            Tool::SelectList if !entry.label.is_empty() => format!("Select: {}", entry.label),
            Tool::SelectList => "Select list".to_string(),
            Tool::TextSlot => "Text slot".to_string(),
            Tool::ItemSlot => "Item slot".to_string(),
            Tool::Background => entry.tool.as_str().to_string(),
        }
    }
}
