use crate::error::{Result, UiPackError};
use crate::geom::CellSet;
use crate::model::Tool;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// 4-neighbor mask bits.
pub const MASK_N: u8 = 1;
pub const MASK_E: u8 = 2;
pub const MASK_S: u8 = 4;
pub const MASK_W: u8 = 8;

/// (dx, dy, bit) per direction, in mask bit order.
pub const CTM_DIRS: [(i32, i32, u8); 4] = [
    (0, -1, MASK_N),
    (1, 0, MASK_E),
    (0, 1, MASK_S),
    (-1, 0, MASK_W),
];

/// Tiles per CTM module edge: each module is a 4x4 block holding all 16
/// neighbor variants of one visual state.
pub const CTM_MODULE_TILES: u32 = 4;

/// Neighbor mask of a cell against an explicit membership set. The set is the
/// cell-set of one element (or the painted background), never the whole grid,
/// so adjacent distinct elements never visually merge.
pub fn ctm_mask(cells: &CellSet, x: i32, y: i32) -> u8 {
    let mut mask = 0;
    for (dx, dy, bit) in CTM_DIRS {
        if cells.contains(&(x + dx, y + dy)) {
            mask |= bit;
        }
    }
    mask
}

/// Map a 4-neighbor mask (0..16) into a (dx, dy) tile offset inside a 4x4
/// module:
///
/// - (0,0): single-tile element
/// - row 0, x=1..3: horizontal strip (left cap, middle, right cap)
/// - col 0, y=1..3: vertical strip (top cap, middle, bottom cap)
/// - 3x3 block at x=1..3, y=1..3: nine-slice, each axis resolved
///   independently (edge vs. middle), then combined
pub fn ctm_tile_offset(mask: u8) -> (u32, u32) {
    let m = mask & 0xF;
    let n = m & MASK_N != 0;
    let e = m & MASK_E != 0;
    let s = m & MASK_S != 0;
    let w = m & MASK_W != 0;

    if !(n || e || s || w) {
        return (0, 0);
    }

    // Pure horizontal strip.
    if !(n || s) {
        return match (e, w) {
            (true, true) => (2, 0),
            (true, false) => (1, 0),
            _ => (3, 0),
        };
    }

    // Pure vertical strip.
    if !(e || w) {
        return match (n, s) {
            (true, true) => (0, 2),
            (false, true) => (0, 1),
            _ => (0, 3),
        };
    }

    let dx = if w && e {
        2
    } else if w {
        3
    } else {
        1
    };
    let dy = if n && s {
        2
    } else if n {
        3
    } else {
        1
    };
    (dx, dy)
}

/// Module keys each tool draws with. The semantics of `base` depend on the
/// tool: for toggle buttons `base` is the pressed/on state and `unpressed`
/// the off state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolModules {
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub hover: Option<String>,
    #[serde(default)]
    pub locked: Option<String>,
    #[serde(default)]
    pub locked_hover: Option<String>,
    #[serde(default)]
    pub unpressed: Option<String>,
    #[serde(default)]
    pub hover_base: Option<String>,
    #[serde(default)]
    pub hover_unpressed: Option<String>,
    #[serde(default)]
    pub pressed_locked: Option<String>,
    #[serde(default)]
    pub unpressed_locked: Option<String>,
}

/// Declarative atlas layout: tile size, module-key -> CTM origin (tile
/// units) and tool -> module-key records. Ships with a built-in default and
/// can be loaded from the same JSON shape the editor uses.
#[derive(Debug, Clone)]
pub struct AtlasLayout {
    pub tile_px: u32,
    ctm_origins: BTreeMap<String, (u32, u32)>,
    tool_modules: BTreeMap<Tool, ToolModules>,
    mask_overrides: BTreeMap<u8, (u32, u32)>,
}

impl AtlasLayout {
    pub fn module_origin(&self, key: &str) -> Option<(u32, u32)> {
        self.ctm_origins.get(key).copied()
    }

    pub fn require_module_origin(&self, key: &str) -> Result<(u32, u32)> {
        self.module_origin(key)
            .ok_or_else(|| UiPackError::UnknownModule(key.to_string()))
    }

    pub fn modules_for(&self, tool: Tool) -> Option<&ToolModules> {
        self.tool_modules.get(&tool)
    }

    /// Mask -> tile offset, honoring a per-layout override table when present.
    pub fn tile_offset(&self, mask: u8) -> (u32, u32) {
        self.mask_overrides
            .get(&(mask & 0xF))
            .copied()
            .unwrap_or_else(|| ctm_tile_offset(mask))
    }

    /// Parse the editor's `texture_mapping.json` shape: `tile_px`,
    /// `ctm_origins` (each entry carrying `tile` or `module` coordinates),
    /// `entry_tool_modules` keyed by tool name, and an optional
    /// `ctm_mask_to_offset` override table. Unknown tool keys are skipped.
    pub fn from_json(root: &Value) -> Result<Self> {
        let obj = root
            .as_object()
            .ok_or_else(|| UiPackError::InvalidDocument("mapping root must be an object".into()))?;

        let tile_px = obj
            .get("tile_px")
            .and_then(Value::as_u64)
            .unwrap_or(16) as u32;
        let ctm_size = obj
            .get("module")
            .and_then(|m| m.get("ctm_size_tiles"))
            .and_then(Value::as_u64)
            .unwrap_or(CTM_MODULE_TILES as u64) as u32;

        let origins_obj = obj
            .get("ctm_origins")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                UiPackError::InvalidDocument("mapping must contain object 'ctm_origins'".into())
            })?;
        let mut ctm_origins = BTreeMap::new();
        for (key, v) in origins_obj {
            ctm_origins.insert(key.clone(), origin_from_value(v, ctm_size)?);
        }

        let tools_obj = obj
            .get("entry_tool_modules")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                UiPackError::InvalidDocument(
                    "mapping must contain object 'entry_tool_modules'".into(),
                )
            })?;
        let mut tool_modules = BTreeMap::new();
        for (tool_key, mapping) in tools_obj {
            let Some(tool) = Tool::from_saved(tool_key) else {
                continue;
            };
            let modules: ToolModules = serde_json::from_value(mapping.clone())
                .map_err(|e| UiPackError::InvalidDocument(format!("entry_tool_modules: {e}")))?;
            tool_modules.insert(tool, modules);
        }

        let mut mask_overrides = BTreeMap::new();
        if let Some(masks) = obj.get("ctm_mask_to_offset").and_then(Value::as_object) {
            for (k, v) in masks {
                let Ok(mask) = k.parse::<u8>() else { continue };
                if let Some(arr) = v.as_array() {
                    if let (Some(dx), Some(dy)) =
                        (arr.first().and_then(Value::as_u64), arr.get(1).and_then(Value::as_u64))
                    {
                        mask_overrides.insert(mask & 0xF, (dx as u32, dy as u32));
                    }
                }
            }
        }

        Ok(Self {
            tile_px,
            ctm_origins,
            tool_modules,
            mask_overrides,
        })
    }
}

fn origin_from_value(v: &Value, ctm_size: u32) -> Result<(u32, u32)> {
    let obj = v
        .as_object()
        .ok_or_else(|| UiPackError::InvalidDocument("ctm_origins entries must be objects".into()))?;
    let pair = |v: &Value| -> Option<(u32, u32)> {
        let arr = v.as_array()?;
        Some((
            arr.first()?.as_u64()? as u32,
            arr.get(1)?.as_u64()? as u32,
        ))
    };
    if let Some(t) = obj.get("tile").and_then(|v| pair(v)) {
        return Ok(t);
    }
    if let Some((mx, my)) = obj.get("module").and_then(|v| pair(v)) {
        return Ok((mx * ctm_size, my * ctm_size));
    }
    Err(UiPackError::InvalidDocument(
        "ctm_origins entries must have 'tile' or 'module'".into(),
    ))
}

impl Default for AtlasLayout {
    /// Built-in layout matching the standard skin pack: modules arranged in
    /// a 4-wide grid of 4x4 CTM blocks.
    fn default() -> Self {
        let module = |mx: u32, my: u32| (mx * CTM_MODULE_TILES, my * CTM_MODULE_TILES);
        let ctm_origins: BTreeMap<String, (u32, u32)> = [
            ("background_border", module(0, 0)),
            ("button_background", module(1, 0)),
            ("button", module(2, 0)),
            ("button_hover", module(3, 0)),
            ("button_locked", module(0, 1)),
            ("toggle_on", module(1, 1)),
            ("toggle_off", module(2, 1)),
            ("toggle_on_hover", module(3, 1)),
            ("toggle_off_hover", module(0, 2)),
            ("toggle_on_locked", module(1, 2)),
            ("toggle_off_locked", module(2, 2)),
            ("text_entry", module(3, 2)),
            ("select_list", module(0, 3)),
            ("text_slot", module(1, 3)),
            ("item_slot", module(2, 3)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let s = |v: &str| Some(v.to_string());
        let mut tool_modules = BTreeMap::new();
        tool_modules.insert(
            Tool::ButtonStandard,
            ToolModules {
                base: s("button"),
                hover: s("button_hover"),
                locked: s("button_locked"),
                ..ToolModules::default()
            },
        );
        tool_modules.insert(
            Tool::ButtonToggle,
            ToolModules {
                base: s("toggle_on"),
                unpressed: s("toggle_off"),
                hover_base: s("toggle_on_hover"),
                hover_unpressed: s("toggle_off_hover"),
                pressed_locked: s("toggle_on_locked"),
                unpressed_locked: s("toggle_off_locked"),
                ..ToolModules::default()
            },
        );
        tool_modules.insert(
            Tool::TextEntry,
            ToolModules {
                base: s("text_entry"),
                ..ToolModules::default()
            },
        );
        tool_modules.insert(
            Tool::SelectList,
            ToolModules {
                base: s("select_list"),
                ..ToolModules::default()
            },
        );
        tool_modules.insert(
            Tool::TextSlot,
            ToolModules {
                base: s("text_slot"),
                ..ToolModules::default()
            },
        );
        tool_modules.insert(
            Tool::ItemSlot,
            ToolModules {
                base: s("item_slot"),
                ..ToolModules::default()
            },
        );

        Self {
            tile_px: 16,
            ctm_origins,
            tool_modules,
            mask_overrides: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_reads_only_the_membership_set() {
        let cells: CellSet = [(0, 0), (1, 0)].into_iter().collect();
        assert_eq!(ctm_mask(&cells, 0, 0), MASK_E);
        assert_eq!(ctm_mask(&cells, 1, 0), MASK_W);
        // A neighbor outside the set contributes nothing even if painted
        // elsewhere on the grid.
        assert_eq!(ctm_mask(&cells, 5, 5), 0);
    }

    #[test]
    fn default_layout_maps_every_tool_base() {
        let layout = AtlasLayout::default();
        for tool in [
            Tool::ButtonStandard,
            Tool::ButtonToggle,
            Tool::TextEntry,
            Tool::SelectList,
            Tool::TextSlot,
            Tool::ItemSlot,
        ] {
            let m = layout.modules_for(tool).expect("modules");
            let base = m.base.as_deref().expect("base module");
            assert!(layout.module_origin(base).is_some(), "{base} unmapped");
        }
    }
}
