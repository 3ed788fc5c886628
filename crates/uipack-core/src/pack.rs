use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Deduplication key of one texture block. With size grouping enabled,
/// same-kind buttons of identical tile dimensions share one key (toggles
/// additionally split on locked/active since those bake different
/// quadrants); otherwise every entry gets a `Unique` key.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockKey {
    Button { w: u32, h: u32 },
    Toggle { w: u32, h: u32, locked: bool, active: bool },
    Unique { uid: i64 },
}

/// Size and identity of one block to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    pub key: BlockKey,
    pub w_px: u32,
    pub h_px: u32,
}

/// Where a block landed: 1-based sheet index plus pixel offset.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Placement {
    pub sheet: usize,
    pub x: u32,
    pub y: u32,
}

/// One output sheet and its placements (block key, pixel x, pixel y).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub w: u32,
    pub h: u32,
    pub placements: Vec<(BlockKey, u32, u32)>,
}

/// Result of a packing run. `index` maps every block key to its placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPlan {
    pub sheet_px: u32,
    pub tile_px: u32,
    pub sheets: Vec<Sheet>,
    pub index: BTreeMap<BlockKey, Placement>,
}

struct OpenSheet {
    sheet: Sheet,
    occ: Vec<bool>,
    tiles: u32,
}

impl OpenSheet {
    fn new(sheet_px: u32, tiles: u32) -> Self {
        Self {
            sheet: Sheet {
                w: sheet_px,
                h: sheet_px,
                placements: Vec::new(),
            },
            occ: vec![false; (tiles * tiles) as usize],
            tiles,
        }
    }

    fn is_free(&self, x0: u32, y0: u32, w_t: u32, h_t: u32) -> bool {
        if x0 + w_t > self.tiles || y0 + h_t > self.tiles {
            return false;
        }
        for yy in y0..y0 + h_t {
            for xx in x0..x0 + w_t {
                if self.occ[(yy * self.tiles + xx) as usize] {
                    return false;
                }
            }
        }
        true
    }

    fn mark(&mut self, x0: u32, y0: u32, w_t: u32, h_t: u32) {
        for yy in y0..y0 + h_t {
            for xx in x0..x0 + w_t {
                self.occ[(yy * self.tiles + xx) as usize] = true;
            }
        }
    }

    /// Top-left first-fit: scan all tile origins row-major and take the
    /// first position where the whole tile rectangle is unoccupied.
    fn try_place(&mut self, key: BlockKey, w_t: u32, h_t: u32, tile_px: u32) -> bool {
        if w_t > self.tiles || h_t > self.tiles {
            return false;
        }
        for y0 in 0..=self.tiles - h_t {
            for x0 in 0..=self.tiles - w_t {
                if self.is_free(x0, y0, w_t, h_t) {
                    self.mark(x0, y0, w_t, h_t);
                    self.sheet
                        .placements
                        .push((key, x0 * tile_px, y0 * tile_px));
                    return true;
                }
            }
        }
        false
    }
}

fn tiles_needed(px: u32, tile_px: u32) -> u32 {
    px.div_ceil(tile_px).max(1)
}

/// Lay out blocks onto fixed-size square sheets. Deduplicates by key, sorts
/// largest-first (area, then height, then width, then key) and first-fits
/// each block into the earliest open sheet with room, opening new sheets as
/// needed. A block too large for the sheet in either dimension gets its own
/// dedicated sheet at (0, 0). Deterministic for a given input.
pub fn plan_sheets(specs: &[BlockSpec], sheet_px: u32, tile_px: u32) -> SheetPlan {
    let mut unique: BTreeMap<BlockKey, BlockSpec> = BTreeMap::new();
    for spec in specs {
        unique.entry(spec.key).or_insert(*spec);
    }

    let mut items: Vec<BlockSpec> = unique.into_values().collect();
    items.sort_by(|a, b| {
        let area_a = u64::from(a.w_px) * u64::from(a.h_px);
        let area_b = u64::from(b.w_px) * u64::from(b.h_px);
        area_b
            .cmp(&area_a)
            .then(b.h_px.cmp(&a.h_px))
            .then(b.w_px.cmp(&a.w_px))
            .then(a.key.cmp(&b.key))
    });

    enum Slot {
        Open(OpenSheet),
        Dedicated(Sheet),
    }

    let sheet_tiles = (sheet_px / tile_px).max(1);
    let mut slots: Vec<Slot> = Vec::new();

    for it in &items {
        if it.w_px > sheet_px || it.h_px > sheet_px {
            slots.push(Slot::Dedicated(Sheet {
                w: it.w_px,
                h: it.h_px,
                placements: vec![(it.key, 0, 0)],
            }));
            continue;
        }
        let w_t = tiles_needed(it.w_px, tile_px);
        let h_t = tiles_needed(it.h_px, tile_px);
        let placed = slots.iter_mut().any(|s| match s {
            Slot::Open(open) => open.try_place(it.key, w_t, h_t, tile_px),
            Slot::Dedicated(_) => false,
        });
        if !placed {
            let mut sheet = OpenSheet::new(sheet_px, sheet_tiles);
            // Cannot fail: the block fits an empty sheet by construction.
            sheet.try_place(it.key, w_t, h_t, tile_px);
            slots.push(Slot::Open(sheet));
        }
    }

    let sheets: Vec<Sheet> = slots
        .into_iter()
        .map(|s| match s {
            Slot::Open(open) => open.sheet,
            Slot::Dedicated(sheet) => sheet,
        })
        .collect();

    let mut index = BTreeMap::new();
    for (i, sheet) in sheets.iter().enumerate() {
        for &(key, x, y) in &sheet.placements {
            index.insert(
                key,
                Placement {
                    sheet: i + 1,
                    x,
                    y,
                },
            );
        }
    }

    debug!(
        blocks = items.len(),
        sheets = sheets.len(),
        "sheet plan complete"
    );

    SheetPlan {
        sheet_px,
        tile_px,
        sheets,
        index,
    }
}
