use crate::atlas::AtlasSource;
use crate::ctm::{AtlasLayout, ctm_mask};
use crate::error::Result;
use crate::geom::{CellSet, Rect};
use crate::model::{Entry, Page, Tool};
use image::{Rgba, RgbaImage};

/// Fill color for painted cells when the skin pack has no background tile.
const FALLBACK_BACKGROUND: Rgba<u8> = Rgba([0x2b, 0x2b, 0x2b, 0xff]);

/// Assemble the full-resolution image of one entry variant: every cell of the
/// rectangle gets the atlas tile selected by its CTM mask against the
/// rectangle's own cell set.
pub fn compose_variant(
    atlas: &AtlasSource,
    layout: &AtlasLayout,
    rect: Rect,
    module_key: &str,
) -> Result<RgbaImage> {
    let (ox, oy) = layout.require_module_origin(module_key)?;
    let r = rect.normalized();
    let tile_px = layout.tile_px;
    let mut out = RgbaImage::new(r.width() * tile_px, r.height() * tile_px);

    let cells: CellSet = r.cell_set();
    for &(cx, cy) in &cells {
        let mask = ctm_mask(&cells, cx, cy);
        let (dx, dy) = layout.tile_offset(mask);
        atlas.blit_tile(
            &mut out,
            ox + dx,
            oy + dy,
            (cx - r.x0) as u32 * tile_px,
            (cy - r.y0) as u32 * tile_px,
        )?;
    }
    Ok(out)
}

/// True when the entry needs its own texture block on a sheet. Only buttons
/// qualify: toggles always (the consumer expects off/on/disabled states),
/// standard buttons only when a distinct hover or locked module is mapped.
/// Everything else is baked into the page background.
pub fn requires_component_export(layout: &AtlasLayout, entry: &Entry) -> bool {
    if !matches!(entry.tool, Tool::ButtonStandard | Tool::ButtonToggle) {
        return false;
    }
    let Some(modules) = layout.modules_for(entry.tool) else {
        return false;
    };
    let base = match entry.tool {
        Tool::ButtonToggle => modules.unpressed.as_deref().or(modules.base.as_deref()),
        _ => modules.base.as_deref(),
    };
    let Some(base) = base else {
        return false;
    };
    if entry.tool == Tool::ButtonToggle {
        return true;
    }
    [modules.hover.as_deref(), modules.locked.as_deref()]
        .into_iter()
        .flatten()
        .any(|m| m != base)
}

/// Compose the 2x2 variant block for a button entry. Quadrants (each the
/// entry's own size):
///
/// - standard button: base TL, hover BL, locked TR, locked_hover BR
/// - toggle button:   off TL, hover BL, on TR, disabled BR
///
/// Missing variants fall back to the base variant.
pub fn compose_block(atlas: &AtlasSource, layout: &AtlasLayout, entry: &Entry) -> Result<Option<RgbaImage>> {
    let Some(modules) = layout.modules_for(entry.tool) else {
        return Ok(None);
    };

    let variant = |key: Option<&str>, fallback: &RgbaImage| -> Result<RgbaImage> {
        match key {
            Some(k) if layout.module_origin(k).is_some() => {
                compose_variant(atlas, layout, entry.rect, k)
            }
            _ => Ok(fallback.clone()),
        }
    };

    match entry.tool {
        Tool::ButtonStandard => {
            let Some(base_key) = modules.base.as_deref() else {
                return Ok(None);
            };
            let base = compose_variant(atlas, layout, entry.rect, base_key)?;
            let hover = variant(modules.hover.as_deref(), &base)?;
            let locked = variant(modules.locked.as_deref(), &base)?;
            let locked_hover = variant(modules.locked_hover.as_deref(), &locked)?;
            Ok(Some(quadrants(&base, &hover, &locked, &locked_hover)))
        }
        Tool::ButtonToggle => {
            let Some(off_key) = modules.unpressed.as_deref().or(modules.base.as_deref()) else {
                return Ok(None);
            };
            let off = compose_variant(atlas, layout, entry.rect, off_key)?;
            let hover_key = if entry.active {
                modules.hover_base.as_deref()
            } else {
                modules.hover_unpressed.as_deref()
            };
            let hover = variant(hover_key, &off)?;
            let on = variant(modules.base.as_deref(), &off)?;
            let disabled_key = if entry.meta.locked {
                if entry.active {
                    modules.pressed_locked.as_deref()
                } else {
                    modules.unpressed_locked.as_deref()
                }
            } else {
                modules
                    .pressed_locked
                    .as_deref()
                    .or(modules.unpressed_locked.as_deref())
                    .or(modules.base.as_deref())
            };
            let disabled = variant(disabled_key, &on)?;
            Ok(Some(quadrants(&off, &hover, &on, &disabled)))
        }
        _ => {
            // Non-buttons are baked into backgrounds; replicate base anyway
            // so a caller asking for a block still gets a usable one.
            let Some(base_key) = modules.base.as_deref() else {
                return Ok(None);
            };
            let base = compose_variant(atlas, layout, entry.rect, base_key)?;
            Ok(Some(quadrants(&base, &base, &base, &base)))
        }
    }
}

/// Stack four same-size variants into one block: tl | tr / bl | br.
fn quadrants(tl: &RgbaImage, bl: &RgbaImage, tr: &RgbaImage, br: &RgbaImage) -> RgbaImage {
    let (w, h) = tl.dimensions();
    let mut out = RgbaImage::new(w * 2, h * 2);
    blit_image(&mut out, tl, 0, 0);
    blit_image(&mut out, bl, 0, h);
    blit_image(&mut out, tr, w, 0);
    blit_image(&mut out, br, w, h);
    out
}

pub(crate) fn blit_image(canvas: &mut RgbaImage, src: &RgbaImage, dx: u32, dy: u32) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = src.dimensions();
    for yy in 0..sh {
        for xx in 0..sw {
            if dx + xx < cw && dy + yy < ch {
                canvas.put_pixel(dx + xx, dy + yy, *src.get_pixel(xx, yy));
            }
        }
    }
}

/// Render a CTM cell set into `canvas` in page space (cell (cx, cy) lands at
/// pixel (cx, cy) * tile_px). Skips silently when the module is unmapped;
/// that is a documented degradation, unlike a broken atlas which errors.
fn blit_ctm_cellset(
    canvas: &mut RgbaImage,
    atlas: &AtlasSource,
    layout: &AtlasLayout,
    cells: &CellSet,
    module_key: &str,
) -> Result<()> {
    let Some((ox, oy)) = layout.module_origin(module_key) else {
        return Ok(());
    };
    for &(cx, cy) in cells {
        if cx < 0 || cy < 0 {
            continue;
        }
        let mask = ctm_mask(cells, cx, cy);
        let (dx, dy) = layout.tile_offset(mask);
        atlas.blit_tile(
            canvas,
            ox + dx,
            oy + dy,
            cx as u32 * layout.tile_px,
            cy as u32 * layout.tile_px,
        )?;
    }
    Ok(())
}

/// Render the flat background image of one page at full page resolution
/// (`grid_n * tile_px` square):
///
/// - painted cells tiled with the skin background (or a solid fill),
/// - the `background_border` CTM overlay over the painted cell set,
/// - a `button_background` fill under every button rect,
/// - static entries (those without exported texture blocks) baked in.
///
/// Each entry's cell set is rendered separately so distinct adjacent
/// elements never connect.
pub fn render_background_page(
    atlas: &AtlasSource,
    layout: &AtlasLayout,
    skin_background: Option<&RgbaImage>,
    page: &Page,
) -> Result<RgbaImage> {
    let n = page.grid.n() as u32;
    let tile_px = layout.tile_px;
    let mut img = RgbaImage::new(n * tile_px, n * tile_px);

    let painted = page.grid.painted_cells();

    match skin_background {
        Some(tile) if tile.width() > 0 && tile.height() > 0 => {
            for &(x, y) in &painted {
                copy_wrapped(&mut img, tile, x as u32 * tile_px, y as u32 * tile_px, tile_px);
            }
        }
        _ => {
            for &(x, y) in &painted {
                for yy in 0..tile_px {
                    for xx in 0..tile_px {
                        img.put_pixel(
                            x as u32 * tile_px + xx,
                            y as u32 * tile_px + yy,
                            FALLBACK_BACKGROUND,
                        );
                    }
                }
            }
        }
    }

    if !painted.is_empty() {
        blit_ctm_cellset(&mut img, atlas, layout, &painted, "background_border")?;
    }

    for entry in page.entries() {
        if !matches!(entry.tool, Tool::ButtonStandard | Tool::ButtonToggle) {
            continue;
        }
        let cells = entry.rect.normalized().cell_set();
        blit_ctm_cellset(&mut img, atlas, layout, &cells, "button_background")?;
    }

    for entry in page.entries() {
        if entry.tool == Tool::Background || requires_component_export(layout, entry) {
            continue;
        }
        let Some(base) = layout
            .modules_for(entry.tool)
            .and_then(|m| m.base.as_deref())
        else {
            continue;
        };
        let cells = entry.rect.normalized().cell_set();
        blit_ctm_cellset(&mut img, atlas, layout, &cells, base)?;
    }

    Ok(img)
}

/// Tile one `tile_px`-square cell from `src` starting at the source offset
/// that keeps the pattern aligned to page space, wrapping at source edges.
fn copy_wrapped(canvas: &mut RgbaImage, src: &RgbaImage, dx: u32, dy: u32, tile_px: u32) {
    let (sw, sh) = src.dimensions();
    let (cw, ch) = canvas.dimensions();
    for yy in 0..tile_px {
        for xx in 0..tile_px {
            if dx + xx < cw && dy + yy < ch {
                let sx = (dx + xx) % sw;
                let sy = (dy + yy) % sh;
                canvas.put_pixel(dx + xx, dy + yy, *src.get_pixel(sx, sy));
            }
        }
    }
}
