use crate::error::{Result, UiPackError};
use image::RgbaImage;
use std::path::Path;

/// A fixed-tile-size atlas image addressed in tile units.
#[derive(Debug, Clone)]
pub struct AtlasSource {
    image: RgbaImage,
    tile_px: u32,
    cols: u32,
    rows: u32,
}

impl AtlasSource {
    pub fn from_image(image: RgbaImage, tile_px: u32) -> Result<Self> {
        let (w, h) = image.dimensions();
        if tile_px == 0 || w < tile_px || h < tile_px {
            return Err(UiPackError::Encode(format!(
                "atlas {w}x{h} smaller than one {tile_px}px tile"
            )));
        }
        Ok(Self {
            image,
            tile_px,
            cols: w / tile_px,
            rows: h / tile_px,
        })
    }

    pub fn open(path: &Path, tile_px: u32) -> Result<Self> {
        if !path.exists() {
            return Err(UiPackError::MissingAtlas(path.to_path_buf()));
        }
        let img = image::open(path)?.to_rgba8();
        Self::from_image(img, tile_px)
    }

    pub fn tile_px(&self) -> u32 {
        self.tile_px
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Copy tile (col, row) into `canvas` with its top-left at (dx, dy).
    /// Out-of-range tile coordinates are an error, never blank output.
    pub fn blit_tile(&self, canvas: &mut RgbaImage, col: u32, row: u32, dx: u32, dy: u32) -> Result<()> {
        if col >= self.cols || row >= self.rows {
            return Err(UiPackError::TileOutOfBounds { col, row });
        }
        let (cw, ch) = canvas.dimensions();
        let sx = col * self.tile_px;
        let sy = row * self.tile_px;
        for yy in 0..self.tile_px {
            for xx in 0..self.tile_px {
                if dx + xx < cw && dy + yy < ch {
                    let px = *self.image.get_pixel(sx + xx, sy + yy);
                    canvas.put_pixel(dx + xx, dy + yy, px);
                }
            }
        }
        Ok(())
    }
}

/// One skin pack: the CTM modules atlas plus an optional background tile
/// image. On disk this is a directory holding `Modules.png` and optionally
/// `Background.png`.
#[derive(Debug, Clone)]
pub struct SkinPack {
    pub name: String,
    pub modules: AtlasSource,
    pub background: Option<RgbaImage>,
}

pub const MODULES_FILENAME: &str = "Modules.png";
pub const BACKGROUND_FILENAME: &str = "Background.png";

impl SkinPack {
    pub fn load(dir: &Path, tile_px: u32) -> Result<Self> {
        let name = dir
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "skin".to_string());
        let modules = AtlasSource::open(&dir.join(MODULES_FILENAME), tile_px)?;
        let bg_path = dir.join(BACKGROUND_FILENAME);
        let background = if bg_path.exists() {
            Some(image::open(&bg_path)?.to_rgba8())
        } else {
            None
        };
        Ok(Self {
            name,
            modules,
            background,
        })
    }
}
