//! Core library for exporting painted grid-GUI layouts as texture sheets and
//! a machine-readable manifest.
//!
//! - Background codec: boolean grid <-> disjoint rectangle list
//! - CTM resolver: 4-neighbor mask -> atlas tile offset within a 4x4 module
//! - Block composer: per-entry variant images stacked into 2x2 texture blocks
//! - Sheet packer: deterministic first-fit placement over tile-occupancy grids
//! - Manifest codec: versioned JSON save format with legacy upgrade rules
//!
//! Quick example:
//! ```ignore
//! use uipack_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let project = parse_document(&std::fs::read_to_string("layout.json")?)?;
//! let layout = AtlasLayout::default();
//! let plan = plan_export(&project, &layout, &ExportConfig::default());
//! println!("sheets: {}", plan.sheets.sheets.len());
//! # Ok(()) }
//! ```

pub mod atlas;
pub mod background;
pub mod compose;
pub mod ctm;
pub mod error;
pub mod export;
pub mod geom;
pub mod manifest;
pub mod model;
pub mod pack;

pub use atlas::*;
pub use background::*;
pub use compose::*;
pub use ctm::*;
pub use error::*;
pub use export::*;
pub use geom::*;
pub use manifest::*;
pub use model::*;
pub use pack::*;

/// Convenience prelude for common types and functions.
/// Importing `uipack_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::atlas::{AtlasSource, SkinPack};
    pub use crate::background::{compress_background, decompress_background};
    pub use crate::ctm::{AtlasLayout, ctm_mask, ctm_tile_offset};
    pub use crate::error::{Result, UiPackError};
    pub use crate::export::{
        ArtifactWriter, DirWriter, ExportConfig, ExportPlan, plan_export, runtime_manifest,
        write_export,
    };
    pub use crate::geom::{Grid, Rect};
    pub use crate::manifest::{DOCUMENT_VERSION, document_value, parse_document, parse_document_value};
    pub use crate::model::{Entry, EntryMeta, HoverText, Page, PageAction, Project, Tool};
    pub use crate::pack::{BlockKey, BlockSpec, Placement, Sheet, SheetPlan, plan_sheets};
}
