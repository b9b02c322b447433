//! Text measurement capability.
//!
//! The model never rasterizes text; it only needs to know how much space a
//! piece of content occupies so gadget and attribute draw records stay
//! consistent. That capability is expressed as the [`TextMeasurer`] trait,
//! with [`CosmicMeasurer`] providing real font metrics via `cosmic-text`.
//! Tests substitute a deterministic implementation.

use std::{
    collections::HashSet,
    sync::Mutex,
};

use cosmic_text::{Attrs, Buffer, FontSystem, Metrics, Shaping};
use log::{debug, info};
use thiserror::Error;

/// Failures surfaced by text measurement.
#[derive(Debug, Error)]
pub enum MeasureError {
    #[error("font size must be positive")]
    NonPositiveSize,

    #[error("failed to load font `{path}`: {source}")]
    FontLoad {
        path: String,
        source: std::io::Error,
    },
}

/// Measures a piece of text at a given point size with a given font file.
///
/// Returns `(height, width)` in integer pixels. Implementations must be
/// deterministic for identical inputs; the model re-measures synchronously on
/// every content/size/style/font mutation and relies on identical results for
/// identical state.
pub trait TextMeasurer {
    fn measure(&self, content: &str, size_pt: u16, font_file: &str)
    -> Result<(i32, i32), MeasureError>;
}

/// Syntactic validation for font file paths.
///
/// An empty path is not valid here; callers treat the empty string as
/// "fall back to the configured default" before reaching this check.
pub fn is_valid_font_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".ttf") || lower.ends_with(".otf") || lower.ends_with(".ttc")
}

/// Real text measurement backed by a shared `cosmic-text` [`FontSystem`].
///
/// Font files are loaded into the font database on first use and remembered,
/// so repeated measurement against the same font is cheap.
pub struct CosmicMeasurer {
    font_system: Mutex<FontSystem>,
    loaded_fonts: Mutex<HashSet<String>>,
}

impl CosmicMeasurer {
    pub fn new() -> Self {
        info!("Initializing FontSystem");
        Self {
            font_system: Mutex::new(FontSystem::new()),
            loaded_fonts: Mutex::new(HashSet::new()),
        }
    }

    /// Loads `path` into the font database once; later calls are no-ops.
    fn ensure_font_loaded(
        &self,
        font_system: &mut FontSystem,
        path: &str,
    ) -> Result<(), MeasureError> {
        let mut loaded = self
            .loaded_fonts
            .lock()
            .expect("failed to lock font path set");
        if loaded.contains(path) {
            return Ok(());
        }

        debug!(font = path; "Loading font file");
        font_system
            .db_mut()
            .load_font_file(path)
            .map_err(|source| MeasureError::FontLoad {
                path: path.to_string(),
                source,
            })?;
        loaded.insert(path.to_string());
        Ok(())
    }
}

impl Default for CosmicMeasurer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMeasurer for CosmicMeasurer {
    fn measure(
        &self,
        content: &str,
        size_pt: u16,
        font_file: &str,
    ) -> Result<(i32, i32), MeasureError> {
        if size_pt == 0 {
            return Err(MeasureError::NonPositiveSize);
        }

        let mut font_system = self.font_system.lock().expect("failed to lock FontSystem");
        if !font_file.is_empty() {
            self.ensure_font_loaded(&mut font_system, font_file)?;
        }

        // Convert font size from points to pixels (roughly 1.33x multiplier
        // for standard DPI) and use an approximate line height.
        let font_size_px = f32::from(size_pt) * 1.33;
        let line_height = font_size_px * 1.15;
        let metrics = Metrics::new(font_size_px, line_height);

        if content.is_empty() {
            return Ok((line_height.ceil() as i32, 0));
        }

        let mut buffer = Buffer::new(&mut font_system, metrics);
        let mut buffer = buffer.borrow_with(&mut font_system);

        let attrs = Attrs::new();
        buffer.set_size(None, None);
        buffer.set_text(content, &attrs, Shaping::Advanced, None);
        buffer.shape_until_scroll(true);

        let mut max_width: f32 = 0.0;
        let mut total_height: f32 = 0.0;

        let layout_runs: Vec<_> = buffer.layout_runs().collect();
        if !layout_runs.is_empty() {
            for last in layout_runs.iter().map(|run| run.glyphs.last()) {
                if let Some(last) = last {
                    let run_width = last.x + last.w;
                    max_width = max_width.max(run_width);
                }
                total_height += metrics.line_height;
            }
        } else {
            // No shaping output for this content; estimate from glyph count.
            max_width = content.chars().count() as f32 * (font_size_px * 0.55);
            total_height = metrics.line_height;
        }

        Ok((total_height.ceil() as i32, max_width.ceil() as i32))
    }
}
