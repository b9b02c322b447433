//! Deterministic test doubles for the external capabilities.
//!
//! The model's only external call is text measurement; swapping in
//! [`FixedMeasurer`] makes every derived size a pure function of content and
//! font size, which the unit and integration tests rely on.

use easel_core::text::{MeasureError, TextMeasurer};

/// A measurer with fixed per-character metrics.
///
/// Width is proportional to character count and size, height to size alone.
/// Rejects zero sizes exactly like the real measurer.
pub struct FixedMeasurer;

impl FixedMeasurer {
    /// The width this measurer reports for `content` at `size_pt`
    pub fn width_of(content: &str, size_pt: u16) -> i32 {
        content.chars().count() as i32 * i32::from(size_pt) / 2
    }

    /// The height this measurer reports at `size_pt`
    pub fn height_of(size_pt: u16) -> i32 {
        i32::from(size_pt) + 4
    }
}

impl TextMeasurer for FixedMeasurer {
    fn measure(
        &self,
        content: &str,
        size_pt: u16,
        _font_file: &str,
    ) -> Result<(i32, i32), MeasureError> {
        if size_pt == 0 {
            return Err(MeasureError::NonPositiveSize);
        }
        Ok((Self::height_of(size_pt), Self::width_of(content, size_pt)))
    }
}
