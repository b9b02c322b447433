//! Text attributes owned by gadgets and associations.
//!
//! An [`Attribute`] pairs editable text state (content, size, style, font)
//! with a measured [`AttributeDrawData`] record. Every setter re-derives the
//! record synchronously before returning, so a reader never observes a stale
//! measurement after a successful mutation. Measurement itself is an external
//! capability threaded in through [`TextContext`].
//!
//! [`AnchoredAttribute`] adds the path ratio an association uses to place the
//! attribute along its edge.

use std::rc::Rc;

use easel_core::{
    draw::AttributeDrawData,
    style::TextStyle,
    text::{TextMeasurer, is_valid_font_path},
};

use crate::{config::AppConfig, error::ModelError};

/// Shared measurement context: the measurer plus the configured defaults.
///
/// Constructed once per diagram and handed to every attribute, replacing the
/// process-wide default-font lookup of older designs with an explicit value.
pub struct TextContext {
    measurer: Rc<dyn TextMeasurer>,
    default_font: String,
    default_size: u16,
}

impl TextContext {
    pub fn new(measurer: Rc<dyn TextMeasurer>, config: &AppConfig) -> Self {
        Self {
            measurer,
            default_font: config.text.default_font.clone(),
            default_size: config.text.default_size,
        }
    }

    /// Font file used when an attribute is given an empty path
    pub fn default_font(&self) -> &str {
        &self.default_font
    }

    /// Font size in points for newly created attributes
    pub fn default_size(&self) -> u16 {
        self.default_size
    }

    fn measure(
        &self,
        content: &str,
        size: u16,
        font_file: &str,
    ) -> Result<(i32, i32), ModelError> {
        Ok(self.measurer.measure(content, size, font_file)?)
    }
}

impl std::fmt::Debug for TextContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextContext")
            .field("default_font", &self.default_font)
            .field("default_size", &self.default_size)
            .finish_non_exhaustive()
    }
}

/// An editable, measured piece of text.
///
/// Invariants: `size > 0` always; after any setter returns `Ok`, the draw
/// record reflects the current content, size, style and font. A measurement
/// failure after the state field was already updated is reported without
/// rolling the field back; the draw record then lags until the next
/// successful re-derivation.
#[derive(Debug)]
pub struct Attribute {
    context: Rc<TextContext>,
    content: String,
    size: u16,
    style: TextStyle,
    font_file: String,
    draw_data: AttributeDrawData,
}

impl Attribute {
    /// Creates an attribute with the given content and the configured
    /// default size and font.
    pub fn new(context: Rc<TextContext>, content: &str) -> Result<Self, ModelError> {
        let size = context.default_size();
        if size == 0 {
            return Err(ModelError::NonPositiveFontSize);
        }
        let font_file = context.default_font().to_string();
        let (height, width) = context.measure(content, size, &font_file)?;

        let style = TextStyle::default();
        Ok(Self {
            draw_data: AttributeDrawData {
                content: content.to_string(),
                height,
                width,
                size,
                style,
                font_file: font_file.clone(),
            },
            context,
            content: content.to_string(),
            size,
            style,
            font_file,
        })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn style(&self) -> TextStyle {
        self.style
    }

    pub fn font_file(&self) -> &str {
        &self.font_file
    }

    /// The measured snapshot, consistent with the last committed state
    pub fn draw_data(&self) -> &AttributeDrawData {
        &self.draw_data
    }

    pub fn set_content(&mut self, content: &str) -> Result<(), ModelError> {
        self.content = content.to_string();
        self.refresh_draw_data()
    }

    /// Sets the font size in points; zero is rejected with no state change.
    pub fn set_size(&mut self, size: u16) -> Result<(), ModelError> {
        if size == 0 {
            return Err(ModelError::NonPositiveFontSize);
        }
        self.size = size;
        self.refresh_draw_data()
    }

    pub fn set_style(&mut self, style: TextStyle) -> Result<(), ModelError> {
        self.style = style;
        self.refresh_draw_data()
    }

    /// Sets the font file. An empty path selects the configured default;
    /// anything else must be a syntactically valid font path.
    pub fn set_font_file(&mut self, font_file: &str) -> Result<(), ModelError> {
        let resolved = if font_file.is_empty() {
            self.context.default_font().to_string()
        } else if is_valid_font_path(font_file) {
            font_file.to_string()
        } else {
            return Err(ModelError::InvalidFontPath(font_file.to_string()));
        };
        self.font_file = resolved;
        self.refresh_draw_data()
    }

    /// Re-measures and rebuilds the draw record from current state.
    fn refresh_draw_data(&mut self) -> Result<(), ModelError> {
        let (height, width) = self
            .context
            .measure(&self.content, self.size, &self.font_file)?;
        self.draw_data = AttributeDrawData {
            content: self.content.clone(),
            height,
            width,
            size: self.size,
            style: self.style,
            font_file: self.font_file.clone(),
        };
        Ok(())
    }
}

/// An attribute anchored to a position along an association's path.
#[derive(Debug)]
pub struct AnchoredAttribute {
    attribute: Attribute,
    ratio: f64,
}

impl AnchoredAttribute {
    /// Wraps an attribute with a path ratio; the ratio must lie in `[0, 1]`.
    pub fn new(attribute: Attribute, ratio: f64) -> Result<Self, ModelError> {
        validate_ratio(ratio)?;
        Ok(Self { attribute, ratio })
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Moves the attribute along the path; out-of-range values are rejected
    /// with the stored ratio unchanged.
    pub fn set_ratio(&mut self, ratio: f64) -> Result<(), ModelError> {
        validate_ratio(ratio)?;
        self.ratio = ratio;
        Ok(())
    }

    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub fn attribute_mut(&mut self) -> &mut Attribute {
        &mut self.attribute
    }
}

/// Rejects ratios outside `[0, 1]` (NaN included).
pub(crate) fn validate_ratio(ratio: f64) -> Result<(), ModelError> {
    if (0.0..=1.0).contains(&ratio) {
        Ok(())
    } else {
        Err(ModelError::RatioOutOfRange(ratio))
    }
}
