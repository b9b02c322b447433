//! Closed tagged-value types for element kinds and text styling.
//!
//! The persisted form of these values is a small bitmask (or name tag), so
//! each type exposes an explicit `from_bits`/`bits` pair that validates the
//! supported mask instead of trusting raw flag arithmetic.

use std::fmt;
use std::str::FromStr;

/// Text styling flags: any combination of bold, italic and underline.
///
/// Stored as a bit set; bits outside the supported mask are rejected at the
/// [`TextStyle::from_bits`] seam.
///
/// # Examples
///
/// ```
/// use easel_core::style::TextStyle;
///
/// let style = TextStyle::default().with_bold(true).with_italic(true);
/// assert!(style.bold());
/// assert!(style.italic());
/// assert!(!style.underline());
///
/// assert_eq!(TextStyle::from_bits(style.bits()), Some(style));
/// assert_eq!(TextStyle::from_bits(0x40), None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextStyle(u8);

impl TextStyle {
    pub const BOLD: u8 = 0x1;
    pub const ITALIC: u8 = 0x2;
    pub const UNDERLINE: u8 = 0x4;

    const SUPPORTED_MASK: u8 = Self::BOLD | Self::ITALIC | Self::UNDERLINE;

    /// Validates a raw bit set; `None` if any unsupported bit is present.
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::SUPPORTED_MASK != 0 {
            return None;
        }
        Some(Self(bits))
    }

    /// Returns the raw bit representation
    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn bold(self) -> bool {
        self.0 & Self::BOLD != 0
    }

    pub fn italic(self) -> bool {
        self.0 & Self::ITALIC != 0
    }

    pub fn underline(self) -> bool {
        self.0 & Self::UNDERLINE != 0
    }

    pub fn with_bold(self, on: bool) -> Self {
        self.with_bit(Self::BOLD, on)
    }

    pub fn with_italic(self, on: bool) -> Self {
        self.with_bit(Self::ITALIC, on)
    }

    pub fn with_underline(self, on: bool) -> Self {
        self.with_bit(Self::UNDERLINE, on)
    }

    fn with_bit(self, bit: u8, on: bool) -> Self {
        if on {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }
}

/// The kind of an association edge.
///
/// Exactly one of the four UML relationship kinds; arbitrary bit combinations
/// are rejected at [`AssociationKind::from_bits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    Extension,
    Implementation,
    Composition,
    Dependency,
}

impl AssociationKind {
    /// Validates a raw bit value; `None` unless exactly one supported bit is set.
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x1 => Some(Self::Extension),
            0x2 => Some(Self::Implementation),
            0x4 => Some(Self::Composition),
            0x8 => Some(Self::Dependency),
            _ => None,
        }
    }

    /// Returns the single-bit representation used in persisted records
    pub fn bits(self) -> u8 {
        match self {
            Self::Extension => 0x1,
            Self::Implementation => 0x2,
            Self::Composition => 0x4,
            Self::Dependency => 0x8,
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extension => "extension",
            Self::Implementation => "implementation",
            Self::Composition => "composition",
            Self::Dependency => "dependency",
        };
        write!(f, "{name}")
    }
}

/// The kind of a gadget node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GadgetKind {
    Class,
    UseCase,
    Actor,
}

impl GadgetKind {
    /// Returns the name tag used in persisted records
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::UseCase => "use_case",
            Self::Actor => "actor",
        }
    }
}

impl FromStr for GadgetKind {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "class" => Ok(Self::Class),
            "use_case" => Ok(Self::UseCase),
            "actor" => Ok(Self::Actor),
            _ => Err("unknown gadget kind"),
        }
    }
}

impl fmt::Display for GadgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
