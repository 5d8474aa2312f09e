//! # Blend Mode Table
//!
//! Maps the blend-mode names a layered document stores to the blend modes the
//! renderer understands.
//!
//! The table is total over the document names. Modes the renderer cannot
//! express (`dissolve`, `darker color`, `lighter color`, `hue`) fall back to
//! `normal`, losing the effect. Names outside the table pass
//! through unchanged as [`RendererBlendMode::Other`] and the renderer decides
//! what to do with them.

use std::fmt;
use tracing::debug;

/// Blend modes as named by the source document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentBlendMode {
    PassThrough,
    Normal,
    Dissolve,
    Darken,
    Multiply,
    ColorBurn,
    LinearBurn,
    DarkerColor,
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,
    LighterColor,
    Overlay,
    SoftLight,
    HardLight,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl DocumentBlendMode {
    pub const ALL: [DocumentBlendMode; 28] = [
        Self::PassThrough,
        Self::Normal,
        Self::Dissolve,
        Self::Darken,
        Self::Multiply,
        Self::ColorBurn,
        Self::LinearBurn,
        Self::DarkerColor,
        Self::Lighten,
        Self::Screen,
        Self::ColorDodge,
        Self::LinearDodge,
        Self::LighterColor,
        Self::Overlay,
        Self::SoftLight,
        Self::HardLight,
        Self::VividLight,
        Self::LinearLight,
        Self::PinLight,
        Self::HardMix,
        Self::Difference,
        Self::Exclusion,
        Self::Subtract,
        Self::Divide,
        Self::Hue,
        Self::Saturation,
        Self::Color,
        Self::Luminosity,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        let mode = match name {
            "pass through" => Self::PassThrough,
            "normal" => Self::Normal,
            "dissolve" => Self::Dissolve,
            "darken" => Self::Darken,
            "multiply" => Self::Multiply,
            "color burn" => Self::ColorBurn,
            "linear burn" => Self::LinearBurn,
            "darker color" => Self::DarkerColor,
            "lighten" => Self::Lighten,
            "screen" => Self::Screen,
            "color dodge" => Self::ColorDodge,
            "linear dodge" => Self::LinearDodge,
            "lighter color" => Self::LighterColor,
            "overlay" => Self::Overlay,
            "soft light" => Self::SoftLight,
            "hard light" => Self::HardLight,
            "vivid light" => Self::VividLight,
            "linear light" => Self::LinearLight,
            "pin light" => Self::PinLight,
            "hard mix" => Self::HardMix,
            "difference" => Self::Difference,
            "exclusion" => Self::Exclusion,
            "subtract" => Self::Subtract,
            "divide" => Self::Divide,
            "hue" => Self::Hue,
            "saturation" => Self::Saturation,
            "color" => Self::Color,
            "luminosity" => Self::Luminosity,
            _ => return None,
        };
        Some(mode)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::PassThrough => "pass through",
            Self::Normal => "normal",
            Self::Dissolve => "dissolve",
            Self::Darken => "darken",
            Self::Multiply => "multiply",
            Self::ColorBurn => "color burn",
            Self::LinearBurn => "linear burn",
            Self::DarkerColor => "darker color",
            Self::Lighten => "lighten",
            Self::Screen => "screen",
            Self::ColorDodge => "color dodge",
            Self::LinearDodge => "linear dodge",
            Self::LighterColor => "lighter color",
            Self::Overlay => "overlay",
            Self::SoftLight => "soft light",
            Self::HardLight => "hard light",
            Self::VividLight => "vivid light",
            Self::LinearLight => "linear light",
            Self::PinLight => "pin light",
            Self::HardMix => "hard mix",
            Self::Difference => "difference",
            Self::Exclusion => "exclusion",
            Self::Subtract => "subtract",
            Self::Divide => "divide",
            Self::Hue => "hue",
            Self::Saturation => "saturation",
            Self::Color => "color",
            Self::Luminosity => "luminosity",
        }
    }

    /// The renderer-side equivalent (or its `normal` fallback).
    pub fn to_renderer(self) -> RendererBlendMode {
        use RendererBlendMode as R;
        match self {
            Self::PassThrough => R::Inherit,
            Self::Normal => R::Normal,
            Self::Dissolve => R::Normal,
            Self::Darken => R::Darken,
            Self::Multiply => R::Multiply,
            Self::ColorBurn => R::ColorBurn,
            Self::LinearBurn => R::LinearBurn,
            Self::DarkerColor => R::Normal,
            Self::Lighten => R::Lighten,
            Self::Screen => R::Screen,
            Self::ColorDodge => R::ColorDodge,
            Self::LinearDodge => R::LinearDodge,
            Self::LighterColor => R::Normal,
            Self::Overlay => R::Overlay,
            Self::SoftLight => R::SoftLight,
            Self::HardLight => R::HardLight,
            Self::VividLight => R::VividLight,
            Self::LinearLight => R::LinearLight,
            Self::PinLight => R::PinLight,
            Self::HardMix => R::HardMix,
            Self::Difference => R::Difference,
            Self::Exclusion => R::Exclusion,
            Self::Subtract => R::Subtract,
            Self::Divide => R::Divide,
            Self::Hue => R::Normal,
            Self::Saturation => R::Saturation,
            Self::Color => R::Color,
            Self::Luminosity => R::Luminosity,
        }
    }

    /// Whether the renderer mapping drops the mode's effect.
    pub fn is_lossy(self) -> bool {
        matches!(
            self,
            Self::Dissolve | Self::DarkerColor | Self::LighterColor | Self::Hue
        )
    }
}

/// Blend modes as named by the rendering framework.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RendererBlendMode {
    Inherit,
    #[default]
    Normal,
    Darken,
    Multiply,
    ColorBurn,
    LinearBurn,
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,
    Overlay,
    SoftLight,
    HardLight,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Saturation,
    Color,
    Luminosity,
    /// A name outside the table, passed through verbatim.
    Other(String),
}

impl RendererBlendMode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inherit => "inherit",
            Self::Normal => "normal",
            Self::Darken => "darken",
            Self::Multiply => "multiply",
            Self::ColorBurn => "color-burn",
            Self::LinearBurn => "linear-burn",
            Self::Lighten => "lighten",
            Self::Screen => "screen",
            Self::ColorDodge => "color-dodge",
            Self::LinearDodge => "linear-dodge",
            Self::Overlay => "overlay",
            Self::SoftLight => "soft-light",
            Self::HardLight => "hard-light",
            Self::VividLight => "vivid-light",
            Self::LinearLight => "linear-light",
            Self::PinLight => "pin-light",
            Self::HardMix => "hard-mix",
            Self::Difference => "difference",
            Self::Exclusion => "exclusion",
            Self::Subtract => "subtract",
            Self::Divide => "divide",
            Self::Saturation => "saturation",
            Self::Color => "color",
            Self::Luminosity => "luminosity",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for RendererBlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Looks up the renderer blend mode for a document blend-mode name.
pub fn map_blend_mode(name: &str) -> RendererBlendMode {
    match DocumentBlendMode::from_name(name) {
        Some(mode) => {
            if mode.is_lossy() {
                debug!(mode = name, "blend mode has no renderer equivalent, using normal");
            }
            mode.to_renderer()
        }
        None => RendererBlendMode::Other(name.to_string()),
    }
}

/// The document blend-mode name that maps to `mode`, preferring exact matches.
///
/// Used to write a renderer-side change back into the document record.
pub fn document_name_for(mode: &RendererBlendMode) -> String {
    DocumentBlendMode::ALL
        .iter()
        .find(|doc| !doc.is_lossy() && doc.to_renderer() == *mode)
        .map(|doc| doc.name().to_string())
        .unwrap_or_else(|| mode.as_str().to_string())
}
