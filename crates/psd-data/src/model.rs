use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// One entry of a decoded layered document: a group, a raster layer or a text layer.
///
/// Field names follow the JSON layer dumps produced by `ag-psd`, so a document
/// exported by that tool deserializes directly. The root of a document uses the
/// same type; it only ever carries `width`, `height` and `children`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayerNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub top: Option<f64>,
    #[serde(default)]
    pub left: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    /// A non-empty list marks a group; an empty one is treated as a leaf.
    #[serde(default)]
    pub children: Option<Vec<LayerNode>>,
    #[serde(default)]
    pub blend_mode: Option<String>,
    #[serde(default)]
    pub fill_opacity: Option<f64>,
    #[serde(default)]
    pub hidden: Option<bool>,
    #[serde(default)]
    pub clipping: Option<bool>,
    #[serde(default)]
    pub knockout: Option<bool>,
    #[serde(default)]
    pub mask: Option<Box<LayerNode>>,
    #[serde(default)]
    pub text: Option<TextPayload>,
    #[serde(default)]
    pub image_data: Option<RasterData>,
}

impl LayerNode {
    /// A leaf layer with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// A group layer holding `children` in document order.
    pub fn group(name: impl Into<String>, children: Vec<LayerNode>) -> Self {
        Self {
            children: Some(children),
            ..Self::named(name)
        }
    }

    /// A raster layer with an RGBA pixel payload.
    pub fn raster(
        name: impl Into<String>,
        width: u32,
        height: u32,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            width: Some(width as f64),
            height: Some(height as f64),
            image_data: Some(RasterData {
                width,
                height,
                data: data.into(),
            }),
            ..Self::named(name)
        }
    }

    /// A text layer with the default style.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: Some(TextPayload {
                text: text.into(),
                style: None,
            }),
            ..Self::named(name)
        }
    }

    pub fn at(mut self, top: f64, left: f64) -> Self {
        self.top = Some(top);
        self.left = Some(left);
        self
    }

    pub fn with_blend_mode(mut self, mode: impl Into<String>) -> Self {
        self.blend_mode = Some(mode.into());
        self
    }

    pub fn clipped(mut self) -> Self {
        self.clipping = Some(true);
        self
    }

    /// Children slice, empty for leaves.
    pub fn child_layers(&self) -> &[LayerNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn has_children(&self) -> bool {
        !self.child_layers().is_empty()
    }
}

/// Text content and style of a text layer.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct TextPayload {
    pub text: String,
    #[serde(default)]
    pub style: Option<TextStyle>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    #[serde(default)]
    pub fill_color: Option<Rgba>,
    #[serde(default)]
    pub font: Option<FontRef>,
    #[serde(default)]
    pub font_size: Option<f32>,
    #[serde(default)]
    pub stroke_color: Option<Rgba>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct FontRef {
    pub name: String,
}

/// Color as stored by the source format: 0-255 channels, 0-1 alpha.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "default_alpha")]
    pub a: f32,
}

fn default_alpha() -> f32 {
    1.0
}

/// Straight (non-premultiplied) RGBA pixels of a raster layer.
///
/// The pixel buffer is shared so that node copies and background texture
/// decodes never duplicate it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RasterData {
    pub width: u32,
    pub height: u32,
    #[serde(
        serialize_with = "serialize_pixels",
        deserialize_with = "deserialize_pixels"
    )]
    pub data: Arc<[u8]>,
}

impl RasterData {
    /// Byte length of `width` x `height` RGBA pixels, or `None` if the
    /// declared dimensions overflow `usize`.
    pub fn expected_len(&self) -> Option<usize> {
        rgba_len(self.width, self.height)
    }
}

/// Byte length of a `width` x `height` RGBA buffer, `None` on overflow.
pub fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(4)
}

// Dumps either embed pixels as a base64 string or as a plain byte array.
#[derive(Deserialize)]
#[serde(untagged)]
enum PixelRepr {
    Encoded(String),
    Raw(Vec<u8>),
}

fn deserialize_pixels<'de, D>(deserializer: D) -> Result<Arc<[u8]>, D::Error>
where
    D: Deserializer<'de>,
{
    let bytes = match PixelRepr::deserialize(deserializer)? {
        PixelRepr::Raw(bytes) => bytes,
        PixelRepr::Encoded(text) => STANDARD
            .decode(text.as_bytes())
            .map_err(serde::de::Error::custom)?,
    };
    Ok(bytes.into())
}

fn serialize_pixels<S>(data: &Arc<[u8]>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&STANDARD.encode(data))
}
