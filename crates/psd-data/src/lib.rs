// psd-data: Serde structs and decoders for layered PSD documents
pub mod model;

pub use model::{rgba_len, FontRef, LayerNode, RasterData, Rgba, TextPayload, TextStyle};

use serde_json::error::Category;
use thiserror::Error;

/// Failure to turn raw document bytes into a [`LayerNode`] tree.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("document is empty")]
    Empty,
    #[error("document is truncated at line {line}, column {column}")]
    Truncated { line: usize, column: usize },
    #[error("malformed document at line {line}, column {column}: {message}")]
    Malformed {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("unsupported document: {0}")]
    Unsupported(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        let (line, column) = (err.line(), err.column());
        match err.classify() {
            Category::Eof => DecodeError::Truncated { line, column },
            _ => DecodeError::Malformed {
                line,
                column,
                message: err.to_string(),
            },
        }
    }
}

/// The seam to the external document decoder.
///
/// Implementations turn the raw bytes of a document into its layer tree. The
/// returned node is the document root.
pub trait DocumentDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<LayerNode, DecodeError>;
}

/// Decodes the JSON layer dumps written by `ag-psd` (`readPsd` output with
/// pixel data embedded as base64).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl DocumentDecoder for JsonDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<LayerNode, DecodeError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(DecodeError::Empty);
        }
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        if !value.is_object() {
            return Err(DecodeError::Unsupported(
                "document root must be an object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_minimal() {
        let data = json!({
            "width": 500,
            "height": 300,
            "children": []
        });
        let doc: LayerNode = serde_json::from_value(data).unwrap();
        assert_eq!(doc.width, Some(500.0));
        assert_eq!(doc.children.as_ref().map(Vec::len), Some(0));
        assert!(!doc.has_children());
    }

    #[test]
    fn test_deserialize_layers() {
        let data = json!({
            "width": 100, "height": 100,
            "children": [
                {
                    "name": "Background",
                    "top": 0, "left": 0,
                    "blendMode": "multiply",
                    "fillOpacity": 0.5,
                    "hidden": true,
                    "imageData": { "width": 1, "height": 1, "data": "AAAA/w==" }
                },
                {
                    "name": "Caption",
                    "clipping": true,
                    "text": {
                        "text": "Hello",
                        "style": {
                            "fillColor": { "r": 255, "g": 0, "b": 0 },
                            "font": { "name": "Arial" },
                            "fontSize": 24
                        }
                    }
                }
            ]
        });
        let doc: LayerNode = serde_json::from_value(data).unwrap();
        let layers = doc.child_layers();
        assert_eq!(layers.len(), 2);

        let bg = &layers[0];
        assert_eq!(bg.blend_mode.as_deref(), Some("multiply"));
        assert_eq!(bg.fill_opacity, Some(0.5));
        assert_eq!(bg.hidden, Some(true));
        let raster = bg.image_data.as_ref().expect("raster payload");
        assert_eq!(&raster.data[..], &[0, 0, 0, 255]);
        assert_eq!(raster.expected_len(), Some(4));

        let caption = &layers[1];
        assert_eq!(caption.clipping, Some(true));
        let style = caption.text.as_ref().and_then(|t| t.style.as_ref()).unwrap();
        assert_eq!(style.font.as_ref().map(|f| f.name.as_str()), Some("Arial"));
        assert_eq!(style.fill_color.map(|c| c.a), Some(1.0));
    }

    #[test]
    fn test_expected_len_overflow() {
        let raster = RasterData {
            width: u32::MAX,
            height: u32::MAX,
            data: vec![0u8; 4].into(),
        };
        assert_eq!(raster.expected_len(), None);
        assert_eq!(rgba_len(3, 2), Some(24));
    }

    #[test]
    fn test_pixels_accept_plain_arrays() {
        let data = json!({ "width": 1, "height": 1, "data": [1, 2, 3, 4] });
        let raster: RasterData = serde_json::from_value(data).unwrap();
        assert_eq!(&raster.data[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_decode_truncated() {
        let err = JsonDecoder.decode(br#"{"children": [{"name": "a"#).unwrap_err();
        assert!(matches!(err, DecodeError::Truncated { .. }), "{err:?}");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(JsonDecoder.decode(b""), Err(DecodeError::Empty)));
        assert!(matches!(
            JsonDecoder.decode(b"8BPS\x00\x01"),
            Err(DecodeError::Malformed { .. })
        ));
        assert!(matches!(
            JsonDecoder.decode(b"[1, 2]"),
            Err(DecodeError::Unsupported(_))
        ));
    }
}
