use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::CacheError;

/// How the bytes of the selected key are decoded for display.
///
/// Closed set: the shell picks one at its input boundary and the pipeline
/// never re-derives it from free-form text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewerKind {
    /// Bytes shown as UTF-8 text.
    #[default]
    Text,

    /// Bytes parsed as a JSON document.
    Json,

    /// Bytes decoded as a bitmap (PNG, JPEG).
    Image,
}

impl ViewerKind {
    pub const ALL: &'static [ViewerKind] = &[ViewerKind::Text, ViewerKind::Json, ViewerKind::Image];

    pub fn label(self) -> &'static str {
        match self {
            ViewerKind::Text => "Text",
            ViewerKind::Json => "Json",
            ViewerKind::Image => "Image",
        }
    }
}

impl std::fmt::Display for ViewerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown viewer '{0}' (expected text, json or image)")]
pub struct ParseViewerKindError(pub String);

impl FromStr for ViewerKind {
    type Err = ParseViewerKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseViewerKindError(trimmed.to_string()))
    }
}

/// JSON viewer payload.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonModel {
    Parsed(serde_json::Value),
    /// Bytes were not valid JSON; shown as text instead.
    Raw(String),
}

/// Decoded bitmap in RGBA8 layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<[u8]>,
}

/// Image viewer payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageModel {
    Decoded(DecodedImage),
    /// Bytes could not be decoded; the UI shows a broken-image placeholder.
    Broken { reason: String },
}

/// Value handed to the per-viewer widget.
///
/// Built once per fetch and replaced wholesale by the next one.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerModel {
    Text(String),
    Json(JsonModel),
    Image(ImageModel),
}

impl ViewerModel {
    pub fn kind(&self) -> ViewerKind {
        match self {
            ViewerModel::Text(_) => ViewerKind::Text,
            ViewerModel::Json(_) => ViewerKind::Json,
            ViewerModel::Image(_) => ViewerKind::Image,
        }
    }

    /// True when the viewer could not interpret the bytes and fell back to a
    /// placeholder representation.
    pub fn is_fallback(&self) -> bool {
        matches!(
            self,
            ViewerModel::Json(JsonModel::Raw(_)) | ViewerModel::Image(ImageModel::Broken { .. })
        )
    }
}

/// Decode `bytes` for the given viewer.
///
/// Never fails: undecodable input yields the viewer's fallback model.
pub fn decode(kind: ViewerKind, bytes: &[u8]) -> ViewerModel {
    decode_with_fallback(kind, bytes).0
}

/// Decode `bytes`, returning the fallback model together with the reason it
/// was needed.
pub fn decode_with_fallback(kind: ViewerKind, bytes: &[u8]) -> (ViewerModel, Option<CacheError>) {
    match decode_strict(kind, bytes) {
        Ok(model) => (model, None),
        Err(error) => (fallback(kind, bytes, &error), Some(error)),
    }
}

/// Decode `bytes`, reporting a [`CacheError::Decode`] instead of falling back.
pub fn decode_strict(kind: ViewerKind, bytes: &[u8]) -> Result<ViewerModel, CacheError> {
    match kind {
        ViewerKind::Text => Ok(ViewerModel::Text(
            String::from_utf8_lossy(bytes).into_owned(),
        )),
        ViewerKind::Json => serde_json::from_slice(bytes)
            .map(|value| ViewerModel::Json(JsonModel::Parsed(value)))
            .map_err(|e| CacheError::Decode {
                viewer: kind.label(),
                message: e.to_string(),
            }),
        ViewerKind::Image => {
            let image = image::load_from_memory(bytes).map_err(|e| CacheError::Decode {
                viewer: kind.label(),
                message: e.to_string(),
            })?;
            let rgba = image.to_rgba8();

            Ok(ViewerModel::Image(ImageModel::Decoded(DecodedImage {
                width: rgba.width(),
                height: rgba.height(),
                rgba: Arc::from(rgba.into_raw()),
            })))
        }
    }
}

fn fallback(kind: ViewerKind, bytes: &[u8], error: &CacheError) -> ViewerModel {
    match kind {
        ViewerKind::Text => ViewerModel::Text(String::from_utf8_lossy(bytes).into_owned()),
        ViewerKind::Json => {
            ViewerModel::Json(JsonModel::Raw(String::from_utf8_lossy(bytes).into_owned()))
        }
        ViewerKind::Image => ViewerModel::Image(ImageModel::Broken {
            reason: error.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_viewer_kind_case_insensitively() {
        assert_eq!("json".parse::<ViewerKind>(), Ok(ViewerKind::Json));
        assert_eq!(" IMAGE ".parse::<ViewerKind>(), Ok(ViewerKind::Image));
        assert_eq!("Text".parse::<ViewerKind>(), Ok(ViewerKind::Text));
        assert_eq!(
            "hex".parse::<ViewerKind>(),
            Err(ParseViewerKindError("hex".to_string()))
        );
    }

    #[test]
    fn text_viewer_replaces_invalid_utf8() {
        let model = decode(ViewerKind::Text, &[b'h', b'i', 0xFF]);
        assert_eq!(model, ViewerModel::Text("hi\u{FFFD}".to_string()));
        assert!(!model.is_fallback());
    }

    #[test]
    fn json_viewer_parses_document() {
        let model = decode(ViewerKind::Json, br#"{"x":1}"#);
        assert_eq!(model, ViewerModel::Json(JsonModel::Parsed(json!({ "x": 1 }))));
        assert!(!model.is_fallback());
    }

    #[test]
    fn json_viewer_falls_back_to_raw_text() {
        let model = decode(ViewerKind::Json, b"not json");
        assert_eq!(
            model,
            ViewerModel::Json(JsonModel::Raw("not json".to_string()))
        );
        assert!(model.is_fallback());
    }

    #[test]
    fn strict_decode_reports_decode_error() {
        let error = decode_strict(ViewerKind::Json, b"{").unwrap_err();
        assert!(matches!(error, CacheError::Decode { viewer: "Json", .. }));
    }

    #[test]
    fn image_viewer_marks_garbage_as_broken() {
        let model = decode(ViewerKind::Image, b"definitely not a png");
        assert!(matches!(
            model,
            ViewerModel::Image(ImageModel::Broken { .. })
        ));
        assert!(model.is_fallback());
        assert_eq!(model.kind(), ViewerKind::Image);
    }

    #[test]
    fn image_viewer_decodes_png() {
        let mut png = Vec::new();
        let pixels = image::RgbaImage::from_pixel(2, 3, image::Rgba([255, 0, 0, 255]));
        image::DynamicImage::ImageRgba8(pixels)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .expect("encode png");

        match decode(ViewerKind::Image, &png) {
            ViewerModel::Image(ImageModel::Decoded(image)) => {
                assert_eq!((image.width, image.height), (2, 3));
                assert_eq!(image.rgba.len(), 2 * 3 * 4);
                assert_eq!(&image.rgba[..4], &[255, 0, 0, 255]);
            }
            other => panic!("expected decoded image, got {other:?}"),
        }
    }
}
