// Vector rasterizer - Converts an SVG graphic into a bitmap image
use crate::domain::graphic::VectorGraphic;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::ImageEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_MIME_TYPE: &str = "image/png";
pub const DEFAULT_QUALITY: f32 = 0.92;
const SVG_DATA_URI_PREFIX: &str = "data:image/svg+xml;base64,";

/// Largest raster side in pixels.
pub const MAX_RASTER_SIDE: u32 = 16_384;
/// Largest raster area in pixels.
pub const MAX_RASTER_AREA: u64 = 40_000_000;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("malformed data URI: {0}")]
    InvalidDataUri(String),
    #[error("failed to decode vector graphic: {0}")]
    DecodeFailed(#[source] usvg::Error),
    #[error("invalid raster dimensions {width}x{height}")]
    InvalidDimensions { width: f32, height: f32 },
    #[error("unable to allocate a {width}x{height} raster surface")]
    Surface { width: u32, height: u32 },
    #[error("failed to encode raster image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("rasterization task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Requested size along one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dimension {
    #[default]
    Auto,
    Fixed(u32),
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") || s.is_empty() {
            return Ok(Dimension::Auto);
        }
        s.parse::<u32>()
            .map(Dimension::Fixed)
            .map_err(|_| format!("invalid dimension '{}'", s))
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Pixels(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Pixels(px) => Ok(Dimension::Fixed(px)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Base64,
    Blob,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RasterOptions {
    #[serde(alias = "mimeType", alias = "mimetype")]
    pub mime_type: String,
    pub quality: f32,
    pub width: Dimension,
    pub height: Dimension,
    #[serde(alias = "outputFormat", alias = "output")]
    pub output_format: OutputFormat,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            quality: DEFAULT_QUALITY,
            width: Dimension::Auto,
            height: Dimension::Auto,
            output_format: OutputFormat::Base64,
        }
    }
}

/// Encodings the raster surface can be exported to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
    WebP,
}

impl RasterFormat {
    /// Unknown types fall back to PNG.
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type.trim().to_ascii_lowercase().as_str() {
            "image/png" => RasterFormat::Png,
            "image/jpeg" | "image/jpg" => RasterFormat::Jpeg,
            "image/webp" => RasterFormat::WebP,
            other => {
                tracing::warn!("Unsupported raster type {}, encoding as PNG", other);
                RasterFormat::Png
            }
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            RasterFormat::Png => "image/png",
            RasterFormat::Jpeg => "image/jpeg",
            RasterFormat::WebP => "image/webp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBlob {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterResult {
    Base64(String),
    Blob(RasterBlob),
}

impl RasterResult {
    pub fn as_data_uri(&self) -> Option<&str> {
        match self {
            RasterResult::Base64(uri) => Some(uri),
            RasterResult::Blob(_) => None,
        }
    }
}

/// Encode SVG markup as a base64 data URI over its UTF-8 bytes.
pub fn svg_data_uri(markup: &str) -> String {
    format!("{}{}", SVG_DATA_URI_PREFIX, STANDARD.encode(markup.as_bytes()))
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, RasterError> {
    let (header, payload) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(|| RasterError::InvalidDataUri("missing data: header".to_string()))?;

    if !header.ends_with(";base64") {
        return Err(RasterError::InvalidDataUri(format!("unsupported encoding '{}'", header)));
    }

    STANDARD
        .decode(payload)
        .map_err(|e| RasterError::InvalidDataUri(e.to_string()))
}

/// Final raster size for a source of `intrinsic` size.
///
/// A single fixed side keeps the source aspect ratio. Two fixed sides are
/// used as given. Sizes beyond `MAX_RASTER_SIDE` or `MAX_RASTER_AREA` are
/// rejected.
pub fn target_size(
    intrinsic: (f32, f32),
    width: Dimension,
    height: Dimension,
) -> Result<(u32, u32), RasterError> {
    let (iw, ih) = intrinsic;
    let (w, h) = match (width, height) {
        (Dimension::Auto, Dimension::Auto) => (iw, ih),
        (Dimension::Auto, Dimension::Fixed(h)) => (iw / ih * h as f32, h as f32),
        (Dimension::Fixed(w), Dimension::Auto) => (w as f32, ih / iw * w as f32),
        (Dimension::Fixed(w), Dimension::Fixed(h)) => (w as f32, h as f32),
    };

    let (w, h) = (w.round(), h.round());
    let max_side = MAX_RASTER_SIDE as f32;
    let in_range = w.is_finite()
        && h.is_finite()
        && (1.0..=max_side).contains(&w)
        && (1.0..=max_side).contains(&h);
    if !in_range || (w as u64) * (h as u64) > MAX_RASTER_AREA {
        return Err(RasterError::InvalidDimensions {
            width: w,
            height: h,
        });
    }
    Ok((w as u32, h as u32))
}

fn effective_quality(quality: f32) -> f32 {
    if (0.0..=1.0).contains(&quality) {
        quality
    } else {
        DEFAULT_QUALITY
    }
}

pub struct VectorRasterizer {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl Default for VectorRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorRasterizer {
    /// Rasterizer using the fonts installed on the host.
    pub fn new() -> Self {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();
        tracing::debug!("Loaded {} font faces for rasterization", fontdb.len());
        Self::with_fonts(Arc::new(fontdb))
    }

    pub fn with_fonts(fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self { fontdb }
    }

    /// Rasterize `graphic` according to `options`.
    ///
    /// Each call works on its own surface, so concurrent calls are independent.
    pub async fn rasterize(
        &self,
        graphic: &VectorGraphic,
        options: &RasterOptions,
    ) -> Result<RasterResult, RasterError> {
        let data_uri = svg_data_uri(&graphic.serialize());
        let fontdb = self.fontdb.clone();
        let options = options.clone();

        tokio::task::spawn_blocking(move || rasterize_data_uri(&data_uri, &options, fontdb)).await?
    }
}

fn load_image(data_uri: &str, fontdb: Arc<usvg::fontdb::Database>) -> Result<usvg::Tree, RasterError> {
    let data = decode_data_uri(data_uri)?;
    let mut opt = usvg::Options::default();
    opt.fontdb = fontdb;
    usvg::Tree::from_data(&data, &opt).map_err(RasterError::DecodeFailed)
}

fn rasterize_data_uri(
    data_uri: &str,
    options: &RasterOptions,
    fontdb: Arc<usvg::fontdb::Database>,
) -> Result<RasterResult, RasterError> {
    let tree = load_image(data_uri, fontdb)?;
    let intrinsic = tree.size();
    let (width, height) = target_size(
        (intrinsic.width(), intrinsic.height()),
        options.width,
        options.height,
    )?;

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(RasterError::Surface { width, height })?;
    let transform = tiny_skia::Transform::from_scale(
        width as f32 / intrinsic.width(),
        height as f32 / intrinsic.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let format = RasterFormat::from_mime(&options.mime_type);
    let bytes = encode(&pixmap, format, effective_quality(options.quality))?;
    tracing::debug!(
        "Rasterized {}x{} graphic to {} ({} bytes)",
        width,
        height,
        format.mime_type(),
        bytes.len()
    );

    Ok(match options.output_format {
        OutputFormat::Base64 => RasterResult::Base64(format!(
            "data:{};base64,{}",
            format.mime_type(),
            STANDARD.encode(&bytes)
        )),
        OutputFormat::Blob => RasterResult::Blob(RasterBlob {
            mime_type: format.mime_type(),
            bytes,
        }),
    })
}

fn encode(pixmap: &tiny_skia::Pixmap, format: RasterFormat, quality: f32) -> Result<Vec<u8>, RasterError> {
    let (width, height) = (pixmap.width(), pixmap.height());
    let mut out = Vec::new();

    match format {
        RasterFormat::Jpeg => {
            // Premultiplied channels are the surface composited over black
            let rgb: Vec<u8> = pixmap
                .pixels()
                .iter()
                .flat_map(|p| [p.red(), p.green(), p.blue()])
                .collect();
            let jpeg_quality = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
            JpegEncoder::new_with_quality(&mut out, jpeg_quality).write_image(
                &rgb,
                width,
                height,
                image::ExtendedColorType::Rgb8,
            )?;
        }
        RasterFormat::Png | RasterFormat::WebP => {
            let rgba: Vec<u8> = pixmap
                .pixels()
                .iter()
                .flat_map(|p| {
                    let c = p.demultiply();
                    [c.red(), c.green(), c.blue(), c.alpha()]
                })
                .collect();
            if format == RasterFormat::Png {
                PngEncoder::new(&mut out).write_image(&rgba, width, height, image::ExtendedColorType::Rgba8)?;
            } else {
                WebPEncoder::new_lossless(&mut out).write_image(
                    &rgba,
                    width,
                    height,
                    image::ExtendedColorType::Rgba8,
                )?;
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED_2X1: &str = r#"<svg width="200" height="100"><rect width="200" height="100" fill="red"/></svg>"#;

    fn rasterizer() -> VectorRasterizer {
        VectorRasterizer::with_fonts(Arc::new(usvg::fontdb::Database::new()))
    }

    fn decode_result(result: &RasterResult) -> image::DynamicImage {
        let bytes = match result {
            RasterResult::Base64(uri) => decode_data_uri(uri).unwrap(),
            RasterResult::Blob(blob) => blob.bytes.clone(),
        };
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_target_size_both_auto() {
        let size = target_size((200.0, 100.0), Dimension::Auto, Dimension::Auto).unwrap();
        assert_eq!(size, (200, 100));
    }

    #[test]
    fn test_target_size_keeps_aspect_ratio() {
        let size = target_size((200.0, 100.0), Dimension::Auto, Dimension::Fixed(150)).unwrap();
        assert_eq!(size, (300, 150));

        let size = target_size((200.0, 100.0), Dimension::Fixed(50), Dimension::Auto).unwrap();
        assert_eq!(size, (50, 25));
    }

    #[test]
    fn test_target_size_both_fixed_ignores_aspect() {
        let size = target_size((200.0, 100.0), Dimension::Fixed(64), Dimension::Fixed(64)).unwrap();
        assert_eq!(size, (64, 64));
    }

    #[test]
    fn test_target_size_rejects_zero() {
        assert!(matches!(
            target_size((200.0, 100.0), Dimension::Fixed(0), Dimension::Auto),
            Err(RasterError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_target_size_rejects_oversized() {
        assert!(matches!(
            target_size((800.0, 300.0), Dimension::Fixed(200_000), Dimension::Auto),
            Err(RasterError::InvalidDimensions { .. })
        ));
        // Each side fits, the area does not
        assert!(matches!(
            target_size((1.0, 1.0), Dimension::Fixed(10_000), Dimension::Fixed(10_000)),
            Err(RasterError::InvalidDimensions { .. })
        ));
        assert_eq!(
            target_size((1.0, 1.0), Dimension::Fixed(MAX_RASTER_SIDE), Dimension::Fixed(100)).unwrap(),
            (MAX_RASTER_SIDE, 100)
        );
    }

    #[tokio::test]
    async fn test_rasterize_oversized_request_fails_before_allocating() {
        let options = RasterOptions {
            width: Dimension::Fixed(200_000),
            ..Default::default()
        };
        let err = rasterizer()
            .rasterize(&VectorGraphic::new(RED_2X1), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, RasterError::InvalidDimensions { .. }));
    }

    #[test]
    fn test_data_uri_keeps_non_ascii() {
        let markup = "<svg><text>Température 25 °C – 温度</text></svg>";
        let uri = svg_data_uri(markup);
        assert!(uri.starts_with("data:image/svg+xml;base64,"));
        assert_eq!(decode_data_uri(&uri).unwrap(), markup.as_bytes());
    }

    #[test]
    fn test_dimension_parse() {
        assert_eq!("auto".parse::<Dimension>(), Ok(Dimension::Auto));
        assert_eq!("150".parse::<Dimension>(), Ok(Dimension::Fixed(150)));
        assert!("wide".parse::<Dimension>().is_err());

        let opts: RasterOptions = serde_json::from_str(r#"{"width": 300, "height": "auto"}"#).unwrap();
        assert_eq!(opts.width, Dimension::Fixed(300));
        assert_eq!(opts.height, Dimension::Auto);
        assert_eq!(opts.mime_type, "image/png");
        assert_eq!(opts.quality, 0.92);
    }

    #[test]
    fn test_format_from_mime() {
        assert_eq!(RasterFormat::from_mime("image/jpeg"), RasterFormat::Jpeg);
        assert_eq!(RasterFormat::from_mime("IMAGE/WEBP"), RasterFormat::WebP);
        assert_eq!(RasterFormat::from_mime("image/tiff"), RasterFormat::Png);
    }

    #[tokio::test]
    async fn test_rasterize_auto_width() {
        let options = RasterOptions {
            height: Dimension::Fixed(150),
            ..Default::default()
        };

        let result = rasterizer()
            .rasterize(&VectorGraphic::new(RED_2X1), &options)
            .await
            .unwrap();

        assert!(result.as_data_uri().unwrap().starts_with("data:image/png;base64,"));
        let img = decode_result(&result).to_rgba8();
        assert_eq!(img.dimensions(), (300, 150));
        assert_eq!(img.get_pixel(150, 75).0, [255, 0, 0, 255]);
    }

    #[tokio::test]
    async fn test_rasterize_blob_jpeg() {
        let options = RasterOptions {
            mime_type: "image/jpeg".to_string(),
            quality: 1.0,
            output_format: OutputFormat::Blob,
            ..Default::default()
        };

        let result = rasterizer()
            .rasterize(&VectorGraphic::new(RED_2X1), &options)
            .await
            .unwrap();

        match &result {
            RasterResult::Blob(blob) => assert_eq!(blob.mime_type, "image/jpeg"),
            other => panic!("expected blob, got {:?}", other),
        }
        assert_eq!(decode_result(&result).to_rgb8().dimensions(), (200, 100));
    }

    #[tokio::test]
    async fn test_rasterize_decode_failure() {
        let err = rasterizer()
            .rasterize(&VectorGraphic::new("<svg><g></svg"), &RasterOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, RasterError::DecodeFailed(_)));
    }

    #[tokio::test]
    async fn test_concurrent_rasterizations_are_independent() {
        let rasterizer = rasterizer();
        let small = RasterOptions {
            width: Dimension::Fixed(20),
            ..Default::default()
        };
        let large = RasterOptions {
            width: Dimension::Fixed(400),
            ..Default::default()
        };
        let graphic = VectorGraphic::new(RED_2X1);

        let (a, b) = futures::join!(
            rasterizer.rasterize(&graphic, &small),
            rasterizer.rasterize(&graphic, &large)
        );

        assert_eq!(decode_result(&a.unwrap()).to_rgba8().dimensions(), (20, 10));
        assert_eq!(decode_result(&b.unwrap()).to_rgba8().dimensions(), (400, 200));
    }
}
