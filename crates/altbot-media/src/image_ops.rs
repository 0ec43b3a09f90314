//! Decode, downscale and re-encode images before they are sent to a model.

use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, GenericImageView, ImageFormat, ImageReader};
use tracing::debug;

use crate::error::{MediaError, Result};

/// Decoders tried, in order, when sniffing the magic bytes fails.
const FALLBACK_FORMATS: [ImageFormat; 4] = [
    ImageFormat::WebP,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::Gif,
];

/// Canonical formats handed to the backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }
}

/// Result of [`prepare_image`].
#[derive(Debug)]
pub struct PreparedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// Decode image bytes, returning the image and the format it was stored in.
pub fn decode(data: &[u8]) -> Result<(DynamicImage, ImageFormat)> {
    if let Ok(reader) = ImageReader::new(Cursor::new(data)).with_guessed_format() {
        if let Some(format) = reader.format() {
            if let Ok(img) = reader.decode() {
                return Ok((img, format));
            }
        }
    }

    let mut last_err = None;
    for format in FALLBACK_FORMATS {
        match image::load_from_memory_with_format(data, format) {
            Ok(img) => return Ok((img, format)),
            Err(e) => last_err = Some(e),
        }
    }

    Err(MediaError::UnsupportedFormat(
        last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no decoder accepted the data".to_string()),
    ))
}

/// Resize to `target_width`, deriving the height from the aspect ratio.
///
/// A zero target leaves the image untouched.
pub fn downscale(img: DynamicImage, target_width: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if target_width == 0 || width == 0 || width == target_width {
        return img;
    }

    let scaled = (height as f64 * target_width as f64 / width as f64).round();
    let target_height = scaled.max(1.0) as u32;

    img.resize_exact(target_width, target_height, FilterType::Lanczos3)
}

/// JPEG stays JPEG; every other supported source format becomes PNG.
pub fn reencode(img: &DynamicImage, source: ImageFormat) -> Result<(Vec<u8>, OutputFormat)> {
    let mut out = Cursor::new(Vec::new());

    let format = match source {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel.
            DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut out, ImageFormat::Jpeg)?;
            OutputFormat::Jpeg
        }
        ImageFormat::Png
        | ImageFormat::Gif
        | ImageFormat::Bmp
        | ImageFormat::Tiff
        | ImageFormat::WebP => {
            match img {
                DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                    DynamicImage::ImageRgba8(img.to_rgba8())
                        .write_to(&mut out, ImageFormat::Png)?;
                }
                _ => img.write_to(&mut out, ImageFormat::Png)?,
            }
            OutputFormat::Png
        }
        other => return Err(MediaError::UnsupportedFormat(format!("{other:?}"))),
    };

    Ok((out.into_inner(), format))
}

/// Full image path: decode, downscale to `target_width`, re-encode.
pub fn prepare_image(data: &[u8], target_width: u32) -> Result<PreparedImage> {
    let (img, source) = decode(data)?;
    let (orig_width, orig_height) = img.dimensions();

    let resized = downscale(img, target_width);
    let (width, height) = resized.dimensions();
    let (data, format) = reencode(&resized, source)?;

    debug!(
        ?source,
        orig_width,
        orig_height,
        width,
        height,
        bytes = data.len(),
        "image prepared"
    );

    Ok(PreparedImage {
        data,
        format,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn rgb(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 90])))
    }

    fn rgba(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255])))
    }

    fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_every_supported_format() {
        let cases = [
            (encode(&rgb(8, 4), ImageFormat::Jpeg), ImageFormat::Jpeg),
            (encode(&rgba(8, 4), ImageFormat::Png), ImageFormat::Png),
            (encode(&rgba(8, 4), ImageFormat::Gif), ImageFormat::Gif),
            (encode(&rgb(8, 4), ImageFormat::Bmp), ImageFormat::Bmp),
            (encode(&rgb(8, 4), ImageFormat::Tiff), ImageFormat::Tiff),
            (encode(&rgba(8, 4), ImageFormat::WebP), ImageFormat::WebP),
        ];
        for (bytes, expected) in cases {
            let (img, format) = decode(&bytes).unwrap();
            assert_eq!(format, expected);
            assert_eq!(img.dimensions(), (8, 4));
        }
    }

    #[test]
    fn garbage_is_unsupported() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedFormat(_)));
    }

    #[test]
    fn downscale_preserves_aspect_ratio() {
        let out = downscale(rgb(400, 300), 100);
        assert_eq!(out.dimensions(), (100, 75));
    }

    #[test]
    fn downscale_never_produces_zero_height() {
        let out = downscale(rgb(1000, 1), 10);
        assert_eq!(out.dimensions(), (10, 1));
    }

    #[test]
    fn zero_target_width_is_a_no_op() {
        let out = downscale(rgb(30, 20), 0);
        assert_eq!(out.dimensions(), (30, 20));
    }

    #[test]
    fn jpeg_stays_jpeg_everything_else_becomes_png() {
        let img = rgb(4, 4);
        let (bytes, format) = reencode(&img, ImageFormat::Jpeg).unwrap();
        assert_eq!(format, OutputFormat::Jpeg);
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);

        for source in [
            ImageFormat::Png,
            ImageFormat::Gif,
            ImageFormat::Bmp,
            ImageFormat::Tiff,
            ImageFormat::WebP,
        ] {
            let (bytes, format) = reencode(&img, source).unwrap();
            assert_eq!(format, OutputFormat::Png);
            assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
        }
    }

    #[test]
    fn unrecognized_source_format_fails() {
        let err = reencode(&rgb(2, 2), ImageFormat::Ico).unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedFormat(_)));
    }

    #[test]
    fn prepare_image_runs_the_whole_chain() {
        let bmp = encode(&rgb(64, 32), ImageFormat::Bmp);
        let prepared = prepare_image(&bmp, 16).unwrap();
        assert_eq!(prepared.format, OutputFormat::Png);
        assert_eq!((prepared.width, prepared.height), (16, 8));
        assert_eq!(prepared.format.mime_type(), "image/png");
    }
}
