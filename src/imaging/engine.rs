//! Image transformation: decode → crop → resize → rotate/flip → encode.

use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, ImageFormat, ImageOutputFormat};
use thiserror::Error;

use super::options::{Options, OutputFormat};

/// Default JPEG encoder quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Errors produced while transforming an image.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode image as {format}: {source}")]
    Encode {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Something that can apply transformation options to encoded image bytes.
pub trait TransformEngine: Send + Sync {
    fn transform(&self, data: &[u8], options: &Options) -> Result<Vec<u8>, TransformError>;
}

/// Transform engine backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageTransformer;

impl TransformEngine for ImageTransformer {
    fn transform(&self, data: &[u8], options: &Options) -> Result<Vec<u8>, TransformError> {
        if !options.transform() {
            return Ok(data.to_vec());
        }

        let source_format = image::guess_format(data).map_err(TransformError::Decode)?;
        let img = image::load_from_memory_with_format(data, source_format)
            .map_err(TransformError::Decode)?;

        let format = match options.format {
            Some(format) => format,
            None => output_format_for(source_format)?,
        };

        let img = transform_image(img, options);
        encode(&img, format, options.quality)
    }
}

/// Content type for encoded image bytes, when the format is recognised.
pub fn sniff_content_type(data: &[u8]) -> Option<&'static str> {
    let content_type = match image::guess_format(data).ok()? {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Tiff => "image/tiff",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        _ => return None,
    };
    Some(content_type)
}

fn output_format_for(format: ImageFormat) -> Result<OutputFormat, TransformError> {
    match format {
        ImageFormat::Jpeg => Ok(OutputFormat::Jpeg),
        ImageFormat::Png => Ok(OutputFormat::Png),
        ImageFormat::Gif => Ok(OutputFormat::Gif),
        ImageFormat::Tiff => Ok(OutputFormat::Tiff),
        other => Err(TransformError::UnsupportedFormat(format!("{:?}", other))),
    }
}

fn transform_image(img: DynamicImage, options: &Options) -> DynamicImage {
    let mut img = crop_image(img, options);

    if let Some((w, h)) = resize_params(&img, options) {
        img = if options.fit {
            // an unset dimension does not constrain the fit
            let bound = |v: u32| if v == 0 { u32::MAX } else { v };
            img.resize(bound(w), bound(h), FilterType::Lanczos3)
        } else if w == 0 || h == 0 {
            let (w, h) = preserve_aspect(img.width(), img.height(), w, h);
            img.resize_exact(w, h, FilterType::Lanczos3)
        } else {
            img.resize_to_fill(w, h, FilterType::Lanczos3)
        };
    }

    // rotations are counter-clockwise
    img = match options.rotate {
        90 => img.rotate270(),
        180 => img.rotate180(),
        270 => img.rotate90(),
        _ => img,
    };

    if options.flip_vertical {
        img = img.flipv();
    }
    if options.flip_horizontal {
        img = img.fliph();
    }

    img
}

fn crop_image(img: DynamicImage, options: &Options) -> DynamicImage {
    if options.crop_x == 0.0
        && options.crop_y == 0.0
        && options.crop_width == 0.0
        && options.crop_height == 0.0
    {
        return img;
    }

    let (img_w, img_h) = (img.width(), img.height());

    let x = crop_offset(options.crop_x, img_w);
    let y = crop_offset(options.crop_y, img_h);
    let w = match relative(options.crop_width, img_w) {
        0 => img_w,
        w => w,
    };
    let h = match relative(options.crop_height, img_h) {
        0 => img_h,
        h => h,
    };

    let w = w.min(img_w.saturating_sub(x));
    let h = h.min(img_h.saturating_sub(y));
    if w == 0 || h == 0 {
        return img;
    }

    img.crop_imm(x, y, w, h)
}

fn crop_offset(value: f64, size: u32) -> u32 {
    if value < 0.0 {
        size.saturating_sub(relative(-value, size))
    } else {
        relative(value, size)
    }
}

/// Resolve a dimension that may be a fraction of `size`.
fn relative(value: f64, size: u32) -> u32 {
    if value <= 0.0 {
        0
    } else if value < 1.0 {
        (f64::from(size) * value) as u32
    } else {
        value as u32
    }
}

/// Target dimensions for a resize, or None when no resize is needed.
fn resize_params(img: &DynamicImage, options: &Options) -> Option<(u32, u32)> {
    let (img_w, img_h) = (img.width(), img.height());

    let mut w = relative(options.width, img_w);
    let mut h = relative(options.height, img_h);

    // never resize larger than the original image unless specifically allowed
    if !options.scale_up {
        w = w.min(img_w);
        h = h.min(img_h);
    }

    if (w == img_w || w == 0) && (h == img_h || h == 0) {
        return None;
    }

    Some((w, h))
}

fn preserve_aspect(img_w: u32, img_h: u32, w: u32, h: u32) -> (u32, u32) {
    let ratio = f64::from(img_w) / f64::from(img_h.max(1));
    if w == 0 {
        (((f64::from(h) * ratio).round() as u32).max(1), h)
    } else {
        (w, ((f64::from(w) / ratio).round() as u32).max(1))
    }
}

fn encode(img: &DynamicImage, format: OutputFormat, quality: i32) -> Result<Vec<u8>, TransformError> {
    let output = match format {
        OutputFormat::Jpeg => {
            let quality = if quality > 0 {
                quality.min(100) as u8
            } else {
                DEFAULT_JPEG_QUALITY
            };
            ImageOutputFormat::Jpeg(quality)
        }
        OutputFormat::Png => ImageOutputFormat::Png,
        OutputFormat::Gif => ImageOutputFormat::Gif,
        OutputFormat::Tiff => ImageOutputFormat::Tiff,
    };

    // the JPEG encoder has no alpha channel
    let rgb;
    let source = if format == OutputFormat::Jpeg && img.color().has_alpha() {
        rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        &rgb
    } else {
        img
    };

    let mut buf = Cursor::new(Vec::new());
    source
        .write_to(&mut buf, output)
        .map_err(|source| TransformError::Encode {
            format: format.as_str(),
            source,
        })?;
    Ok(buf.into_inner())
}
