//! Transformation options carried in the request path and URL fragment.
//!
//! Options are a comma separated list, e.g. `200x100,fit,r90,q80,png`.
//! Unknown entries are ignored. The serialized form is sorted so that two
//! equivalent option sets produce the same cache key.

use std::fmt;
use std::str::FromStr;

const OPT_FIT: &str = "fit";
const OPT_FLIP_VERTICAL: &str = "fv";
const OPT_FLIP_HORIZONTAL: &str = "fh";
const OPT_SCALE_UP: &str = "scaleUp";
const OPT_ROTATE_PREFIX: &str = "r";
const OPT_QUALITY_PREFIX: &str = "q";
const OPT_SIGNATURE_PREFIX: &str = "s";
const OPT_CROP_X: &str = "cx";
const OPT_CROP_Y: &str = "cy";
const OPT_CROP_WIDTH: &str = "cw";
const OPT_CROP_HEIGHT: &str = "ch";
const OPT_SIZE_DELIMITER: char = 'x';

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    Gif,
    Tiff,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Tiff => "image/tiff",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpeg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "gif" => Ok(Self::Gif),
            "tiff" => Ok(Self::Tiff),
            _ => Err(()),
        }
    }
}

/// Image transformation options.
///
/// Width and height values between 0 and 1 are fractions of the source
/// dimension; larger values are pixels. Crop values follow the same rule, and
/// negative crop offsets count from the right or bottom edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub width: f64,
    pub height: f64,

    /// Scale to fit within the requested box instead of cropping to fill it.
    pub fit: bool,

    /// Counter-clockwise rotation in degrees (90, 180 or 270).
    pub rotate: i32,

    pub flip_vertical: bool,
    pub flip_horizontal: bool,

    /// Encoder quality (JPEG only). Zero selects the default.
    pub quality: i32,

    /// Base64 HMAC signature of the remote URL.
    pub signature: String,

    /// Allow resizing beyond the source dimensions.
    pub scale_up: bool,

    /// Requested output format; the source format is kept when unset.
    pub format: Option<OutputFormat>,

    pub crop_x: f64,
    pub crop_y: f64,
    pub crop_width: f64,
    pub crop_height: f64,
}

impl Options {
    /// Parse an options string. Never fails; unparseable entries are skipped.
    pub fn parse(s: &str) -> Self {
        let mut options = Options::default();

        for opt in s.split(',') {
            match opt {
                "" => {}
                OPT_FIT => options.fit = true,
                OPT_FLIP_VERTICAL => options.flip_vertical = true,
                OPT_FLIP_HORIZONTAL => options.flip_horizontal = true,
                OPT_SCALE_UP => options.scale_up = true,
                _ => {
                    if let Ok(format) = opt.parse::<OutputFormat>() {
                        options.format = Some(format);
                    } else if let Some(value) = opt.strip_prefix(OPT_ROTATE_PREFIX) {
                        options.rotate = value.parse().unwrap_or_default();
                    } else if let Some(value) = opt.strip_prefix(OPT_QUALITY_PREFIX) {
                        options.quality = value.parse().unwrap_or_default();
                    } else if let Some(value) = opt.strip_prefix(OPT_SIGNATURE_PREFIX) {
                        options.signature = value.to_string();
                    } else if let Some(value) = opt.strip_prefix(OPT_CROP_X) {
                        options.crop_x = value.parse().unwrap_or_default();
                    } else if let Some(value) = opt.strip_prefix(OPT_CROP_Y) {
                        options.crop_y = value.parse().unwrap_or_default();
                    } else if let Some(value) = opt.strip_prefix(OPT_CROP_WIDTH) {
                        options.crop_width = value.parse().unwrap_or_default();
                    } else if let Some(value) = opt.strip_prefix(OPT_CROP_HEIGHT) {
                        options.crop_height = value.parse().unwrap_or_default();
                    } else if let Some((w, h)) = opt.split_once(OPT_SIZE_DELIMITER) {
                        if !w.is_empty() {
                            options.width = w.parse().unwrap_or_default();
                        }
                        if !h.is_empty() {
                            options.height = h.parse().unwrap_or_default();
                        }
                    } else if let Ok(size) = opt.parse::<f64>() {
                        options.width = size;
                        options.height = size;
                    }
                }
            }
        }

        options
    }

    /// Whether these options ask for any change to the image bytes.
    pub fn transform(&self) -> bool {
        self.width != 0.0
            || self.height != 0.0
            || self.rotate != 0
            || self.flip_horizontal
            || self.flip_vertical
            || self.quality != 0
            || self.format.is_some()
            || self.crop_x != 0.0
            || self.crop_y != 0.0
            || self.crop_width != 0.0
            || self.crop_height != 0.0
    }
}

impl fmt::Display for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut opts = Vec::new();

        if self.width != 0.0 || self.height != 0.0 {
            opts.push(format!("{}{}{}", self.width, OPT_SIZE_DELIMITER, self.height));
        }
        if self.fit {
            opts.push(OPT_FIT.to_string());
        }
        if self.rotate != 0 {
            opts.push(format!("{}{}", OPT_ROTATE_PREFIX, self.rotate));
        }
        if self.flip_vertical {
            opts.push(OPT_FLIP_VERTICAL.to_string());
        }
        if self.flip_horizontal {
            opts.push(OPT_FLIP_HORIZONTAL.to_string());
        }
        if self.quality != 0 {
            opts.push(format!("{}{}", OPT_QUALITY_PREFIX, self.quality));
        }
        if !self.signature.is_empty() {
            opts.push(format!("{}{}", OPT_SIGNATURE_PREFIX, self.signature));
        }
        if self.scale_up {
            opts.push(OPT_SCALE_UP.to_string());
        }
        if let Some(format) = self.format {
            opts.push(format.as_str().to_string());
        }
        for (prefix, value) in [
            (OPT_CROP_X, self.crop_x),
            (OPT_CROP_Y, self.crop_y),
            (OPT_CROP_WIDTH, self.crop_width),
            (OPT_CROP_HEIGHT, self.crop_height),
        ] {
            if value != 0.0 {
                opts.push(format!("{}{}", prefix, value));
            }
        }

        opts.sort();
        f.write_str(&opts.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert_eq!(Options::parse(""), Options::default());
        assert_eq!(Options::parse(",,"), Options::default());
    }

    #[test]
    fn test_parse_size_variants() {
        let o = Options::parse("200x100");
        assert_eq!((o.width, o.height), (200.0, 100.0));

        let o = Options::parse("x100");
        assert_eq!((o.width, o.height), (0.0, 100.0));

        let o = Options::parse("0.5x");
        assert_eq!((o.width, o.height), (0.5, 0.0));

        let o = Options::parse("150");
        assert_eq!((o.width, o.height), (150.0, 150.0));
    }

    #[test]
    fn test_parse_all_flags() {
        let o = Options::parse("1x2,fit,r90,fv,fh,q80,sabc-_,scaleUp,png,cx10,cy20,cw0.5,ch30,bogus");
        assert_eq!(
            o,
            Options {
                width: 1.0,
                height: 2.0,
                fit: true,
                rotate: 90,
                flip_vertical: true,
                flip_horizontal: true,
                quality: 80,
                signature: "abc-_".into(),
                scale_up: true,
                format: Some(OutputFormat::Png),
                crop_x: 10.0,
                crop_y: 20.0,
                crop_width: 0.5,
                crop_height: 30.0,
            }
        );
    }

    #[test]
    fn test_signature_containing_size_delimiter() {
        let o = Options::parse("sx1y2");
        assert_eq!(o.signature, "x1y2");
        assert_eq!(o.width, 0.0);
    }

    #[test]
    fn test_display_is_sorted() {
        let o = Options::parse("r90,100x200,fit,q75,jpeg");
        assert_eq!(o.to_string(), "100x200,fit,jpeg,q75,r90");
        assert_eq!(Options::parse(&o.to_string()), o);
    }

    #[test]
    fn test_default_displays_empty() {
        assert_eq!(Options::default().to_string(), "");
        let scale_only = Options {
            scale_up: true,
            ..Default::default()
        };
        assert_eq!(scale_only.to_string(), "scaleUp");
        assert!(!scale_only.transform());
    }

    #[test]
    fn test_transform_detection() {
        assert!(!Options::parse("s123").transform());
        assert!(Options::parse("100").transform());
        assert!(Options::parse("png").transform());
        assert!(Options::parse("fh").transform());
    }
}
