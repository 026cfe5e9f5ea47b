//! Brightness-threshold recoloring.
//!
//! Every pixel of the resized icon is classified by its RGB channels:
//! near-white pixels (all three channels strictly above [`ICON_THRESHOLD`])
//! are the glyph and take the palette's icon color; everything else takes
//! the edge color. Alpha is carried over untouched so the silhouette and
//! transparency of the original artwork survive.
//!
//! Output is always `target_size × target_size` RGBA. Non-square artwork is
//! stretched, not letterboxed.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Channels must be strictly greater than this for a pixel to count as icon.
pub const ICON_THRESHOLD: u8 = 200;

pub const DEFAULT_TARGET_SIZE: u32 = 1024;

/// Largest accepted canvas edge. 4096² RGBA is 64 MiB per icon.
pub const MAX_TARGET_SIZE: u32 = 4096;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported or corrupt image: {0}")]
    Image(#[from] image::ImageError),

    #[error("target size must be between 1 and {MAX_TARGET_SIZE}, got {0}")]
    InvalidSize(u32),
}

/// 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0]);
    pub const GRAY: Color = Color([51, 51, 51]);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color([r, g, b])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "{},{},{}", r, g, b)
    }
}

#[derive(Debug, Error)]
#[error("invalid color `{0}`: expected `r,g,b` or `#rrggbb`")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    /// Accepts `51,51,51` or `#333333`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || ParseColorError(s.to_string());

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.is_ascii() {
                return Err(err());
            }
            let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
            return Ok(Color([channel(0)?, channel(2)?, channel(4)?]));
        }

        let channels = s
            .split(',')
            .map(|part| part.trim().parse::<u8>().map_err(|_| err()))
            .collect::<Result<Vec<_>, _>>()?;
        match channels.as_slice() {
            [r, g, b] => Ok(Color([*r, *g, *b])),
            _ => Err(err()),
        }
    }
}

/// Colors applied to the two pixel classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub icon: Color,
    pub edge: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            icon: Color::GRAY,
            edge: Color::BLACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelClass {
    Icon,
    Edge,
}

pub fn classify(pixel: &Rgba<u8>) -> PixelClass {
    let [r, g, b, _] = pixel.0;
    if r > ICON_THRESHOLD && g > ICON_THRESHOLD && b > ICON_THRESHOLD {
        PixelClass::Icon
    } else {
        PixelClass::Edge
    }
}

/// Decode, resize, and remap `bytes` into a themed icon.
pub fn recolor(bytes: &[u8], target_size: u32, palette: &Palette) -> Result<RgbaImage, DecodeError> {
    if target_size == 0 || target_size > MAX_TARGET_SIZE {
        return Err(DecodeError::InvalidSize(target_size));
    }
    let decoded = image::load_from_memory(bytes)?;
    let resized = resize_rgba(&decoded, target_size);
    Ok(remap(&resized, palette))
}

/// Convert to RGBA (opaque when the source has no alpha) and resize to a
/// square canvas with Lanczos resampling.
pub fn resize_rgba(image: &DynamicImage, target_size: u32) -> RgbaImage {
    let rgba = image.to_rgba8();
    image::imageops::resize(&rgba, target_size, target_size, FilterType::Lanczos3)
}

/// Per-pixel remap; no neighbourhood smoothing.
pub fn remap(source: &RgbaImage, palette: &Palette) -> RgbaImage {
    let mut out = source.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b] = match classify(pixel) {
            PixelClass::Icon => palette.icon.0,
            PixelClass::Edge => palette.edge.0,
        };
        pixel.0 = [r, g, b, pixel.0[3]];
    }
    out
}

/// Encode as PNG with maximum compression.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Cursor::new(Vec::new());
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use proptest::prelude::*;

    const ICON: Color = Color::new(10, 20, 30);
    const EDGE: Color = Color::new(200, 100, 0);

    fn palette() -> Palette {
        Palette {
            icon: ICON,
            edge: EDGE,
        }
    }

    fn png(image: &RgbaImage) -> Vec<u8> {
        encode_png(image).unwrap()
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(classify(&Rgba([201, 201, 201, 255])), PixelClass::Icon);
        assert_eq!(classify(&Rgba([200, 255, 255, 255])), PixelClass::Edge);
        assert_eq!(classify(&Rgba([255, 200, 255, 255])), PixelClass::Edge);
        assert_eq!(classify(&Rgba([255, 255, 200, 255])), PixelClass::Edge);
        assert_eq!(classify(&Rgba([255, 255, 255, 0])), PixelClass::Icon);
    }

    #[test]
    fn remap_keeps_alpha() {
        let mut source = RgbaImage::new(2, 1);
        source.put_pixel(0, 0, Rgba([250, 250, 250, 17]));
        source.put_pixel(1, 0, Rgba([12, 250, 250, 203]));

        let out = remap(&source, &palette());

        assert_eq!(out.get_pixel(0, 0).0, [10, 20, 30, 17]);
        assert_eq!(out.get_pixel(1, 0).0, [200, 100, 0, 203]);
    }

    #[test]
    fn output_is_square_target_for_any_aspect() {
        let wide = RgbaImage::from_pixel(40, 10, Rgba([255, 255, 255, 255]));
        let tall = RgbaImage::from_pixel(3, 90, Rgba([0, 0, 0, 128]));

        for source in [wide, tall] {
            let out = recolor(&png(&source), 32, &palette()).unwrap();
            assert_eq!(out.dimensions(), (32, 32));
        }
    }

    #[test]
    fn source_without_alpha_becomes_opaque() {
        let gray = GrayImage::from_pixel(8, 8, Luma([255]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();

        let out = recolor(bytes.get_ref(), 4, &palette()).unwrap();

        assert!(out.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn corrupt_bytes_are_decode_errors() {
        let err = recolor(b"definitely not an image", 16, &palette()).unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
    }

    #[test]
    fn out_of_range_size_is_rejected() {
        let source = png(&RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])));
        for size in [0, MAX_TARGET_SIZE + 1, 100_000] {
            let err = recolor(&source, size, &palette()).unwrap_err();
            assert!(matches!(err, DecodeError::InvalidSize(s) if s == size));
        }
    }

    #[test]
    fn recolor_matches_classification_of_resized_source() {
        // Half white glyph, half dark edge, with a transparent corner.
        let source = RgbaImage::from_fn(24, 12, |x, y| match (x, y) {
            (0..=3, 0..=3) => Rgba([255, 255, 255, 0]),
            (0..=11, _) => Rgba([250, 240, 230, 255]),
            _ => Rgba([30, 60, 90, 180]),
        });
        let bytes = png(&source);

        let out = recolor(&bytes, 16, &palette()).unwrap();
        let resized = resize_rgba(&image::load_from_memory(&bytes).unwrap(), 16);

        for (got, src) in out.pixels().zip(resized.pixels()) {
            let expected = match classify(src) {
                PixelClass::Icon => ICON.0,
                PixelClass::Edge => EDGE.0,
            };
            assert_eq!(&got.0[..3], &expected[..]);
            assert_eq!(got.0[3], src.0[3]);
        }
    }

    #[test]
    fn encoded_png_round_trips_dimensions() {
        let image = RgbaImage::from_pixel(5, 7, Rgba([1, 2, 3, 4]));
        let decoded = image::load_from_memory(&png(&image)).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 7));
    }

    #[test]
    fn parses_colors() {
        assert_eq!("51,51,51".parse::<Color>().unwrap(), Color::GRAY);
        assert_eq!(" 0, 0 ,0 ".parse::<Color>().unwrap(), Color::BLACK);
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color::new(255, 128, 0));
        assert!("256,0,0".parse::<Color>().is_err());
        assert!("1,2".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert_eq!(Color::GRAY.to_string(), "51,51,51");
    }

    proptest! {
        #[test]
        fn remap_follows_threshold_for_every_pixel(
            pixels in proptest::collection::vec(any::<[u8; 4]>(), 1..64)
        ) {
            let width = pixels.len() as u32;
            let raw: Vec<u8> = pixels.iter().flatten().copied().collect();
            let source = RgbaImage::from_raw(width, 1, raw).unwrap();

            let out = remap(&source, &palette());

            for (got, [r, g, b, a]) in out.pixels().zip(pixels.iter().copied()) {
                let expected = if r > 200 && g > 200 && b > 200 { ICON.0 } else { EDGE.0 };
                prop_assert_eq!(&got.0[..3], &expected[..]);
                prop_assert_eq!(got.0[3], a);
            }
        }
    }
}
