//! Theme generation from a user-supplied image
//!
//! Pipeline:
//! 1. Decode and shrink the image to fit the background bounds
//! 2. Re-encode it as a JPEG `data:` URL for the background
//! 3. Resample to a small grid and bucket pixel hues to find the dominant one
//! 4. Synthesize accent colors and the tonal ramp from that hue

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType, DynamicImage, RgbImage};

use crate::{
    error::AppResult,
    models::{Chroma, Hsl, Palette, PaletteSlot, Rgb, ThemeData},
};

const BUCKET_COUNT: usize = 12;

// Pixels outside these bounds carry no useful hue
const MIN_LIGHTNESS: f64 = 0.08;
const MAX_LIGHTNESS: f64 = 0.92;
const MIN_DELTA: f64 = 0.08;

const RAMP_SATURATION_CAP: f64 = 30.0;

/// Lightness (%) and saturation multiplier for each palette slot
const TONAL_RAMP: [(PaletteSlot, f64, f64); PaletteSlot::COUNT] = [
    (PaletteSlot::Midnight, 4.0, 1.0),
    (PaletteSlot::Deep, 6.0, 1.0),
    (PaletteSlot::Dark, 9.0, 0.9),
    (PaletteSlot::Surface, 14.0, 0.85),
    (PaletteSlot::Card, 16.0, 0.8),
    (PaletteSlot::Elevated, 19.0, 0.75),
    (PaletteSlot::Border, 24.0, 0.7),
    (PaletteSlot::BorderLight, 31.0, 0.65),
    (PaletteSlot::Muted, 38.0, 0.55),
    (PaletteSlot::Subtle, 49.0, 0.55),
    (PaletteSlot::Text, 63.0, 0.5),
    (PaletteSlot::TextLight, 79.0, 0.4),
    (PaletteSlot::Light, 91.0, 0.3),
];

/// Fixed parameters of the generation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorSettings {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality of the stored background, 1-100
    pub jpeg_quality: u8,
    /// Side length of the square grid used for hue analysis
    pub sample_size: u32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            max_width: 1600,
            max_height: 900,
            jpeg_quality: 75,
            sample_size: 100,
        }
    }
}

/// Hue (degrees) and saturation (percent) of an image's dominant color family
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DominantHue {
    pub hue: f64,
    pub saturation: f64,
}

impl DominantHue {
    /// Used when no pixel survives the lightness and chroma filters
    pub const FALLBACK: DominantHue = DominantHue {
        hue: 150.0,
        saturation: 40.0,
    };
}

#[derive(Debug, Default, Clone, Copy)]
struct HueBucket {
    count: u32,
    hue_sum: f64,
    saturation_sum: f64,
}

/// Generates themes from image bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct ThemeGenerator {
    settings: GeneratorSettings,
}

impl ThemeGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self { settings }
    }

    /// Builds a complete theme from an encoded image.
    ///
    /// The hue is read from the normalized image before JPEG encoding, so the
    /// accent can drift slightly from what the stored background would yield.
    ///
    /// Decoding and re-encoding are CPU-bound; async callers should run this
    /// on the blocking pool.
    pub fn generate(&self, bytes: &[u8]) -> AppResult<ThemeData> {
        let decoded = image::load_from_memory(bytes)?;
        let (source_width, source_height) = (decoded.width(), decoded.height());

        let background = flatten_onto_black(&self.normalize(decoded));
        let data_url = encode_data_url(&background, self.settings.jpeg_quality)?;
        let dominant = self.extract_dominant_hue(&background);

        tracing::info!(
            source_width,
            source_height,
            width = background.width(),
            height = background.height(),
            hue = dominant.hue,
            saturation = dominant.saturation,
            "Generated theme from image"
        );

        Ok(synthesize_theme(dominant, Some(data_url)))
    }

    /// Shrinks the image to fit within the configured bounds, preserving
    /// aspect ratio. Images already within bounds are returned unchanged.
    pub fn normalize(&self, image: DynamicImage) -> DynamicImage {
        let (width, height) = (image.width(), image.height());
        let (target_width, target_height) = scaled_dimensions(
            width,
            height,
            self.settings.max_width,
            self.settings.max_height,
        );

        if (target_width, target_height) == (width, height) {
            return image;
        }
        image.resize_exact(target_width, target_height, FilterType::Triangle)
    }

    /// Resamples the image to the analysis grid and finds its dominant hue
    pub fn extract_dominant_hue(&self, image: &RgbImage) -> DominantHue {
        let size = self.settings.sample_size;
        let grid = image::imageops::resize(image, size, size, FilterType::Triangle);
        dominant_hue(grid.pixels().map(|pixel| Rgb::from(pixel.0)))
    }
}

/// Dimensions after fitting `width`×`height` into `max_width`×`max_height`
///
/// Both axes use the same scale, the smaller of the two per-axis ratios.
pub fn scaled_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let ratio = (f64::from(max_width) / f64::from(width))
        .min(f64::from(max_height) / f64::from(height));
    let scale = |side: u32| ((f64::from(side) * ratio).round() as u32).max(1);

    (scale(width), scale(height))
}

/// Finds the dominant hue family among `pixels`.
///
/// Near-black, near-white and near-gray pixels are skipped. The rest are
/// counted into twelve 30° hue buckets; the fullest bucket wins, with the
/// lowest index taking ties. The result is the mean hue and saturation of
/// the winning bucket.
pub fn dominant_hue<I>(pixels: I) -> DominantHue
where
    I: IntoIterator<Item = Rgb>,
{
    let buckets = pixels.into_iter().filter_map(hue_sample).fold(
        [HueBucket::default(); BUCKET_COUNT],
        |mut buckets, (hue_turns, saturation)| {
            let index = ((hue_turns * BUCKET_COUNT as f64).floor() as usize).min(BUCKET_COUNT - 1);
            let bucket = &mut buckets[index];
            bucket.count += 1;
            bucket.hue_sum += hue_turns * 360.0;
            bucket.saturation_sum += saturation * 100.0;
            buckets
        },
    );

    let best = (1..BUCKET_COUNT).fold(0, |best, index| {
        if buckets[index].count > buckets[best].count {
            index
        } else {
            best
        }
    });

    let bucket = buckets[best];
    if bucket.count == 0 {
        tracing::debug!("No chromatic pixels found, using fallback hue");
        return DominantHue::FALLBACK;
    }

    tracing::debug!(bucket = best, pixels = bucket.count, "Selected dominant hue bucket");

    let count = f64::from(bucket.count);
    DominantHue {
        hue: bucket.hue_sum / count,
        saturation: bucket.saturation_sum / count,
    }
}

/// Hue (turns) and saturation (0-1) of a pixel that passes the filters
fn hue_sample(rgb: Rgb) -> Option<(f64, f64)> {
    let chroma = Chroma::of(rgb);
    if chroma.lightness < MIN_LIGHTNESS
        || chroma.lightness > MAX_LIGHTNESS
        || chroma.delta < MIN_DELTA
    {
        return None;
    }
    Some((chroma.hue_turns(), chroma.saturation()))
}

/// Builds the full theme for a dominant hue
pub fn synthesize_theme(dominant: DominantHue, background: Option<String>) -> ThemeData {
    let DominantHue { hue, saturation } = dominant;

    let accent_saturation = (saturation + 20.0).min(80.0);
    let accent_light_saturation = (accent_saturation - 10.0).max(30.0);

    ThemeData {
        bg_image_data_url: background,
        accent_rgb: Hsl::new(hue, accent_saturation, 50.0).to_rgb(),
        accent_light_rgb: Hsl::new(hue, accent_light_saturation, 72.0).to_rgb(),
        palette: palette_from_hue(hue, saturation),
    }
}

/// Tonal ramp for a hue, with saturation capped so surfaces stay muted
pub fn palette_from_hue(hue: f64, saturation: f64) -> Palette {
    let base = saturation.min(RAMP_SATURATION_CAP);
    Palette::from_fn(|slot| {
        let (_, lightness, multiplier) = TONAL_RAMP[slot as usize];
        Hsl::new(hue, base * multiplier, lightness).to_rgb()
    })
}

/// Drops alpha by compositing onto black, matching how JPEG export treats
/// transparent regions
fn flatten_onto_black(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let blend = |channel: u8| ((u16::from(channel) * u16::from(a) + 127) / 255) as u8;
        image::Rgb([blend(r), blend(g), blend(b)])
    })
}

fn encode_data_url(image: &RgbImage, quality: u8) -> AppResult<String> {
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality).encode_image(image)?;
    Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use base64::Engine as _;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(image: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    fn decode_data_url(data_url: &str) -> DynamicImage {
        let encoded = data_url.strip_prefix("data:image/jpeg;base64,").unwrap();
        let jpeg = STANDARD.decode(encoded).unwrap();
        image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).unwrap()
    }

    #[test]
    fn test_tonal_ramp_matches_slot_order() {
        for (index, (slot, _, _)) in TONAL_RAMP.iter().enumerate() {
            assert_eq!(*slot, PaletteSlot::ALL[index]);
        }
    }

    #[test]
    fn test_tonal_ramp_lightness_increases() {
        for pair in TONAL_RAMP.windows(2) {
            assert!(pair[0].1 < pair[1].1);
        }
        assert_eq!(TONAL_RAMP[0], (PaletteSlot::Midnight, 4.0, 1.0));
        assert_eq!(TONAL_RAMP[12], (PaletteSlot::Light, 91.0, 0.3));
    }

    #[test]
    fn test_scaled_dimensions_halves_double_bounds() {
        assert_eq!(scaled_dimensions(3200, 1800, 1600, 900), (1600, 900));
    }

    #[test]
    fn test_scaled_dimensions_uses_tighter_axis() {
        // width ratio 0.5, height ratio 0.9: width wins
        assert_eq!(scaled_dimensions(3200, 1000, 1600, 900), (1600, 500));
        // height ratio 0.25 wins
        assert_eq!(scaled_dimensions(800, 3600, 1600, 900), (200, 900));
    }

    #[test]
    fn test_scaled_dimensions_within_bounds_unchanged() {
        assert_eq!(scaled_dimensions(1600, 900, 1600, 900), (1600, 900));
        assert_eq!(scaled_dimensions(10, 10, 1600, 900), (10, 10));
    }

    #[test]
    fn test_scaled_dimensions_never_zero() {
        assert_eq!(scaled_dimensions(100_000, 1, 1600, 900), (1600, 1));
    }

    #[test]
    fn test_normalize_preserves_aspect_ratio() {
        let generator = ThemeGenerator::new(GeneratorSettings {
            max_width: 160,
            max_height: 90,
            ..GeneratorSettings::default()
        });
        let normalized = generator.normalize(solid(320, 180, [10, 20, 30]));
        assert_eq!((normalized.width(), normalized.height()), (160, 90));
    }

    #[test]
    fn test_uniform_gray_falls_back() {
        let pixels = std::iter::repeat(Rgb::new(128, 128, 128)).take(10_000);
        assert_eq!(dominant_hue(pixels), DominantHue::FALLBACK);
    }

    #[test]
    fn test_extreme_lightness_is_ignored() {
        let pixels = vec![
            Rgb::new(10, 0, 0),      // near-black
            Rgb::new(255, 240, 240), // near-white
            Rgb::new(120, 130, 125), // near-gray
        ];
        assert_eq!(dominant_hue(pixels), DominantHue::FALLBACK);
    }

    #[test]
    fn test_pure_red_dominant_hue() {
        let pixels = std::iter::repeat(Rgb::new(255, 0, 0)).take(100);
        let dominant = dominant_hue(pixels);
        assert_eq!(dominant.hue, 0.0);
        assert_eq!(dominant.saturation, 100.0);
    }

    #[test]
    fn test_tie_goes_to_lowest_bucket() {
        let mut pixels = vec![Rgb::new(0, 0, 255); 50];
        pixels.extend(vec![Rgb::new(255, 0, 0); 50]);
        let dominant = dominant_hue(pixels);
        assert_eq!(dominant.hue, 0.0);
    }

    #[test]
    fn test_majority_bucket_wins() {
        let mut pixels = vec![Rgb::new(255, 0, 0); 10];
        pixels.extend(vec![Rgb::new(0, 0, 255); 11]);
        let dominant = dominant_hue(pixels);
        assert!((dominant.hue - 240.0).abs() < 1e-9);
    }

    #[test]
    fn test_bucket_mean_hue_and_saturation() {
        // 0° at full saturation and ~20° at lower saturation share bucket 0
        let orange_red = Rgb::new(200, 100, 70);
        let expected = Hsl::from(orange_red);
        let dominant = dominant_hue(vec![Rgb::new(255, 0, 0), orange_red]);
        assert!((dominant.hue - expected.h / 2.0).abs() < 1e-9);
        assert!((dominant.saturation - (100.0 + expected.s) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_synthesize_pure_red() {
        let theme = synthesize_theme(
            DominantHue {
                hue: 0.0,
                saturation: 100.0,
            },
            None,
        );
        assert_eq!(theme.accent_rgb, Hsl::new(0.0, 80.0, 50.0).to_rgb());
        assert_eq!(theme.accent_light_rgb, Hsl::new(0.0, 70.0, 72.0).to_rgb());
        assert_eq!(
            theme.palette.get(PaletteSlot::Midnight),
            Hsl::new(0.0, 30.0, 4.0).to_rgb()
        );
        assert_eq!(
            theme.palette.get(PaletteSlot::Light),
            Hsl::new(0.0, 9.0, 91.0).to_rgb()
        );
    }

    #[test]
    fn test_accent_light_saturation_floor() {
        let theme = synthesize_theme(
            DominantHue {
                hue: 200.0,
                saturation: 5.0,
            },
            None,
        );
        // accent 25%, accent-light floored at 30%
        assert_eq!(theme.accent_rgb, Hsl::new(200.0, 25.0, 50.0).to_rgb());
        assert_eq!(theme.accent_light_rgb, Hsl::new(200.0, 30.0, 72.0).to_rgb());
    }

    #[test]
    fn test_palette_always_has_every_slot() {
        for (hue, saturation) in [(0.0, 0.0), (150.0, 40.0), (359.9, 100.0), (725.0, 250.0)] {
            let palette = palette_from_hue(hue, saturation);
            let slots: Vec<PaletteSlot> = palette.iter().map(|(slot, _)| slot).collect();
            assert_eq!(slots, PaletteSlot::ALL.to_vec());
        }
    }

    #[test]
    fn test_zero_saturation_palette_is_gray() {
        for (_, rgb) in palette_from_hue(90.0, 0.0).iter() {
            assert_eq!(rgb.r, rgb.g);
            assert_eq!(rgb.g, rgb.b);
        }
    }

    #[test]
    fn test_generate_pure_red_image() {
        let bytes = png_bytes(solid(100, 100, [255, 0, 0]));
        let theme = ThemeGenerator::default().generate(&bytes).unwrap();

        assert_eq!(theme.accent_rgb, Hsl::new(0.0, 80.0, 50.0).to_rgb());
        assert_eq!(theme.accent_light_rgb, Hsl::new(0.0, 70.0, 72.0).to_rgb());
        assert_eq!(theme.palette, palette_from_hue(0.0, 100.0));

        let background = decode_data_url(theme.bg_image_data_url.as_deref().unwrap());
        assert_eq!((background.width(), background.height()), (100, 100));
    }

    #[test]
    fn test_generate_gray_image_uses_fallback() {
        let bytes = png_bytes(solid(64, 48, [128, 128, 128]));
        let theme = ThemeGenerator::default().generate(&bytes).unwrap();
        assert_eq!(
            theme,
            synthesize_theme(DominantHue::FALLBACK, theme.bg_image_data_url.clone())
        );
    }

    #[test]
    fn test_generate_downsamples_background() {
        let generator = ThemeGenerator::new(GeneratorSettings {
            max_width: 160,
            max_height: 90,
            ..GeneratorSettings::default()
        });
        let bytes = png_bytes(solid(320, 180, [0, 0, 255]));
        let theme = generator.generate(&bytes).unwrap();

        let background = decode_data_url(theme.bg_image_data_url.as_deref().unwrap());
        assert_eq!((background.width(), background.height()), (160, 90));
    }

    #[test]
    fn test_transparent_pixels_are_ignored() {
        let mut rgba = RgbaImage::from_pixel(100, 100, Rgba([255, 0, 0, 0]));
        for x in 0..100 {
            for y in 0..10 {
                rgba.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        let bytes = png_bytes(DynamicImage::ImageRgba8(rgba));
        let theme = ThemeGenerator::default().generate(&bytes).unwrap();

        // only the opaque blue band informs the hue
        assert_eq!(theme.accent_rgb, Hsl::new(240.0, 80.0, 50.0).to_rgb());
    }

    #[test]
    fn test_hue_comes_from_image_before_jpeg_encoding() {
        let checkerboard = RgbImage::from_fn(100, 100, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        let bytes = png_bytes(DynamicImage::ImageRgb8(checkerboard.clone()));
        let generator = ThemeGenerator::default();
        let theme = generator.generate(&bytes).unwrap();

        // equal red and blue counts: the tie goes to red at exactly 0°
        let dominant = generator.extract_dominant_hue(&checkerboard);
        assert_eq!(dominant.hue, 0.0);
        assert_eq!(
            theme,
            synthesize_theme(dominant, theme.bg_image_data_url.clone())
        );
    }

    #[test]
    fn test_generate_rejects_undecodable_bytes() {
        let result = ThemeGenerator::default().generate(b"definitely not an image");
        assert!(matches!(result, Err(AppError::Image(_))));
    }
}
