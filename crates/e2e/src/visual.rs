//! Screenshot verification by hue/saturation histogram correlation
//!
//! A locally rendered reference and a device-captured screenshot never match
//! pixel for pixel (scaling, JPEG artifacts), so both are reduced to a 2-D
//! hue/saturation histogram and compared by correlation instead.

use std::path::Path;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};

/// Common resolution both images are resampled to
pub const COMPARE_WIDTH: u32 = 640;
pub const COMPARE_HEIGHT: u32 = 360;

/// 8-bit hue range is [0, 180), saturation [0, 256)
pub const HUE_BINS: usize = 180;
pub const SATURATION_BINS: usize = 256;

/// Minimum score (percent) for two images to count as the same content
pub const MATCH_THRESHOLD: f64 = 99.5;

const JPEG_SOS: [u8; 2] = [0xFF, 0xDA];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];
const PNG_IEND: [u8; 8] = [b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82];

/// Outcome of one comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    /// Histogram correlation in percent, rounded to 3 decimals
    pub score: f64,
    pub matches: bool,
}

/// Holds a reference ("source") and a captured ("target") image.
///
/// Either slot may be reloaded independently; a source is typically loaded
/// once and compared against several captured targets.
pub struct ImageComparator {
    source: Option<RgbImage>,
    target: Option<RgbImage>,
    threshold: f64,
}

impl Default for ImageComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageComparator {
    pub fn new() -> Self {
        Self {
            source: None,
            target: None,
            threshold: MATCH_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn load_source_file(&mut self, path: &Path) -> E2eResult<()> {
        debug!("Loading source image {}", path.display());
        let raw = std::fs::read(path)?;
        self.load_source_bytes(&raw)
    }

    pub fn load_source_bytes(&mut self, raw: &[u8]) -> E2eResult<()> {
        self.source = Some(decode(raw)?);
        Ok(())
    }

    /// Load a captured image after checking the transfer arrived intact
    pub fn load_target_bytes(&mut self, raw: &[u8]) -> E2eResult<()> {
        self.target = Some(verify_integrity(raw)?.to_rgb8());
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.source.is_some() && self.target.is_some()
    }

    /// Score the loaded pair against the threshold
    pub fn evaluate(&self) -> E2eResult<Comparison> {
        let (source, target) = match (&self.source, &self.target) {
            (Some(source), Some(target)) => (source, target),
            (None, _) => return Err(E2eError::Precondition("source image is not loaded".to_string())),
            (_, None) => return Err(E2eError::Precondition("target image is not loaded".to_string())),
        };

        let score = similarity(source, target);
        let matches = score >= self.threshold;
        if matches {
            info!("Images match: score {:.3} (threshold {:.1})", score, self.threshold);
        } else {
            warn!("Images differ: score {:.3} (threshold {:.1})", score, self.threshold);
        }

        Ok(Comparison { score, matches })
    }

    pub fn compare(&self) -> E2eResult<bool> {
        Ok(self.evaluate()?.matches)
    }
}

/// Decode any supported container into 8-bit RGB.
///
/// Every container decodes into the same channel order, so a single
/// RGB to HSV conversion serves both slots.
fn decode(raw: &[u8]) -> E2eResult<RgbImage> {
    Ok(image::load_from_memory(raw)?.to_rgb8())
}

/// Reject truncated transfers whose header still parses.
///
/// Returns the decoded image so callers don't decode twice.
pub fn verify_integrity(raw: &[u8]) -> E2eResult<DynamicImage> {
    let format = image::guess_format(raw)?;

    match format {
        ImageFormat::Jpeg => {
            // embedded thumbnails carry their own EOI, so look after the last scan
            let scan = raw.windows(2).rposition(|w| w == JPEG_SOS).unwrap_or(0);
            if !raw[scan..].windows(2).any(|w| w == JPEG_EOI) {
                return Err(E2eError::Decode("JPEG data is missing its end-of-image marker".to_string()));
            }
        }
        ImageFormat::Png => {
            if !raw.ends_with(&PNG_IEND) {
                return Err(E2eError::Decode("PNG data is missing its IEND chunk".to_string()));
            }
        }
        _ => {}
    }

    // full decode pass catches corrupt scan data
    Ok(image::load_from_memory_with_format(raw, format)?)
}

/// Histogram correlation of two images as a percentage in [0, 100]
pub fn similarity(source: &RgbImage, target: &RgbImage) -> f64 {
    let a = normalize(hs_histogram(source));
    let b = normalize(hs_histogram(target));
    let score = (correlation(&a, &b) * 100.0).clamp(0.0, 100.0);
    (score * 1000.0).round() / 1000.0
}

fn hs_histogram(img: &RgbImage) -> Vec<f64> {
    let resized = imageops::resize(img, COMPARE_WIDTH, COMPARE_HEIGHT, FilterType::Triangle);
    let mut hist = vec![0.0; HUE_BINS * SATURATION_BINS];
    for pixel in resized.pixels() {
        let (h, s) = hue_saturation(pixel.0);
        hist[h * SATURATION_BINS + s] += 1.0;
    }
    hist
}

/// 8-bit HSV hue (0..180) and saturation (0..256) of an RGB pixel
fn hue_saturation([r, g, b]: [u8; 3]) -> (usize, usize) {
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let v = r.max(g).max(b);
    let delta = v - r.min(g).min(b);

    let s = if v > 0.0 { (delta * 255.0 / v).round() } else { 0.0 };

    let mut h = if delta == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / delta
    } else if v == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    let h = (h / 2.0).round() as usize % HUE_BINS;
    (h, (s as usize).min(SATURATION_BINS - 1))
}

/// Min-max scale into [0, 1]; a flat histogram collapses to zeros
fn normalize(mut hist: Vec<f64>) -> Vec<f64> {
    let min = hist.iter().copied().fold(f64::INFINITY, f64::min);
    let max = hist.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    for v in hist.iter_mut() {
        *v = if range > f64::EPSILON { (*v - min) / range } else { 0.0 };
    }
    hist
}

/// Pearson correlation of two equally sized histograms
fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    let (mut s1, mut s2, mut s11, mut s22, mut s12) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&x, &y) in a.iter().zip(b) {
        s1 += x;
        s2 += y;
        s11 += x * x;
        s22 += y * y;
        s12 += x * y;
    }

    let num = s12 - s1 * s2 / n;
    let denom = (s11 - s1 * s1 / n) * (s22 - s2 * s2 / n);
    if denom.abs() > f64::EPSILON {
        num / denom.sqrt()
    } else {
        1.0
    }
}
