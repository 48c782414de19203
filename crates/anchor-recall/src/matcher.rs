//! Template correlation between a fresh screen crop and stored anchors.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::constants::MATCH_THRESHOLD;
use crate::types::AnchorRecord;

/// Outcome of matching one record against a query image.
///
/// `x`/`y` are in query-local pixels. The score is meaningful even when the
/// match is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub accepted: bool,
    pub x: u32,
    pub y: u32,
    pub score: f64,
}

impl MatchResult {
    pub fn new(x: u32, y: u32, score: f64) -> Self {
        Self {
            accepted: score >= MATCH_THRESHOLD,
            x,
            y,
            score,
        }
    }

    /// Nothing correlated positively.
    pub fn none() -> Self {
        Self::new(0, 0, 0.0)
    }
}

/// Locates a record's anchors inside a query image.
pub trait AnchorMatcher: Send + Sync {
    fn match_anchor(&self, query: &RgbImage, record: &AnchorRecord) -> MatchResult;
}

/// Zero-mean normalized cross-correlation over all three colour channels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NccMatcher;

impl AnchorMatcher for NccMatcher {
    fn match_anchor(&self, query: &RgbImage, record: &AnchorRecord) -> MatchResult {
        let mut best = MatchResult::none();
        for anchor in &record.anchor_images {
            match normalized_cross_correlation(query, anchor) {
                Some((x, y, score)) if score > best.score => best = MatchResult::new(x, y, score),
                Some(_) => {}
                None => tracing::debug!(
                    "Anchor {}x{} does not fit query {}x{}",
                    anchor.width(),
                    anchor.height(),
                    query.width(),
                    query.height()
                ),
            }
        }
        best
    }
}

/// Slide `template` over `image` and return the first position with the
/// highest correlation coefficient, in `[-1, 1]`.
///
/// Returns `None` when the template is empty or larger than the image.
/// Positions where either side has no variance score 0.
pub fn normalized_cross_correlation(
    image: &RgbImage,
    template: &RgbImage,
) -> Option<(u32, u32, f64)> {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > iw || th > ih {
        return None;
    }

    let n = (tw as f64) * (th as f64);
    let mut means = [0.0f64; 3];
    for p in template.pixels() {
        for (c, mean) in means.iter_mut().enumerate() {
            *mean += p[c] as f64;
        }
    }
    for mean in &mut means {
        *mean /= n;
    }

    let centred: Vec<[f64; 3]> = template
        .pixels()
        .map(|p| {
            [
                p[0] as f64 - means[0],
                p[1] as f64 - means[1],
                p[2] as f64 - means[2],
            ]
        })
        .collect();
    let template_energy: f64 = centred.iter().flatten().map(|v| v * v).sum();

    let mut best: Option<(u32, u32, f64)> = None;
    for y in 0..=(ih - th) {
        for x in 0..=(iw - tw) {
            let mut cross = 0.0f64;
            let mut sums = [0.0f64; 3];
            let mut sum_sq = 0.0f64;

            for ty in 0..th {
                for tx in 0..tw {
                    let p = image.get_pixel(x + tx, y + ty);
                    let t = &centred[(ty * tw + tx) as usize];
                    for c in 0..3 {
                        let v = p[c] as f64;
                        cross += t[c] * v;
                        sums[c] += v;
                        sum_sq += v * v;
                    }
                }
            }

            // The template is zero-mean, so the patch mean drops out of `cross`.
            let patch_energy = (sum_sq - sums.iter().map(|s| s * s / n).sum::<f64>()).max(0.0);
            let denom = (template_energy * patch_energy).sqrt();
            let score = if denom <= f64::EPSILON {
                0.0
            } else {
                (cross / denom).clamp(-1.0, 1.0)
            };

            if best.map_or(true, |(_, _, top)| score > top) {
                best = Some((x, y, score));
            }
        }
    }
    best
}
