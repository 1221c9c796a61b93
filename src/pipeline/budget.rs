use crate::config::QualityTier;

/// Lower bound of a size-derived budget
pub const MIN_SMART_FACES: u32 = 2_000;
/// Upper bound of a size-derived budget
pub const MAX_SMART_FACES: u32 = 100_000;

/// Face count used when the budget is not derived from object size
pub fn fixed_budget(tier: QualityTier) -> u32 {
    match tier {
        QualityTier::Draft => 5_000,
        QualityTier::Mid => 15_000,
        QualityTier::High => 50_000,
    }
}

/// Faces per unit of bounding-box diagonal
pub fn density(tier: QualityTier) -> f64 {
    match tier {
        QualityTier::Draft => 1_000.0,
        QualityTier::Mid => 3_000.0,
        QualityTier::High => 8_000.0,
    }
}

/// Target face count for an object whose bounding-box diagonal is `extent`.
///
/// With `smart` off the tier alone decides. Otherwise the count scales with
/// size and is clamped to `[MIN_SMART_FACES, MAX_SMART_FACES]`; negative or
/// NaN extents land on the lower bound.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn estimate(extent: f64, tier: QualityTier, smart: bool) -> u32 {
    if !smart {
        return fixed_budget(tier);
    }
    // Float-to-int casts saturate, and NaN becomes 0
    let raw = (extent * density(tier)).floor() as u32;
    raw.clamp(MIN_SMART_FACES, MAX_SMART_FACES)
}
