//! # Terrain Bands
//!
//! Classification of the continentalness, erosion and peaks & valleys fields into
//! named bands, and the piecewise-linear curves keyed by those bands.
//!
//! The band edges and their tie-break inequalities are part of the world's visual
//! signature. Changing any `<=` into `<` moves terrain.

use crate::engine_state::noise::{lerp, remap};

/// Lowest base height, reached at continentalness -1.
pub const BASE_HEIGHT_MIN: f64 = -24.0;
/// Highest base height, reached at continentalness 1.
pub const BASE_HEIGHT_MAX: f64 = 48.0;

/// Erosion classification, from most eroded (flat) to least eroded (steep).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErosionBand {
    /// `e <= -0.75`
    VeryLow,
    /// `-0.75 < e <= -0.45`
    Low,
    /// `-0.45 < e < -0.15`
    Mid,
    /// `-0.15 <= e < -0.05`
    MidSpike,
    /// `-0.05 <= e < 0.35`
    MidLow,
    /// `0.35 <= e < 0.45`
    FlatSpike,
    /// `e >= 0.45`
    Flat,
}

impl ErosionBand {
    /// Band of an erosion value.
    pub fn classify(erosion: f64) -> Self {
        if erosion <= -0.75 {
            ErosionBand::VeryLow
        } else if erosion <= -0.45 {
            ErosionBand::Low
        } else if erosion < -0.15 {
            ErosionBand::Mid
        } else if erosion < -0.05 {
            ErosionBand::MidSpike
        } else if erosion < 0.35 {
            ErosionBand::MidLow
        } else if erosion < 0.45 {
            ErosionBand::FlatSpike
        } else {
            ErosionBand::Flat
        }
    }

    /// Interpolation endpoints `(from_lo, from_hi, factor_lo, factor_hi)` of the band.
    fn factor_curve(self) -> (f64, f64, f64, f64) {
        match self {
            ErosionBand::VeryLow => (-1.0, -0.75, 1.0, 0.9),
            ErosionBand::Low => (-0.75, -0.45, 0.9, 0.6),
            ErosionBand::Mid => (-0.45, -0.15, 0.6, 0.4),
            ErosionBand::MidSpike => (-0.15, -0.05, 0.4, 0.55),
            ErosionBand::MidLow => (-0.05, 0.35, 0.55, 0.2),
            ErosionBand::FlatSpike => (0.35, 0.45, 0.2, 0.35),
            ErosionBand::Flat => (0.45, 1.0, 0.35, 0.05),
        }
    }

    /// Relative tree density of the band.
    pub fn tree_multiplier(self) -> f64 {
        match self {
            ErosionBand::Flat => 0.0,
            ErosionBand::FlatSpike => 0.3,
            ErosionBand::MidLow => 0.6,
            ErosionBand::MidSpike => 0.8,
            ErosionBand::Mid => 1.0,
            ErosionBand::Low => 0.8,
            ErosionBand::VeryLow => 0.5,
        }
    }
}

/// Multiplier applied to the peaks & valleys height for an erosion value.
pub fn erosion_factor(erosion: f64) -> f64 {
    let (from_lo, from_hi, to_lo, to_hi) = ErosionBand::classify(erosion).factor_curve();
    remap(erosion, from_lo, from_hi, to_lo, to_hi)
}

/// Peaks & valleys classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PvBand {
    /// `pv <= -0.6`
    Valley,
    /// `-0.6 < pv <= -0.2`
    Low,
    /// `-0.2 < pv < 0.2`
    Plateau,
    /// `0.2 <= pv < 0.5`
    Mid,
    /// `0.5 <= pv < 0.8`
    High,
    /// `pv >= 0.8`
    Peak,
}

impl PvBand {
    /// Band of a peaks & valleys value.
    pub fn classify(pv: f64) -> Self {
        if pv <= -0.6 {
            PvBand::Valley
        } else if pv <= -0.2 {
            PvBand::Low
        } else if pv < 0.2 {
            PvBand::Plateau
        } else if pv < 0.5 {
            PvBand::Mid
        } else if pv < 0.8 {
            PvBand::High
        } else {
            PvBand::Peak
        }
    }

    fn height_curve(self) -> (f64, f64, f64, f64) {
        match self {
            PvBand::Valley => (-1.0, -0.6, -40.0, -24.0),
            PvBand::Low => (-0.6, -0.2, -24.0, -4.0),
            PvBand::Plateau => (-0.2, 0.2, -4.0, 4.0),
            PvBand::Mid => (0.2, 0.5, 4.0, 16.0),
            PvBand::High => (0.5, 0.8, 16.0, 32.0),
            PvBand::Peak => (0.8, 1.0, 32.0, 48.0),
        }
    }

    /// Whether the band counts as high ground for cave squashing.
    pub fn is_high(self) -> bool {
        matches!(self, PvBand::High | PvBand::Peak)
    }

    /// Relative tree density of the band.
    pub fn tree_multiplier(self) -> f64 {
        match self {
            PvBand::Valley => 0.4,
            PvBand::Low => 0.7,
            PvBand::Plateau => 1.0,
            PvBand::Mid => 0.7,
            PvBand::High => 0.35,
            PvBand::Peak => 0.0,
        }
    }
}

/// Height offset contributed by peaks & valleys, scaled by the erosion factor.
pub fn pv_height(pv: f64, erosion_factor: f64) -> f64 {
    let (from_lo, from_hi, to_lo, to_hi) = PvBand::classify(pv).height_curve();
    remap(pv, from_lo, from_hi, to_lo, to_hi) * erosion_factor
}

/// Continentalness classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContinentalBand {
    /// `c < -0.4`
    Ocean,
    /// `-0.4 <= c < -0.15`
    Coast,
    /// `-0.15 <= c < 0.45`
    Inland,
    /// `c >= 0.45`
    FarInland,
}

impl ContinentalBand {
    /// Band of a continentalness value.
    pub fn classify(continentalness: f64) -> Self {
        if continentalness < -0.4 {
            ContinentalBand::Ocean
        } else if continentalness < -0.15 {
            ContinentalBand::Coast
        } else if continentalness < 0.45 {
            ContinentalBand::Inland
        } else {
            ContinentalBand::FarInland
        }
    }
}

/// Relative tree density for a continentalness value: none at sea, tapering in
/// along the coast, full inland and thinning again far inland.
pub fn continental_tree_multiplier(continentalness: f64) -> f64 {
    match ContinentalBand::classify(continentalness) {
        ContinentalBand::Ocean => 0.0,
        ContinentalBand::Coast => remap(continentalness, -0.4, -0.15, 0.0, 1.0),
        ContinentalBand::Inland => 1.0,
        ContinentalBand::FarInland => remap(continentalness, 0.45, 1.0, 1.0, 0.5),
    }
}

/// Base terrain height for a continentalness value.
pub fn base_height(continentalness: f64) -> f64 {
    lerp(BASE_HEIGHT_MIN, BASE_HEIGHT_MAX, (continentalness + 1.0) / 2.0)
}

/// Density multiplier for the cave noise. Smaller values squash the noise and
/// bias the voxel toward solid; only steep, high ground keeps the full amplitude.
pub fn squash_factor(erosion: ErosionBand, pv: PvBand) -> f64 {
    match (erosion, pv.is_high()) {
        (ErosionBand::VeryLow | ErosionBand::Low, true) => 1.0,
        (ErosionBand::Mid | ErosionBand::MidSpike, true) => 0.8,
        _ => 0.6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erosion_band_edges_follow_tie_breaks() {
        assert_eq!(ErosionBand::classify(-0.75), ErosionBand::VeryLow);
        assert_eq!(ErosionBand::classify(-0.45), ErosionBand::Low);
        assert_eq!(ErosionBand::classify(-0.15), ErosionBand::MidSpike);
        assert_eq!(ErosionBand::classify(-0.05), ErosionBand::MidLow);
        assert_eq!(ErosionBand::classify(0.35), ErosionBand::FlatSpike);
        assert_eq!(ErosionBand::classify(0.45), ErosionBand::Flat);
    }

    #[test]
    fn pv_band_edges_follow_tie_breaks() {
        assert_eq!(PvBand::classify(-0.6), PvBand::Valley);
        assert_eq!(PvBand::classify(-0.2), PvBand::Low);
        assert_eq!(PvBand::classify(0.0), PvBand::Plateau);
        assert_eq!(PvBand::classify(0.2), PvBand::Mid);
        assert_eq!(PvBand::classify(0.5), PvBand::High);
        assert_eq!(PvBand::classify(0.8), PvBand::Peak);
    }

    #[test]
    fn erosion_factor_hits_band_endpoints() {
        assert_eq!(erosion_factor(-1.0), 1.0);
        assert_eq!(erosion_factor(-0.75), 0.9);
        assert_eq!(erosion_factor(1.0), 0.05);
        // spike band rises again
        assert!(erosion_factor(-0.06) > erosion_factor(-0.14));
    }

    #[test]
    fn pv_height_is_scaled_by_erosion() {
        assert_eq!(pv_height(1.0, 1.0), 48.0);
        assert_eq!(pv_height(1.0, 0.5), 24.0);
        assert_eq!(pv_height(-1.0, 1.0), -40.0);
        assert_eq!(pv_height(0.0, 1.0), 0.0);
    }

    #[test]
    fn base_height_spans_bounds() {
        assert_eq!(base_height(-1.0), BASE_HEIGHT_MIN);
        assert_eq!(base_height(1.0), BASE_HEIGHT_MAX);
        assert_eq!(base_height(0.0), 12.0);
    }

    #[test]
    fn no_trees_on_flat_erosion_peaks_or_ocean() {
        assert_eq!(ErosionBand::Flat.tree_multiplier(), 0.0);
        assert_eq!(PvBand::Peak.tree_multiplier(), 0.0);
        assert_eq!(continental_tree_multiplier(-0.9), 0.0);
        assert_eq!(continental_tree_multiplier(0.0), 1.0);
    }

    #[test]
    fn squash_only_relaxes_on_steep_high_ground() {
        assert_eq!(squash_factor(ErosionBand::VeryLow, PvBand::Peak), 1.0);
        assert_eq!(squash_factor(ErosionBand::Mid, PvBand::High), 0.8);
        assert_eq!(squash_factor(ErosionBand::VeryLow, PvBand::Valley), 0.6);
        assert_eq!(squash_factor(ErosionBand::Flat, PvBand::Peak), 0.6);
    }
}
