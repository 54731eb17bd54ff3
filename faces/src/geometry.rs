use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FaceError;

/// Minimum overlap-to-area ratio for two boxes to count as the same region
/// across detector runs. Re-detected regions rarely match pixel-for-pixel
/// (crop padding, rotation), so continuity is carried on "mostly the same
/// region" rather than exact equality.
pub const MIN_OVERLAP_RATIO: f32 = 0.70;

/// Axis-aligned face region in photo-relative coordinates (0..1 on both
/// axes). Serializes as an `"x,y,w,h"` string with 4 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RelBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RelBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Intersection area with another box. 0 when the boxes do not
    /// intersect on either axis.
    pub fn overlap_area(&self, other: &RelBox) -> f32 {
        let ox = (self.x + self.w).min(other.x + other.w) - self.x.max(other.x);
        if ox <= 0.0 {
            return 0.0;
        }
        let oy = (self.y + self.h).min(other.y + other.h) - self.y.max(other.y);
        if oy <= 0.0 {
            return 0.0;
        }
        ox * oy
    }

    /// Index of the candidate overlapping this box the most, provided the
    /// overlap covers at least [`MIN_OVERLAP_RATIO`] of this box's own area.
    ///
    /// Returns `None` for an unpositioned (zero-area) box or when no
    /// candidate clears the ratio.
    pub fn find_most_overlapping(&self, candidates: &[RelBox]) -> Option<usize> {
        let area = self.area();
        if area <= 0.0 {
            return None;
        }
        let mut best_idx: Option<usize> = None;
        let mut best_overlap = 0.0f32;
        for (i, c) in candidates.iter().enumerate() {
            let overlap = self.overlap_area(c);
            if overlap > best_overlap {
                best_overlap = overlap;
                best_idx = Some(i);
            }
        }
        match best_idx {
            Some(i) if best_overlap / area >= MIN_OVERLAP_RATIO => Some(i),
            _ => None,
        }
    }
}

impl fmt::Display for RelBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4},{:.4},{:.4}", self.x, self.y, self.w, self.h)
    }
}

impl FromStr for RelBox {
    type Err = FaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || FaceError::BadRelBox { value: s.to_string() };
        let mut parts = s.split(',');
        let mut next = || -> Result<f32, FaceError> {
            parts.next().ok_or_else(bad)?.trim().parse().map_err(|_| bad())
        };
        let b = RelBox::new(next()?, next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(b)
    }
}

impl Serialize for RelBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RelBox {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
