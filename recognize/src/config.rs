/// Tunables for one matching run.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Minimum best-candidate score for an automatic match to be accepted.
    /// Default: 0.5.
    pub threshold: f32,

    /// Reliability factor indexed by the number of faces in the subject's
    /// photo; indexes beyond the last entry clamp to it. Must be
    /// monotonically non-increasing: the more faces a photo has, the less
    /// reliable automatic face-to-name binding is.
    pub face_count_factors: Vec<f32>,

    /// Admit reference faces that failed the detector quality flag.
    /// Default: false.
    pub include_non_ok: bool,

    /// Frontal-ratio window for named reference faces. Defaults: 0.5..2.0.
    pub ratio_lo: f32,
    pub ratio_hi: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            face_count_factors: vec![1.0, 1.0, 0.95, 0.9, 0.85, 0.8],
            include_non_ok: false,
            ratio_lo: 0.5,
            ratio_hi: 2.0,
        }
    }
}

impl MatchConfig {
    /// Replaces out-of-range values with defaults.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        if !(self.threshold > 0.0) {
            self.threshold = d.threshold;
        }
        if self.face_count_factors.is_empty() {
            self.face_count_factors = d.face_count_factors;
        }
        if !(self.ratio_lo > 0.0) || !(self.ratio_hi > self.ratio_lo) {
            self.ratio_lo = d.ratio_lo;
            self.ratio_hi = d.ratio_hi;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitized_fixes_bad_values() {
        let cfg = MatchConfig {
            threshold: 0.0,
            face_count_factors: vec![],
            include_non_ok: true,
            ratio_lo: 2.0,
            ratio_hi: 1.0,
        }
        .sanitized();
        assert_eq!(cfg.threshold, 0.5);
        assert!(!cfg.face_count_factors.is_empty());
        assert!(cfg.ratio_lo < cfg.ratio_hi);
        assert!(cfg.include_non_ok, "valid values pass through");
    }

    #[test]
    fn sanitized_keeps_good_values() {
        let cfg = MatchConfig { threshold: 0.62, ..Default::default() }.sanitized();
        assert_eq!(cfg.threshold, 0.62);
    }
}
