use photark_faces::FaceRecord;

/// Crop height (pixels) above which resolution no longer penalizes the
/// match score.
const FULL_CONFIDENCE_HEIGHT: f32 = 250.0;

/// Pairwise similarity between a subject face and a labeled reference face.
///
/// The score is the embedding inner product scaled by three calibration
/// factors:
///
/// ```text
/// score = dot(subject.e, target.e)
///       * face_count_factor(subject.face_count)
///       * height_score(min(subject.height, target.height))
///       * ratio_score(subject.face_ratio)
/// ```
///
/// Embeddings are L2-normalized upstream, so the inner product behaves as
/// cosine similarity. No further normalization or distance conversion is
/// applied here.
#[derive(Debug, Clone)]
pub struct FaceScorer {
    factors: Vec<f32>,
}

impl FaceScorer {
    /// Creates a scorer with the given face-count factor table. An empty
    /// table degrades to a single neutral factor.
    pub fn new(face_count_factors: &[f32]) -> Self {
        let factors = if face_count_factors.is_empty() {
            vec![1.0]
        } else {
            face_count_factors.to_vec()
        };
        Self { factors }
    }

    /// Calibrated similarity of `subject` against `target`. Returns 0 when
    /// either embedding is absent or empty.
    pub fn score(&self, subject: &FaceRecord, target: &FaceRecord) -> f32 {
        let (Some(a), Some(b)) = (&subject.embedding, &target.embedding) else {
            return 0.0;
        };
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        dot(a, b)
            * self.face_count_factor(subject.face_count)
            * height_score(subject.height.min(target.height))
            * ratio_score(subject.face_ratio)
    }

    /// Human-readable factor breakdown for a score. Builds a fresh string
    /// per call; a scorer can therefore be shared read-only.
    pub fn explain(&self, subject: &FaceRecord, target: &FaceRecord) -> String {
        let d = match (&subject.embedding, &target.embedding) {
            (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => dot(a, b),
            _ => 0.0,
        };
        let n = subject.face_count;
        let h = subject.height.min(target.height);
        let r = subject.face_ratio;
        format!(
            "dot={d:.3} faces={n}({:.2}) h={h}({:.3}) ratio={r:.2}({:.3}) score={:.3} vs {}",
            self.face_count_factor(n),
            height_score(h),
            ratio_score(r),
            self.score(subject, target),
            target.id,
        )
    }

    fn face_count_factor(&self, face_count: u32) -> f32 {
        let i = (face_count as usize).min(self.factors.len() - 1);
        self.factors[i]
    }
}

/// Confidence penalty for low-resolution crops: 1.0 from 250 px up, else
/// `log10(h) / log10(250)`. The height is clamped to 1, so the function is
/// total and `height_score(1) == 0`.
pub fn height_score(height: u32) -> f32 {
    let h = height.max(1) as f32;
    if h >= FULL_CONFIDENCE_HEIGHT {
        return 1.0;
    }
    h.log10() / FULL_CONFIDENCE_HEIGHT.log10()
}

/// Penalty for faces deviating from frontal pose. Maximum 1.0 at ratio 1,
/// symmetric around 1, floored at 0.4. The pre-root base is clamped at 0
/// so ratios of 2 and above sit on the floor.
pub fn ratio_score(ratio: f32) -> f32 {
    let base = if ratio >= 1.0 { 2.0 - ratio } else { ratio };
    base.max(0.0).powf(0.25).max(0.4)
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_with(embedding: Vec<f32>, face_count: u32, height: u32, ratio: f32) -> FaceRecord {
        let mut f = FaceRecord::new("p", 0, face_count);
        f.embedding = Some(embedding);
        f.height = height;
        f.face_ratio = ratio;
        f
    }

    #[test]
    fn ratio_score_properties() {
        assert_eq!(ratio_score(1.0), 1.0);
        // Symmetric around 1.
        assert!((ratio_score(0.8) - ratio_score(1.2)).abs() < 1e-6);
        assert!((ratio_score(0.5) - ratio_score(1.5)).abs() < 1e-6);
        // Floored at 0.4.
        assert_eq!(ratio_score(0.0), 0.4);
        assert_eq!(ratio_score(2.0), 0.4);
        assert_eq!(ratio_score(3.5), 0.4);
    }

    #[test]
    fn height_score_monotone() {
        assert_eq!(height_score(250), 1.0);
        assert_eq!(height_score(1000), 1.0);
        assert_eq!(height_score(1), 0.0);
        assert_eq!(height_score(0), 0.0, "clamped below 1");
        let mut prev = 0.0;
        for h in [1u32, 10, 50, 100, 200, 249, 250, 300] {
            let s = height_score(h);
            assert!(s >= prev, "height_score({h}) = {s} < {prev}");
            prev = s;
        }
    }

    #[test]
    fn score_is_product_of_factors() {
        // Identical normalized embeddings, frontal ratio: score reduces to
        // face_count_factor * height_score.
        let emb = vec![0.6, 0.8];
        let subject = face_with(emb.clone(), 2, 180, 1.0);
        let target = face_with(emb, 1, 300, 1.0);

        let scorer = FaceScorer::new(&[1.0, 1.0, 0.9]);
        let got = scorer.score(&subject, &target);
        let want = 0.9 * height_score(180);
        assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
    }

    #[test]
    fn score_zero_without_embedding() {
        let subject = face_with(vec![1.0, 0.0], 1, 300, 1.0);
        let mut target = face_with(vec![1.0, 0.0], 1, 300, 1.0);
        target.embedding = None;
        let scorer = FaceScorer::new(&[1.0]);
        assert_eq!(scorer.score(&subject, &target), 0.0);

        target.embedding = Some(Vec::new()); // consumed sentinel
        assert_eq!(scorer.score(&subject, &target), 0.0);
    }

    #[test]
    fn face_count_factor_clamps() {
        let scorer = FaceScorer::new(&[1.0, 0.9, 0.8]);
        assert_eq!(scorer.face_count_factor(0), 1.0);
        assert_eq!(scorer.face_count_factor(2), 0.8);
        assert_eq!(scorer.face_count_factor(9), 0.8);
    }

    #[test]
    fn explain_mentions_factors() {
        let subject = face_with(vec![1.0, 0.0], 2, 180, 1.2);
        let target = face_with(vec![1.0, 0.0], 1, 300, 1.0);
        let scorer = FaceScorer::new(&[1.0, 1.0, 0.9]);
        let s = scorer.explain(&subject, &target);
        assert!(s.contains("dot=1.000"), "{s}");
        assert!(s.contains("faces=2"), "{s}");
        assert!(s.contains("h=180"), "{s}");
        assert!(s.ends_with("vs p~0"), "{s}");
    }
}
