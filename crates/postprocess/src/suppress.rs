use crate::codec::Candidate;
use crate::config::PostProcessConfig;
use crate::types::{CoordSpace, Detection, DetectionSet};
use common::span_debug;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Confidence thresholding plus greedy non-max suppression.
#[derive(Debug, Clone)]
pub struct Suppressor {
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub multi_label: bool,
    /// Allowed class indices; empty allows every class.
    pub classes: Vec<usize>,
    pub agnostic: bool,
}

impl Suppressor {
    pub fn new(conf_threshold: f32, iou_threshold: f32) -> Self {
        Self {
            conf_threshold,
            iou_threshold,
            multi_label: false,
            classes: Vec::new(),
            agnostic: false,
        }
    }

    pub fn from_config(config: &PostProcessConfig) -> Self {
        Self {
            conf_threshold: config.conf_threshold,
            iou_threshold: config.iou_threshold,
            multi_label: config.multi_label,
            classes: config.classes.clone(),
            agnostic: config.agnostic,
        }
    }

    /// Score, filter and suppress decoded candidates.
    ///
    /// The result stays in network-input space and is ordered by confidence
    /// descending, ties kept in candidate order.
    #[tracing::instrument(skip(self, candidates), fields(candidates = candidates.len()))]
    pub fn suppress(&self, candidates: &[Candidate<'_>]) -> DetectionSet {
        let scored = self.score(candidates);
        let scored_count = scored.len();

        let filtered: Vec<Detection> = scored
            .into_iter()
            .filter(|det| self.classes.is_empty() || self.classes.contains(&det.class_id))
            .filter(is_finite)
            .collect();

        tracing::trace!(
            scored = scored_count,
            filtered = filtered.len(),
            "Filtered class hypotheses"
        );

        let kept = nms(filtered, self.iou_threshold, self.agnostic);
        DetectionSet::new(CoordSpace::Network, kept)
    }

    /// Turn candidates into class hypotheses above the confidence threshold.
    fn score(&self, candidates: &[Candidate<'_>]) -> Vec<Detection> {
        let mut scored = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let [x1, y1, x2, y2] = candidate.bbox;
            let hypothesis = |class_id: usize, confidence: f32| Detection {
                x1,
                y1,
                x2,
                y2,
                confidence,
                class_id,
            };

            if self.multi_label && candidate.class_scores.len() > 1 {
                for (class_id, &score) in candidate.class_scores.iter().enumerate() {
                    let confidence = candidate.objectness * score;
                    if confidence >= self.conf_threshold {
                        scored.push(hypothesis(class_id, confidence));
                    }
                }
            } else if let Some((class_id, score)) = argmax(candidate.class_scores.iter().copied())
            {
                let confidence = candidate.objectness * score;
                if confidence >= self.conf_threshold {
                    scored.push(hypothesis(class_id, confidence));
                }
            }
        }

        scored
    }
}

/// First index holding the largest value; NaN never wins.
fn argmax(values: impl Iterator<Item = f32>) -> Option<(usize, f32)> {
    values.enumerate().fold(None, |best, (i, v)| match best {
        Some((_, b)) if !(v > b) => best,
        None if v.is_nan() => None,
        _ => Some((i, v)),
    })
}

fn is_finite(det: &Detection) -> bool {
    det.bbox().iter().all(|v| v.is_finite()) && det.confidence.is_finite()
}

/// Greedy non-max suppression.
///
/// Detections are partitioned by class (or kept in one partition when
/// `agnostic`), sorted by confidence descending with ties in input order,
/// and any box whose IoU with an already kept box of the same partition
/// exceeds `iou_threshold` is dropped. Degenerate boxes are never kept.
/// Survivors from all partitions are returned by confidence descending,
/// ties in input order.
pub fn nms(detections: Vec<Detection>, iou_threshold: f32, agnostic: bool) -> Vec<Detection> {
    let _s = span_debug!("nms");

    let total = detections.len();
    let mut partitions: BTreeMap<usize, Vec<(usize, Detection)>> = BTreeMap::new();
    let mut degenerate = 0usize;

    for (seq, det) in detections.into_iter().enumerate() {
        if det.is_degenerate() {
            degenerate += 1;
            continue;
        }
        let key = if agnostic { 0 } else { det.class_id };
        partitions.entry(key).or_default().push((seq, det));
    }

    let mut kept: Vec<(usize, Detection)> = Vec::new();
    for (_, mut partition) in partitions {
        partition.sort_by(|a, b| by_confidence_desc(&a.1, &b.1));

        let mut suppressed = vec![false; partition.len()];
        for i in 0..partition.len() {
            if suppressed[i] {
                continue;
            }
            let best = partition[i].1;
            kept.push(partition[i]);

            for j in (i + 1)..partition.len() {
                if !suppressed[j] && best.iou(&partition[j].1) > iou_threshold {
                    suppressed[j] = true;
                }
            }
        }
    }

    kept.sort_by(|a, b| by_confidence_desc(&a.1, &b.1).then(a.0.cmp(&b.0)));

    tracing::debug!(
        input = total,
        degenerate,
        kept = kept.len(),
        "Non-max suppression complete"
    );

    kept.into_iter().map(|(_, det)| det).collect()
}

#[inline]
fn by_confidence_desc(a: &Detection, b: &Detection) -> Ordering {
    b.confidence.total_cmp(&a.confidence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BoxCodec, RawPrediction};

    fn det(bbox: [f32; 4], confidence: f32, class_id: usize) -> Detection {
        Detection {
            x1: bbox[0],
            y1: bbox[1],
            x2: bbox[2],
            y2: bbox[3],
            confidence,
            class_id,
        }
    }

    /// Rows of `(x1, y1, x2, y2, objectness, class scores)` as a raw prediction
    fn prediction<const N: usize>(rows: &[([f32; 5], [f32; N])]) -> RawPrediction {
        let mut data = Vec::new();
        for (head, classes) in rows {
            let [x1, y1, x2, y2, obj] = *head;
            data.extend_from_slice(&[(x1 + x2) / 2.0, (y1 + y2) / 2.0, x2 - x1, y2 - y1, obj]);
            data.extend_from_slice(classes);
        }
        RawPrediction::from_shape_vec(rows.len(), N, data).unwrap()
    }

    /// Tiny deterministic generator for randomized box sets
    struct Lcg(u64);

    impl Lcg {
        fn next_f32(&mut self) -> f32 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((self.0 >> 40) as f32) / ((1u64 << 24) as f32)
        }
    }

    fn random_detections(seed: u64, count: usize, num_classes: usize) -> Vec<Detection> {
        let mut rng = Lcg(seed);
        (0..count)
            .map(|_| {
                let x1 = rng.next_f32() * 400.0;
                let y1 = rng.next_f32() * 400.0;
                let w = 5.0 + rng.next_f32() * 80.0;
                let h = 5.0 + rng.next_f32() * 80.0;
                let class_id = (rng.next_f32() * num_classes as f32) as usize % num_classes;
                det([x1, y1, x1 + w, y1 + h], rng.next_f32(), class_id)
            })
            .collect()
    }

    #[test]
    fn test_argmax_prefers_first_maximum() {
        assert_eq!(argmax([0.1, 0.7, 0.7, 0.2].into_iter()), Some((1, 0.7)));
        assert_eq!(argmax([f32::NAN, 0.3].into_iter()), Some((1, 0.3)));
        assert_eq!(argmax(std::iter::empty::<f32>()), None);
    }

    /// Two same-class boxes with IoU 0.7: only the 0.9 box survives at 0.5
    #[test]
    fn test_overlapping_same_class_suppressed() {
        // Both 100x100, shifted by 100 * 0.3 / 1.7 on x for IoU = 0.7
        let shift = 100.0 * 0.3 / 1.7;
        let a = det([0.0, 0.0, 100.0, 100.0], 0.9, 0);
        let b = det([shift, 0.0, 100.0 + shift, 100.0], 0.8, 0);
        assert!((a.iou(&b) - 0.7).abs() < 1e-3);

        let kept = nms(vec![b, a], 0.5, false);
        assert_eq!(kept, vec![a]);
    }

    #[test]
    fn test_overlapping_different_classes_kept() {
        let a = det([0.0, 0.0, 10.0, 10.0], 0.9, 0);
        let b = det([1.0, 1.0, 11.0, 11.0], 0.8, 1);
        let far = det([100.0, 100.0, 110.0, 110.0], 0.95, 0);

        let kept = nms(vec![a, b, far], 0.5, false);
        assert_eq!(kept, vec![far, a, b]);
    }

    #[test]
    fn test_agnostic_suppresses_across_classes() {
        let a = det([0.0, 0.0, 10.0, 10.0], 0.9, 0);
        let b = det([1.0, 1.0, 11.0, 11.0], 0.8, 1);

        let kept = nms(vec![a, b], 0.5, true);
        assert_eq!(kept, vec![a]);
    }

    /// IoU exactly at the threshold does not suppress
    #[test]
    fn test_iou_threshold_is_exclusive() {
        let a = det([0.0, 0.0, 10.0, 10.0], 0.9, 0);
        let b = det([0.0, 0.0, 10.0, 10.0], 0.8, 0);
        assert_eq!(nms(vec![a, b], 1.0, false).len(), 2);
        assert_eq!(nms(vec![a, b], 0.99, false).len(), 1);
    }

    /// Equal confidences resolve by input order
    #[test]
    fn test_ties_broken_by_input_order() {
        let first = det([0.0, 0.0, 10.0, 10.0], 0.5, 0);
        let second = det([1.0, 0.0, 11.0, 10.0], 0.5, 0);
        assert_eq!(nms(vec![first, second], 0.5, false), vec![first]);
        assert_eq!(nms(vec![second, first], 0.5, false), vec![second]);

        let other_class = det([50.0, 50.0, 60.0, 60.0], 0.5, 3);
        assert_eq!(
            nms(vec![other_class, first], 0.5, false),
            vec![other_class, first]
        );
    }

    /// Degenerate boxes never survive and never suppress others
    #[test]
    fn test_degenerate_boxes_never_kept() {
        let flat = det([0.0, 0.0, 10.0, 0.0], 0.99, 0);
        let inverted = det([10.0, 10.0, 0.0, 0.0], 0.98, 0);
        let normal = det([0.0, 0.0, 10.0, 10.0], 0.5, 0);

        let kept = nms(vec![flat, inverted, normal], 0.1, false);
        assert_eq!(kept, vec![normal]);
    }

    #[test]
    fn test_empty_input() {
        assert!(nms(Vec::new(), 0.5, false).is_empty());
        let suppressor = Suppressor::new(0.3, 0.6);
        assert!(suppressor.suppress(&[]).is_empty());
    }

    #[test]
    fn test_confidence_is_objectness_times_best_class() {
        let pred = prediction(&[
            ([0.0, 0.0, 10.0, 10.0, 0.8], [0.2, 0.9, 0.1]),
            // 0.5 * 0.5 = 0.25 < 0.3
            ([50.0, 50.0, 60.0, 60.0, 0.5], [0.5, 0.1, 0.1]),
        ]);
        let candidates = BoxCodec::new(0.3).decode(&pred);
        assert_eq!(candidates.len(), 2);

        let set = Suppressor::new(0.3, 0.6).suppress(&candidates);
        assert_eq!(set.space(), CoordSpace::Network);
        assert_eq!(set.len(), 1);
        let kept = set.as_slice()[0];
        assert_eq!(kept.class_id, 1);
        assert!((kept.confidence - 0.72).abs() < 1e-6);
        assert_eq!(kept.bbox(), [0.0, 0.0, 10.0, 10.0]);
    }

    /// One anchor can yield several class hypotheses in multi-label mode
    #[test]
    fn test_multi_label_expands_hypotheses() {
        let pred = prediction(&[([0.0, 0.0, 10.0, 10.0, 1.0], [0.6, 0.5, 0.1])]);
        let candidates = BoxCodec::new(0.3).decode(&pred);

        let mut suppressor = Suppressor::new(0.3, 0.6);
        assert_eq!(suppressor.suppress(&candidates).len(), 1);

        suppressor.multi_label = true;
        let set = suppressor.suppress(&candidates);
        let classes: Vec<usize> = set.iter().map(|d| d.class_id).collect();
        assert_eq!(classes, vec![0, 1]);

        // Same hypotheses collapse under class-agnostic suppression
        suppressor.agnostic = true;
        let set = suppressor.suppress(&candidates);
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].class_id, 0);
    }

    #[test]
    fn test_multi_label_ignored_for_single_class() {
        let pred = prediction(&[([0.0, 0.0, 10.0, 10.0, 0.9], [0.8])]);
        let candidates = BoxCodec::new(0.3).decode(&pred);
        let mut suppressor = Suppressor::new(0.3, 0.6);
        suppressor.multi_label = true;
        assert_eq!(suppressor.suppress(&candidates).len(), 1);
    }

    #[test]
    fn test_class_allow_list() {
        let pred = prediction(&[
            ([0.0, 0.0, 10.0, 10.0, 0.9], [0.9, 0.0, 0.0]),
            ([20.0, 20.0, 30.0, 30.0, 0.9], [0.0, 0.9, 0.0]),
            ([40.0, 40.0, 50.0, 50.0, 0.9], [0.0, 0.0, 0.9]),
        ]);
        let candidates = BoxCodec::new(0.3).decode(&pred);
        let mut suppressor = Suppressor::new(0.3, 0.6);
        suppressor.classes = vec![2, 0];

        let classes: Vec<usize> = suppressor
            .suppress(&candidates)
            .iter()
            .map(|d| d.class_id)
            .collect();
        assert_eq!(classes, vec![0, 2]);
    }

    #[test]
    fn test_non_finite_candidates_dropped() {
        let pred = prediction(&[
            ([0.0, 0.0, f32::INFINITY, 10.0, 0.9], [0.9]),
            ([0.0, 0.0, 10.0, 10.0, 0.9], [0.9]),
        ]);
        let candidates = BoxCodec::new(0.3).decode(&pred);
        assert_eq!(candidates.len(), 2);
        assert_eq!(Suppressor::new(0.3, 0.6).suppress(&candidates).len(), 1);
    }

    /// Kept boxes of a partition never overlap beyond the threshold
    #[test]
    fn test_kept_boxes_respect_iou_threshold() {
        for seed in 0..20 {
            let input = random_detections(seed, 120, 3);
            for agnostic in [false, true] {
                let kept = nms(input.clone(), 0.45, agnostic);
                assert!(kept.len() <= input.len());
                for (i, a) in kept.iter().enumerate() {
                    for b in &kept[i + 1..] {
                        if agnostic || a.class_id == b.class_id {
                            assert!(a.iou(b) <= 0.45, "seed {seed}: overlap {}", a.iou(b));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_nms_is_idempotent() {
        for seed in 0..20 {
            let input = random_detections(seed, 80, 4);
            for agnostic in [false, true] {
                let once = nms(input.clone(), 0.5, agnostic);
                let twice = nms(once.clone(), 0.5, agnostic);
                assert_eq!(once, twice, "seed {seed}");
            }
        }
    }

    /// Per-partition runs merged together equal class-aware suppression
    #[test]
    fn test_class_aware_equals_per_class_runs() {
        let input = random_detections(7, 150, 3);
        let combined = nms(input.clone(), 0.5, false);

        let mut merged: Vec<Detection> = (0..3)
            .flat_map(|c| {
                let only: Vec<Detection> =
                    input.iter().copied().filter(|d| d.class_id == c).collect();
                nms(only, 0.5, true)
            })
            .collect();
        let order = |a: &Detection, b: &Detection| {
            by_confidence_desc(a, b)
                .then(a.class_id.cmp(&b.class_id))
                .then(a.x1.total_cmp(&b.x1))
        };
        merged.sort_by(order);

        let mut sorted = combined;
        sorted.sort_by(order);
        assert_eq!(sorted, merged);
    }
}
