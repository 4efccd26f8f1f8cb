use common::span_debug;
use ndarray::{Array2, Array3, ArrayView1, ArrayView2, Axis, ShapeError, s};

/// Box parameters (cx, cy, w, h) followed by objectness.
pub const HEADER_LEN: usize = 5;
const OBJECTNESS: usize = 4;

/// Raw detector output for one image: `[anchors, 5 + num_classes]`.
///
/// Each row holds `cx, cy, w, h` in network-input pixels, the objectness
/// scalar, then one score per class.
#[derive(Debug, Clone)]
pub struct RawPrediction {
    data: Array2<f32>,
}

impl RawPrediction {
    /// Wrap an `[anchors, 5 + num_classes]` array.
    ///
    /// # Panics
    /// If the array has fewer than five columns. Row layout is a caller
    /// contract, not a recoverable condition.
    pub fn new(data: Array2<f32>) -> Self {
        assert!(
            data.ncols() >= HEADER_LEN,
            "prediction rows must hold at least {} values, got {}",
            HEADER_LEN,
            data.ncols()
        );
        Self { data }
    }

    pub fn from_shape_vec(
        num_anchors: usize,
        num_classes: usize,
        data: Vec<f32>,
    ) -> Result<Self, ShapeError> {
        let data = Array2::from_shape_vec((num_anchors, HEADER_LEN + num_classes), data)?;
        Ok(Self { data })
    }

    /// A prediction with no anchors.
    pub fn empty(num_classes: usize) -> Self {
        Self {
            data: Array2::zeros((0, HEADER_LEN + num_classes)),
        }
    }

    /// Split a batched `[batch, anchors, 5 + num_classes]` tensor into one
    /// prediction per image.
    ///
    /// # Panics
    /// If the last axis is shorter than five.
    pub fn split_batch(batch: Array3<f32>) -> Vec<RawPrediction> {
        batch
            .axis_iter(Axis(0))
            .map(|image| RawPrediction::new(image.to_owned()))
            .collect()
    }

    pub fn num_anchors(&self) -> usize {
        self.data.nrows()
    }

    pub fn num_classes(&self) -> usize {
        self.data.ncols() - HEADER_LEN
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }
}

/// A decoded anchor that passed the objectness threshold.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    /// Row index in the originating prediction.
    pub anchor: usize,
    /// `[x1, y1, x2, y2]` in network-input pixels.
    pub bbox: [f32; 4],
    pub objectness: f32,
    pub class_scores: ArrayView1<'a, f32>,
}

/// Decodes raw rows into corner-form candidates, filtering on objectness.
#[derive(Debug, Clone)]
pub struct BoxCodec {
    pub conf_threshold: f32,
    /// Exclusive `(min, max)` bounds on box width and height.
    pub box_size_limits: Option<(f32, f32)>,
}

impl BoxCodec {
    pub fn new(conf_threshold: f32) -> Self {
        Self {
            conf_threshold,
            box_size_limits: None,
        }
    }

    pub fn with_box_size_limits(mut self, limits: Option<(f32, f32)>) -> Self {
        self.box_size_limits = limits;
        self
    }

    pub fn decode<'a>(&self, prediction: &'a RawPrediction) -> Vec<Candidate<'a>> {
        let _s = span_debug!("decode");

        let mut candidates = Vec::new();
        for (anchor, row) in prediction.data.outer_iter().enumerate() {
            let objectness = row[OBJECTNESS];
            // NaN objectness fails this comparison too
            if !(objectness >= self.conf_threshold) {
                continue;
            }

            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            if let Some((min_wh, max_wh)) = self.box_size_limits {
                let fits = |v: f32| v > min_wh && v < max_wh;
                if !(fits(w) && fits(h)) {
                    continue;
                }
            }

            let (x1, y1, x2, y2) = cxcywh_to_xyxy(cx, cy, w, h);
            candidates.push(Candidate {
                anchor,
                bbox: [x1, y1, x2, y2],
                objectness,
                class_scores: row.slice_move(s![HEADER_LEN..]),
            });
        }

        tracing::debug!(
            anchors = prediction.num_anchors(),
            candidates = candidates.len(),
            "Decoded anchors above objectness threshold"
        );

        candidates
    }
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
pub fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}
