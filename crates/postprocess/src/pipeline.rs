use crate::aggregate::{CategoryCounters, aggregate};
use crate::catalog::ClassCatalog;
use crate::codec::{BoxCodec, RawPrediction};
use crate::config::PostProcessConfig;
use crate::errors::PostProcessError;
use crate::letterbox::{LetterboxTransform, compute_transform, to_image_space};
use crate::suppress::Suppressor;
use crate::types::{DetectionSet, ImageDims};
use rayon::prelude::*;

/// Raw prediction for one image together with its original size.
#[derive(Debug, Clone)]
pub struct FrameInput {
    pub prediction: RawPrediction,
    pub dims: ImageDims,
}

impl FrameInput {
    pub fn new(prediction: RawPrediction, dims: ImageDims) -> Self {
        Self { prediction, dims }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    /// Final detections in image space.
    pub detections: DetectionSet,
    pub counters: CategoryCounters,
    pub transform: LetterboxTransform,
}

/// Decode, suppress, rescale and aggregate one image at a time.
///
/// Holds no per-frame state; the catalog is only read, so one pipeline can
/// serve any number of frames concurrently.
#[derive(Debug, Clone)]
pub struct PostProcessPipeline<'c> {
    config: PostProcessConfig,
    catalog: &'c ClassCatalog,
    codec: BoxCodec,
    suppressor: Suppressor,
}

impl<'c> PostProcessPipeline<'c> {
    pub fn new(config: PostProcessConfig, catalog: &'c ClassCatalog) -> Self {
        let codec = BoxCodec::new(config.conf_threshold)
            .with_box_size_limits(config.box_size_limits);
        let suppressor = Suppressor::from_config(&config);
        Self {
            config,
            catalog,
            codec,
            suppressor,
        }
    }

    pub fn config(&self) -> &PostProcessConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ClassCatalog {
        self.catalog
    }

    #[tracing::instrument(
        skip(self, prediction),
        fields(anchors = prediction.num_anchors(), width = dims.width, height = dims.height)
    )]
    pub fn process(
        &self,
        prediction: &RawPrediction,
        dims: ImageDims,
    ) -> Result<FrameResult, PostProcessError> {
        if prediction.num_classes() > self.catalog.len() {
            tracing::warn!(
                prediction_classes = prediction.num_classes(),
                catalog_classes = self.catalog.len(),
                "Prediction has more classes than the catalog"
            );
        }

        let candidates = self.codec.decode(prediction);
        let network = self.suppressor.suppress(&candidates);
        let transform = compute_transform(dims, self.config.network_size)?;
        let detections = to_image_space(network, &transform);
        let counters = aggregate(&detections, self.catalog);

        tracing::debug!(
            candidates = candidates.len(),
            detections = detections.len(),
            recyclable = counters.recyclable,
            non_recyclable = counters.non_recyclable,
            valuables = counters.valuables,
            "Frame post-processed"
        );

        Ok(FrameResult {
            detections,
            counters,
            transform,
        })
    }

    /// Process every frame independently on the rayon pool.
    ///
    /// Results keep the input order; a failing frame does not affect the
    /// others.
    pub fn process_batch(&self, frames: &[FrameInput]) -> Vec<Result<FrameResult, PostProcessError>> {
        let _s = common::span!("process_batch");

        frames
            .par_iter()
            .map(|frame| self.process(&frame.prediction, frame.dims))
            .collect()
    }
}
