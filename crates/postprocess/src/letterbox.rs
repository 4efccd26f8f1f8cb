use crate::errors::PostProcessError;
use crate::types::{CoordSpace, Detection, DetectionSet, ImageDims};

/// Aspect-preserving fit of an image into a square network input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxTransform {
    pub original: ImageDims,
    pub network_size: u32,
    pub scale: f32,
    /// Resized content size inside the network input.
    pub resized: (u32, u32),
    pub pad_left: f32,
    pub pad_top: f32,
    pub pad_right: f32,
    pub pad_bottom: f32,
}

impl LetterboxTransform {
    /// Network-space box to image space, clamped to `[0, dim - 1]` and then
    /// rounded.
    pub fn box_to_image(&self, bbox: [f32; 4]) -> [f32; 4] {
        let max_x = self.original.width.saturating_sub(1) as f32;
        let max_y = self.original.height.saturating_sub(1) as f32;
        let x = |v: f32| ((v - self.pad_left) / self.scale).clamp(0.0, max_x).round();
        let y = |v: f32| ((v - self.pad_top) / self.scale).clamp(0.0, max_y).round();
        [x(bbox[0]), y(bbox[1]), x(bbox[2]), y(bbox[3])]
    }

    /// Image-space box back to network-input pixels.
    pub fn box_to_network(&self, bbox: [f32; 4]) -> [f32; 4] {
        let x = |v: f32| v * self.scale + self.pad_left;
        let y = |v: f32| v * self.scale + self.pad_top;
        [x(bbox[0]), y(bbox[1]), x(bbox[2]), y(bbox[3])]
    }
}

/// Compute the letterbox transform for one image.
///
/// The longer side is scaled to `network_size`; the remaining padding is
/// split with the floor on the left/top and the ceiling on the right/bottom.
pub fn compute_transform(
    original: ImageDims,
    network_size: u32,
) -> Result<LetterboxTransform, PostProcessError> {
    let invalid = PostProcessError::InvalidGeometry {
        width: original.width,
        height: original.height,
        network_size,
    };

    let longest = original.width.max(original.height);
    if longest == 0 || original.width == 0 || original.height == 0 {
        return Err(invalid);
    }

    let scale = network_size as f32 / longest as f32;
    if !(scale > 0.0 && scale.is_finite()) {
        return Err(invalid);
    }

    let resize = |dim: u32| ((dim as f32 * scale).round() as u32).min(network_size);
    let resized = (resize(original.width), resize(original.height));

    let half_w = (network_size - resized.0) as f32 / 2.0;
    let half_h = (network_size - resized.1) as f32 / 2.0;

    let transform = LetterboxTransform {
        original,
        network_size,
        scale,
        resized,
        pad_left: half_w.floor(),
        pad_top: half_h.floor(),
        pad_right: half_w.ceil(),
        pad_bottom: half_h.ceil(),
    };

    tracing::trace!(
        width = original.width,
        height = original.height,
        network_size,
        scale,
        pad_left = transform.pad_left,
        pad_top = transform.pad_top,
        "Computed letterbox transform"
    );

    Ok(transform)
}

/// Map a network-space detection set into original image pixels.
///
/// A set already in image space is returned unchanged.
pub fn to_image_space(set: DetectionSet, transform: &LetterboxTransform) -> DetectionSet {
    if set.space() == CoordSpace::Image {
        tracing::warn!("Detection set already in image space, skipping rescale");
        return set;
    }

    let mapped = set
        .into_vec()
        .into_iter()
        .map(|det| with_bbox(det, transform.box_to_image(det.bbox())))
        .collect();

    DetectionSet::new(CoordSpace::Image, mapped)
}

/// Inverse of [`to_image_space`], without rounding.
pub fn to_network_space(set: DetectionSet, transform: &LetterboxTransform) -> DetectionSet {
    if set.space() == CoordSpace::Network {
        return set;
    }

    let mapped = set
        .into_vec()
        .into_iter()
        .map(|det| with_bbox(det, transform.box_to_network(det.bbox())))
        .collect();

    DetectionSet::new(CoordSpace::Network, mapped)
}

fn with_bbox(det: Detection, bbox: [f32; 4]) -> Detection {
    Detection {
        x1: bbox[0],
        y1: bbox[1],
        x2: bbox[2],
        y2: bbox[3],
        ..det
    }
}
