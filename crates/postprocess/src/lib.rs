pub mod aggregate;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod errors;
pub mod labels;
pub mod letterbox;
pub mod pipeline;
pub mod stream;
pub mod suppress;
pub mod types;

// Re-export commonly used types for convenience
pub use aggregate::{CategoryCounters, Overlay, OverlayMode, aggregate, summarize};
pub use catalog::{Category, ClassCatalog, ClassEntry};
pub use codec::{BoxCodec, Candidate, RawPrediction};
pub use config::PostProcessConfig;
pub use errors::{CatalogError, LabelWriteError, PostProcessError};
pub use labels::{LabelWriter, render_labels};
pub use letterbox::{LetterboxTransform, compute_transform, to_image_space, to_network_space};
pub use pipeline::{FrameInput, FrameResult, PostProcessPipeline};
pub use stream::{StopHandle, StreamRunner, StreamStats};
pub use suppress::{Suppressor, nms};
pub use types::{CoordSpace, Detection, DetectionSet, ImageDims, iou};
