use crate::errors::LabelWriteError;
use crate::types::{CoordSpace, Detection, DetectionSet, ImageDims};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Significant digits used for label values, as printf's `%g`.
const SIGNIFICANT_DIGITS: usize = 6;

/// Format a value like printf `%g`: six significant digits, trailing zeros
/// removed, scientific notation below 1e-4 or at 1e6 and above.
pub fn format_g(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // Exponent after rounding to the requested precision
    let scientific = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_trailing_zeros(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exponent) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_trailing_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// `<class> <cx> <cy> <w> <h>` with the box normalised by the image size.
pub fn format_label_line(det: &Detection, dims: ImageDims) -> String {
    let (w, h) = (dims.width as f64, dims.height as f64);
    let (x1, y1, x2, y2) = (det.x1 as f64, det.y1 as f64, det.x2 as f64, det.y2 as f64);

    let fields = [
        det.class_id as f64,
        (x1 + x2) / 2.0 / w,
        (y1 + y2) / 2.0 / h,
        (x2 - x1) / w,
        (y2 - y1) / h,
    ];

    fields.iter().map(|&v| format_g(v)).collect::<Vec<_>>().join(" ")
}

/// Label file contents for one image, detections in reverse emission order.
pub fn render_labels(set: &DetectionSet, dims: ImageDims) -> String {
    if set.space() != CoordSpace::Image {
        tracing::warn!("Rendering labels from a network-space detection set");
    }

    let mut out = String::new();
    for det in set.iter().rev() {
        out.push_str(&format_label_line(det, dims));
        out.push('\n');
    }
    out
}

/// Appends label files next to the rendered outputs in `output_dir`.
#[derive(Debug, Clone)]
pub struct LabelWriter {
    output_dir: PathBuf,
}

impl LabelWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// `<output_dir>/<image stem>.txt`
    pub fn label_path(&self, image_path: &Path) -> PathBuf {
        let name = image_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("labels"));
        self.output_dir.join(name).with_extension("txt")
    }

    /// Append the labels of one image, returning the file written to.
    pub fn append(
        &self,
        image_path: &Path,
        set: &DetectionSet,
        dims: ImageDims,
    ) -> Result<PathBuf, LabelWriteError> {
        let path = self.label_path(image_path);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(render_labels(set, dims).as_bytes())?;

        tracing::trace!(path = %path.display(), detections = set.len(), "Appended labels");
        Ok(path)
    }
}
