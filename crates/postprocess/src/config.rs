use std::env;

pub const DEFAULT_CONF_THRESHOLD: f32 = 0.3;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.6;
pub const DEFAULT_NETWORK_SIZE: u32 = 512;

#[derive(Debug, Clone, PartialEq)]
pub struct PostProcessConfig {
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub multi_label: bool,
    /// Allowed class indices; empty allows every class.
    pub classes: Vec<usize>,
    pub agnostic: bool,
    pub network_size: u32,
    /// Exclusive `(min, max)` width/height bounds applied before scoring.
    pub box_size_limits: Option<(f32, f32)>,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self {
            conf_threshold: DEFAULT_CONF_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            multi_label: false,
            classes: Vec::new(),
            agnostic: false,
            network_size: DEFAULT_NETWORK_SIZE,
            box_size_limits: None,
        }
    }
}

impl PostProcessConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let conf_threshold = parse_var("CONF_THRESHOLD").unwrap_or(defaults.conf_threshold);
        let iou_threshold = parse_var("IOU_THRESHOLD").unwrap_or(defaults.iou_threshold);
        let multi_label = parse_flag("MULTI_LABEL").unwrap_or(defaults.multi_label);
        let agnostic = parse_flag("AGNOSTIC_NMS").unwrap_or(defaults.agnostic);
        let network_size = parse_var("IMG_SIZE").unwrap_or(defaults.network_size);

        let classes = env::var("CLASSES")
            .ok()
            .map(|s| {
                s.split(',')
                    .filter_map(|c| c.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default();

        let box_size_limits = match (parse_var("BOX_MIN_WH"), parse_var("BOX_MAX_WH")) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        };

        let config = Self {
            conf_threshold,
            iou_threshold,
            multi_label,
            classes,
            agnostic,
            network_size,
            box_size_limits,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.conf_threshold),
            "Confidence threshold must be within [0, 1], got {}",
            self.conf_threshold
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.iou_threshold),
            "IoU threshold must be within [0, 1], got {}",
            self.iou_threshold
        );
        anyhow::ensure!(self.network_size > 0, "Network size must be positive");
        if let Some((min, max)) = self.box_size_limits {
            anyhow::ensure!(
                min < max,
                "Box size limits must satisfy min < max, got ({}, {})",
                min,
                max
            );
        }
        Ok(())
    }

    pub fn with_conf_threshold(mut self, conf_threshold: f32) -> Self {
        self.conf_threshold = conf_threshold;
        self
    }

    pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
        self.iou_threshold = iou_threshold;
        self
    }

    pub fn with_multi_label(mut self, multi_label: bool) -> Self {
        self.multi_label = multi_label;
        self
    }

    pub fn with_classes(mut self, classes: Vec<usize>) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_agnostic(mut self, agnostic: bool) -> Self {
        self.agnostic = agnostic;
        self
    }

    pub fn with_network_size(mut self, network_size: u32) -> Self {
        self.network_size = network_size;
        self
    }

    pub fn with_box_size_limits(mut self, limits: Option<(f32, f32)>) -> Self {
        self.box_size_limits = limits;
        self
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn parse_flag(name: &str) -> Option<bool> {
    env::var(name)
        .ok()
        .and_then(|s| match s.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}
