use crate::catalog::{Category, ClassCatalog};
use crate::types::DetectionSet;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Per-image category tallies. Unknown-category detections are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounters {
    pub recyclable: u32,
    pub non_recyclable: u32,
    pub valuables: u32,
}

impl CategoryCounters {
    pub fn total(&self) -> u32 {
        self.recyclable + self.non_recyclable + self.valuables
    }

    fn record(&mut self, category: Category) {
        match category {
            Category::Recyclable => self.recyclable += 1,
            Category::NonRecyclable => self.non_recyclable += 1,
            Category::Valuables => self.valuables += 1,
            Category::Unknown => {}
        }
    }

    /// Overlay the renderer should show for these counts.
    pub fn overlay(&self) -> Overlay {
        let mode = if self.recyclable + self.non_recyclable > 2 {
            OverlayMode::Performance
        } else if self.valuables != 0 {
            OverlayMode::Money
        } else {
            OverlayMode::Normal
        };

        Overlay {
            mode,
            with_recycle: self.recyclable != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayMode {
    Normal,
    Performance,
    Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub mode: OverlayMode,
    /// Use the variant of the overlay showing the recycle marker.
    pub with_recycle: bool,
}

pub fn aggregate(set: &DetectionSet, catalog: &ClassCatalog) -> CategoryCounters {
    let mut counters = CategoryCounters::default();
    for det in set {
        counters.record(catalog.category(det.class_id));
    }
    counters
}

/// Per-class counts as `"<n> <name>s, "`, in ascending class order.
pub fn summarize(set: &DetectionSet, catalog: &ClassCatalog) -> String {
    let mut per_class: BTreeMap<usize, usize> = BTreeMap::new();
    for det in set {
        *per_class.entry(det.class_id).or_default() += 1;
    }

    let mut summary = String::new();
    for (class_id, count) in per_class {
        // Writing to a String cannot fail
        let _ = match catalog.name(class_id) {
            Some(name) => write!(summary, "{} {}s, ", count, name),
            None => write!(summary, "{} class{}s, ", count, class_id),
        };
    }
    summary
}
