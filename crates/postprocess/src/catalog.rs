use crate::errors::CatalogError;
use std::fs;
use std::path::Path;

/// Semantic bucket a class is sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Recyclable,
    NonRecyclable,
    Valuables,
    Unknown,
}

impl Category {
    /// Markers recognised in a names file, checked in this order.
    const MARKERS: [(&'static str, Category); 3] = [
        ("(Recyclable)", Category::Recyclable),
        ("(Non-Recyclable)", Category::NonRecyclable),
        ("(Valuables)", Category::Valuables),
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Recyclable => "Recyclable",
            Category::NonRecyclable => "Non-Recyclable",
            Category::Valuables => "Valuables",
            Category::Unknown => "Unknown",
        }
    }

    /// Overlay colour in BGR order.
    pub fn color(&self) -> [u8; 3] {
        match self {
            Category::Recyclable => [23, 0, 153],
            Category::NonRecyclable => [163, 0, 38],
            Category::Valuables => [122, 0, 163],
            Category::Unknown => [0, 0, 0],
        }
    }

    /// Split a raw names-file entry into its display name and category.
    pub fn parse(raw: &str) -> (String, Category) {
        for (marker, category) in Self::MARKERS {
            if raw.contains(marker) {
                return (raw.replace(marker, "").trim().to_string(), category);
            }
        }
        (raw.trim().to_string(), Category::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntry {
    pub name: String,
    pub category: Category,
}

/// Class index to display name and category, built once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassCatalog {
    entries: Vec<ClassEntry>,
}

impl ClassCatalog {
    /// Build from newline-delimited names. Blank lines are skipped and do not
    /// consume a class index.
    pub fn from_names(text: &str) -> Self {
        let entries = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let (name, category) = Category::parse(line);
                ClassEntry { name, category }
            })
            .collect();
        Self { entries }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let catalog = Self::from_names(&text);
        if catalog.is_empty() {
            return Err(CatalogError::Empty);
        }

        tracing::info!(
            path = %path.display(),
            classes = catalog.len(),
            "Loaded class catalog"
        );

        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, class_id: usize) -> Option<&ClassEntry> {
        self.entries.get(class_id)
    }

    pub fn name(&self, class_id: usize) -> Option<&str> {
        self.get(class_id).map(|entry| entry.name.as_str())
    }

    /// Category of a class; indices outside the catalog are `Unknown`.
    pub fn category(&self, class_id: usize) -> Category {
        self.get(class_id)
            .map(|entry| entry.category)
            .unwrap_or(Category::Unknown)
    }

    pub fn color(&self, class_id: usize) -> [u8; 3] {
        self.category(class_id).color()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassEntry> {
        self.entries.iter()
    }
}
