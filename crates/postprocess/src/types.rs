/// Coordinate space a box is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordSpace {
    /// Letterboxed network input pixels.
    Network,
    /// Original image pixels.
    Image,
}

/// Original image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDims {
    pub width: u32,
    pub height: u32,
}

impl ImageDims {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// One finalized box in corner form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

impl Detection {
    pub fn bbox(&self) -> [f32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// Zero or negative extent on either axis.
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    pub fn area(&self) -> f32 {
        if self.is_degenerate() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        iou(&self.bbox(), &other.bbox())
    }
}

/// Intersection over union of two `[x1, y1, x2, y2]` rectangles.
///
/// Degenerate rectangles have zero area, so they yield an IoU of 0 against
/// anything. A zero union also yields 0.
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let area = |r: &[f32; 4]| {
        let (w, h) = (r[2] - r[0], r[3] - r[1]);
        if w > 0.0 && h > 0.0 { w * h } else { 0.0 }
    };
    let (area_a, area_b) = (area(a), area(b));
    if area_a == 0.0 || area_b == 0.0 {
        return 0.0;
    }

    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Ordered detections for one image, tagged with their coordinate space.
///
/// Order is the suppressor's emission order (confidence descending). Label
/// files are written in the reverse of this order.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSet {
    space: CoordSpace,
    items: Vec<Detection>,
}

impl DetectionSet {
    pub fn new(space: CoordSpace, items: Vec<Detection>) -> Self {
        Self { space, items }
    }

    pub fn empty(space: CoordSpace) -> Self {
        Self::new(space, Vec::new())
    }

    pub fn space(&self) -> CoordSpace {
        self.space
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Detection> {
        self.items
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
