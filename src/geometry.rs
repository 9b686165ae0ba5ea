/// Integer rectangle in page pixels. `x`/`y` is the top-left corner; the
/// rectangle covers columns `x..x + width` and rows `y..y + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    /// Strict overlap test; rectangles that only share an edge do not
    /// intersect, and empty rectangles never do.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Rect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Rect::new(x, y, (right - x).max(0), (bottom - y).max(0))
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// A rectangle of page fractions, `0.0..=1.0` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub from_x: f64,
    pub from_y: f64,
    pub to_x: f64,
    pub to_y: f64,
}

impl Region {
    pub fn new(from_x: f64, from_y: f64, to_x: f64, to_y: f64) -> Self {
        Self {
            from_x,
            from_y,
            to_x,
            to_y,
        }
    }

    pub fn full() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn validate(&self) -> crate::Result<()> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if in_range(self.from_x)
            && in_range(self.from_y)
            && in_range(self.to_x)
            && in_range(self.to_y)
            && self.from_x < self.to_x
            && self.from_y < self.to_y
        {
            Ok(())
        } else {
            Err(crate::OcrError::InvalidRegion {
                from_x: self.from_x,
                from_y: self.from_y,
                to_x: self.to_x,
                to_y: self.to_y,
            })
        }
    }

    /// Pixel rectangle of this region on a page of the given size.
    pub fn to_pixels(&self, width: u32, height: u32) -> Rect {
        let x0 = (self.from_x * width as f64) as i32;
        let y0 = (self.from_y * height as f64) as i32;
        let x1 = (self.to_x * width as f64).ceil() as i32;
        let y1 = (self.to_y * height as f64).ceil() as i32;
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Whether a box overlaps this region on a page of the given size.
    pub fn overlaps(&self, rect: &Rect, width: u32, height: u32) -> bool {
        let (w, h) = (width as f64, height as f64);
        rect.right() as f64 > w * self.from_x
            && rect.bottom() as f64 > h * self.from_y
            && (rect.x as f64) < w * self.to_x
            && (rect.y as f64) < h * self.to_y
    }
}

impl Default for Region {
    fn default() -> Self {
        Self::full()
    }
}
