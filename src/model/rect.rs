//! Axis-aligned rectangles in page space.

use serde::{Deserialize, Serialize};

/// A rectangle in PDF points.
///
/// Coordinates use a top-left origin with y growing downward, so `y0` is
/// the top edge and `y1` the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// Rect rounded to 0.1 units, used to collapse duplicate detections.
pub type RectKey = (i64, i64, i64, i64);

impl Rect {
    /// Create a rectangle, normalizing so that `x0 <= x1` and `y0 <= y1`.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Bounding box of a set of points, or `None` when empty.
    pub fn from_points<I: IntoIterator<Item = (f32, f32)>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let (fx, fy) = iter.next()?;
        let mut rect = Rect {
            x0: fx,
            y0: fy,
            x1: fx,
            y1: fy,
        };
        for (x, y) in iter {
            rect.x0 = rect.x0.min(x);
            rect.y0 = rect.y0.min(y);
            rect.x1 = rect.x1.max(x);
            rect.y1 = rect.y1.max(y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Whether the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Union of every rectangle in the iterator.
    pub fn union_all<'a, I: IntoIterator<Item = &'a Rect>>(rects: I) -> Option<Rect> {
        rects
            .into_iter()
            .fold(None, |acc: Option<Rect>, r| match acc {
                Some(u) => Some(u.union(r)),
                None => Some(*r),
            })
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }

    /// Vertical distance between the facing edges of two rectangles.
    ///
    /// Zero when the rectangles overlap vertically.
    pub fn vertical_gap(&self, other: &Rect) -> f32 {
        if other.y1 <= self.y0 {
            self.y0 - other.y1
        } else if other.y0 >= self.y1 {
            other.y0 - self.y1
        } else {
            0.0
        }
    }

    /// Rounded key used for deduplication.
    pub fn key(&self) -> RectKey {
        fn r(v: f32) -> i64 {
            (v as f64 * 10.0).round() as i64
        }
        (r(self.x0), r(self.y0), r(self.x1), r(self.y1))
    }

    /// Coordinates as `[x0, y0, x1, y1]`.
    pub fn to_array(&self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes() {
        let r = Rect::new(10.0, 20.0, 0.0, 5.0);
        assert_eq!(r, Rect::new(0.0, 5.0, 10.0, 20.0));
        assert_eq!(r.width(), 10.0);
        assert_eq!(r.height(), 15.0);
        assert_eq!(r.area(), 150.0);
    }

    #[test]
    fn test_union_all() {
        let rects = [Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(5.0, 5.0, 6.0, 7.0)];
        assert_eq!(
            Rect::union_all(rects.iter()),
            Some(Rect::new(0.0, 0.0, 6.0, 7.0))
        );
        assert_eq!(Rect::union_all(std::iter::empty::<&Rect>()), None);
    }

    #[test]
    fn test_vertical_gap() {
        let caption = Rect::new(0.0, 700.0, 100.0, 712.0);
        let above = Rect::new(0.0, 500.0, 100.0, 690.0);
        let below = Rect::new(0.0, 730.0, 100.0, 760.0);
        let overlapping = Rect::new(0.0, 705.0, 100.0, 800.0);
        assert_eq!(caption.vertical_gap(&above), 10.0);
        assert_eq!(caption.vertical_gap(&below), 18.0);
        assert_eq!(caption.vertical_gap(&overlapping), 0.0);
    }

    #[test]
    fn test_key_rounds_to_tenths() {
        let a = Rect::new(10.01, 20.04, 30.0, 40.0);
        let b = Rect::new(10.04, 19.96, 30.02, 39.98);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), Rect::new(10.2, 20.0, 30.0, 40.0).key());
    }

    #[test]
    fn test_from_points() {
        let r = Rect::from_points([(3.0, 4.0), (1.0, 9.0), (2.0, 2.0)]).unwrap();
        assert_eq!(r, Rect::new(1.0, 2.0, 3.0, 9.0));
        assert!(Rect::from_points(Vec::<(f32, f32)>::new()).is_none());
    }
}
