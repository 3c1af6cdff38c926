use core::fmt;

use serde::{Deserialize, Serialize};

/// Integer grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Euclidean distance between cell coordinates.
    pub fn distance(self, other: Location) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<(i32, i32)> for Location {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Grid extent: valid cells are `[0, width) x [0, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub width: u32,
    pub height: u32,
}

impl GridShape {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, location: Location) -> bool {
        location.x >= 0
            && location.y >= 0
            && (location.x as i64) < i64::from(self.width)
            && (location.y as i64) < i64::from(self.height)
    }

    pub fn cell_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self::new(10, 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_half_open() {
        let shape = GridShape::new(5, 1);
        assert!(shape.contains(Location::new(0, 0)));
        assert!(shape.contains(Location::new(4, 0)));
        assert!(!shape.contains(Location::new(5, 0)));
        assert!(!shape.contains(Location::new(0, 1)));
        assert!(!shape.contains(Location::new(-1, 0)));
    }

    #[test]
    fn distance_is_euclidean() {
        let a = Location::new(0, 0);
        assert_eq!(a.distance(Location::new(3, 4)), 5.0);
        assert_eq!(a.distance(a), 0.0);
    }
}
