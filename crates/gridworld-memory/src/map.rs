use gridworld_core::{GridShape, Location};

/// Dense per-cell passability grid. Cells outside the grid are never
/// traversable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversabilityMap {
    shape: GridShape,
    blocked: Vec<bool>,
}

impl TraversabilityMap {
    pub fn new(shape: GridShape) -> Self {
        Self {
            shape,
            blocked: vec![false; shape.cell_count()],
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    fn idx(&self, cell: Location) -> Option<usize> {
        if !self.shape.contains(cell) {
            return None;
        }
        Some(cell.y as usize * self.shape.width as usize + cell.x as usize)
    }

    pub fn set_blocked(&mut self, cell: Location, blocked: bool) {
        if let Some(idx) = self.idx(cell) {
            self.blocked[idx] = blocked;
        }
    }

    pub fn is_traversable(&self, cell: Location) -> bool {
        self.idx(cell).is_some_and(|idx| !self.blocked[idx])
    }

    /// Blocked cells in row-major order.
    pub fn blocked_cells(&self) -> impl Iterator<Item = Location> + '_ {
        let width = self.shape.width.max(1) as usize;
        self.blocked
            .iter()
            .enumerate()
            .filter(|(_, blocked)| **blocked)
            .map(move |(idx, _)| Location::new((idx % width) as i32, (idx / width) as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_bounds_is_not_traversable() {
        let mut map = TraversabilityMap::new(GridShape::new(3, 2));
        map.set_blocked(Location::new(2, 1), true);
        map.set_blocked(Location::new(9, 9), true);

        assert!(map.is_traversable(Location::new(0, 0)));
        assert!(!map.is_traversable(Location::new(2, 1)));
        assert!(!map.is_traversable(Location::new(-1, 0)));
        assert!(!map.is_traversable(Location::new(3, 0)));
        assert_eq!(map.blocked_cells().collect::<Vec<_>>(), vec![Location::new(2, 1)]);
    }
}
