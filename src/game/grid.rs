use super::types::{Cell, Direction};
use rand::Rng;

/// Toroidal board. Dimensions are fixed for the lifetime of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    width: i32,
    height: i32,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn wrap(coordinate: i32, axis_length: i32) -> i32 {
        coordinate.rem_euclid(axis_length)
    }

    #[cfg(test)]
    pub fn contains(&self, cell: Cell) -> bool {
        (0..self.width).contains(&cell.x) && (0..self.height).contains(&cell.y)
    }

    pub fn step(&self, cell: Cell, direction: Direction) -> Cell {
        let (dx, dy) = direction.delta();
        Cell::new(
            Self::wrap(cell.x + dx, self.width),
            Self::wrap(cell.y + dy, self.height),
        )
    }

    /// True when `b` is one wrapped step away from `a`.
    #[cfg(test)]
    pub fn adjacent(&self, a: Cell, b: Cell) -> bool {
        Direction::ALL
            .iter()
            .any(|direction| self.step(a, *direction) == b)
    }

    pub fn random_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Cell {
        Cell::new(rng.gen_range(0..self.width), rng.gen_range(0..self.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn wrap_is_never_negative() {
        assert_eq!(Grid::wrap(-1, 40), 39);
        assert_eq!(Grid::wrap(-41, 40), 39);
        assert_eq!(Grid::wrap(40, 40), 0);
        assert_eq!(Grid::wrap(17, 40), 17);
    }

    #[test]
    fn stepping_off_an_edge_wraps_around() {
        let grid = Grid::new(40, 30);
        assert_eq!(grid.step(Cell::new(39, 4), Direction::Right), Cell::new(0, 4));
        assert_eq!(grid.step(Cell::new(0, 4), Direction::Left), Cell::new(39, 4));
        assert_eq!(grid.step(Cell::new(7, 0), Direction::Up), Cell::new(7, 29));
        assert_eq!(grid.step(Cell::new(7, 29), Direction::Down), Cell::new(7, 0));
    }

    #[test]
    fn adjacency_follows_the_torus() {
        let grid = Grid::new(40, 30);
        assert!(grid.adjacent(Cell::new(0, 0), Cell::new(39, 0)));
        assert!(grid.adjacent(Cell::new(5, 5), Cell::new(5, 6)));
        assert!(!grid.adjacent(Cell::new(5, 5), Cell::new(6, 6)));
        assert!(!grid.adjacent(Cell::new(5, 5), Cell::new(5, 5)));
    }

    #[test]
    fn random_cells_stay_in_bounds() {
        let grid = Grid::new(3, 2);
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            assert!(grid.contains(grid.random_cell(&mut rng)));
        }
    }
}
