use super::constants::MAX_SPAWN_ATTEMPTS;
use super::grid::Grid;
use super::types::Cell;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct Food {
    pub position: Cell,
}

impl Food {
    pub fn spawn<R: Rng + ?Sized>(grid: &Grid, rng: &mut R) -> Self {
        Self {
            position: grid.random_cell(rng),
        }
    }

    /// Moves the food to a fresh random cell, retrying a bounded number of
    /// times to avoid cells for which `occupied` returns true. The last sample
    /// is kept if every attempt lands on an occupied cell.
    pub fn respawn<R, F>(&mut self, grid: &Grid, rng: &mut R, occupied: F)
    where
        R: Rng + ?Sized,
        F: Fn(Cell) -> bool,
    {
        let mut candidate = grid.random_cell(rng);
        for _ in 1..MAX_SPAWN_ATTEMPTS {
            if !occupied(candidate) {
                break;
            }
            candidate = grid.random_cell(rng);
        }
        self.position = candidate;
    }
}
