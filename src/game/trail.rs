use super::constants::{MAX_SPAWN_ATTEMPTS, SPAWN_LENGTH};
use super::food::Food;
use super::grid::Grid;
use super::types::{Cell, Direction, PlayerState};
use rand::Rng;
use std::collections::VecDeque;

pub const DEFAULT_HEADING: Direction = Direction::Right;

/// One player's snake. `body[0]` is the head.
#[derive(Debug, Clone)]
pub struct Trail {
    pub session_id: String,
    pub uuid: String,
    pub name: String,
    pub color: String,
    pub body: VecDeque<Cell>,
    pub heading: Direction,
    /// Direction of the most recent advance. Reversal is judged against
    /// this, so several turns between two ticks cannot fold the head back
    /// onto the neck.
    pub last_step: Direction,
    pub growth_pending: u32,
    pub alive: bool,
    pub max_length: usize,
}

impl Trail {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn<R, F>(
        session_id: String,
        uuid: String,
        name: String,
        color: String,
        max_length: usize,
        grid: &Grid,
        rng: &mut R,
        occupied: F,
    ) -> Self
    where
        R: Rng + ?Sized,
        F: Fn(Cell) -> bool,
    {
        let mut trail = Self {
            session_id,
            uuid,
            name,
            color,
            body: VecDeque::with_capacity(SPAWN_LENGTH),
            heading: DEFAULT_HEADING,
            last_step: DEFAULT_HEADING,
            growth_pending: 0,
            alive: true,
            max_length: max_length.max(SPAWN_LENGTH),
        };
        trail.reset(grid, rng, occupied);
        trail
    }

    /// Places a fresh two-cell trail with its head at `head`, tail trailing
    /// behind the default heading.
    pub fn place(&mut self, grid: &Grid, head: Cell) {
        self.heading = DEFAULT_HEADING;
        self.last_step = DEFAULT_HEADING;
        self.body.clear();
        self.body.push_back(head);
        let mut tail = head;
        while self.body.len() < SPAWN_LENGTH {
            tail = grid.step(tail, DEFAULT_HEADING.opposite());
            self.body.push_back(tail);
        }
        self.growth_pending = 0;
        self.alive = true;
    }

    /// Respawns at a random spot whose cells are all free according to
    /// `occupied`, retrying a bounded number of times. The last sample is
    /// kept when the board is too crowded.
    pub fn reset<R, F>(&mut self, grid: &Grid, rng: &mut R, occupied: F)
    where
        R: Rng + ?Sized,
        F: Fn(Cell) -> bool,
    {
        for _ in 0..MAX_SPAWN_ATTEMPTS {
            self.place(grid, grid.random_cell(rng));
            if !self.body.iter().any(|cell| occupied(*cell)) {
                return;
            }
        }
    }

    pub fn head(&self) -> Option<Cell> {
        self.body.front().copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Returns false when the change was rejected.
    pub fn set_heading(&mut self, direction: Direction) -> bool {
        if !self.alive || direction == self.last_step.opposite() {
            return false;
        }
        self.heading = direction;
        true
    }

    /// Moves one cell along the heading. Returns true when the trail reached
    /// a new personal best length.
    pub fn advance(&mut self, grid: &Grid) -> bool {
        if !self.alive {
            return false;
        }
        let Some(head) = self.head() else { return false };
        self.body.push_front(grid.step(head, self.heading));
        self.last_step = self.heading;
        if self.growth_pending > 0 {
            self.growth_pending -= 1;
        } else {
            self.body.pop_back();
        }
        if self.body.len() > self.max_length {
            self.max_length = self.body.len();
            return true;
        }
        false
    }

    pub fn grow(&mut self) {
        self.growth_pending += 1;
    }

    pub fn die(&mut self) {
        self.alive = false;
    }

    pub fn collides_with(&self, other: &Trail) -> bool {
        let Some(head) = self.head() else { return false };
        other.body.contains(&head)
    }

    /// Head against the rest of its own body.
    pub fn collides_with_self(&self) -> bool {
        let Some(head) = self.head() else { return false };
        self.body.iter().skip(1).any(|cell| *cell == head)
    }

    pub fn eats(&self, food: &Food) -> bool {
        self.head() == Some(food.position)
    }

    pub fn state(&self) -> PlayerState {
        PlayerState {
            id: self.session_id.clone(),
            uuid: self.uuid.clone(),
            name: self.name.clone(),
            body: self.body.iter().copied().collect(),
            color: self.color.clone(),
            alive: self.alive,
            max_length_ever_reached: self.max_length,
        }
    }
}
