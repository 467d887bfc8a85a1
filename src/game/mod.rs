pub mod constants;
pub mod engine;
pub mod food;
pub mod grid;
pub mod round;
pub mod scoreboard;
pub mod trail;
pub mod types;
