pub const GRID_WIDTH: i32 = 40;
pub const GRID_HEIGHT: i32 = 30;
pub const TICK_MS: u64 = 100;
pub const RESTART_DELAY_MS: i64 = 3000;
pub const START_GRACE_MS: i64 = 1000;
pub const SPAWN_LENGTH: usize = 2;
pub const MAX_SPAWN_ATTEMPTS: usize = 32;
pub const SCOREBOARD_LIMIT: usize = 10;
pub const MAX_SCOREBOARD_LIMIT: usize = 50;
pub const MAX_CHAT_MESSAGE_LENGTH: usize = 200;
pub const PAUSED_NEED_PLAYERS: &str = "need players";
