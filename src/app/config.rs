use crate::game::constants::{
    GRID_HEIGHT, GRID_WIDTH, RESTART_DELAY_MS, SCOREBOARD_LIMIT, START_GRACE_MS, TICK_MS,
};
use crate::game::engine::EngineSettings;
use crate::game::scoreboard::clamp_limit;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub grid_width: i32,
    pub grid_height: i32,
    pub tick_ms: u64,
    pub restart_delay_ms: i64,
    pub start_grace_ms: i64,
    pub scoreboard_limit: usize,
    pub self_collision: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing or unparseable values
    /// fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(default_database_url);

        Self {
            port: parse_or(&lookup, "PORT", 3000),
            database_url,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5u32).max(1),
            grid_width: parse_or(&lookup, "GRID_WIDTH", GRID_WIDTH).max(1),
            grid_height: parse_or(&lookup, "GRID_HEIGHT", GRID_HEIGHT).max(1),
            tick_ms: parse_or(&lookup, "TICK_MS", TICK_MS).max(1),
            restart_delay_ms: parse_or(&lookup, "RESTART_DELAY_MS", RESTART_DELAY_MS).max(0),
            start_grace_ms: parse_or(&lookup, "START_GRACE_MS", START_GRACE_MS).max(0),
            scoreboard_limit: clamp_limit(parse_or(&lookup, "SCOREBOARD_LIMIT", SCOREBOARD_LIMIT)),
            self_collision: lookup("SELF_COLLISION")
                .map(|value| matches!(value.trim(), "1" | "true" | "TRUE"))
                .unwrap_or(false),
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            grid_width: self.grid_width,
            grid_height: self.grid_height,
            restart_delay_ms: self.restart_delay_ms,
            start_grace_ms: self.start_grace_ms,
            self_collision: self.self_collision,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn default_database_url() -> String {
    let base = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let default_path = base.join("data").join("game.db");
    format!("sqlite://{}", default_path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| values.get(key).cloned())
    }

    #[test]
    fn defaults_match_the_reference_arena() {
        let config = config_from(&[]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.grid_width, 40);
        assert_eq!(config.grid_height, 30);
        assert_eq!(config.tick_period(), Duration::from_millis(100));
        assert_eq!(config.restart_delay_ms, 3000);
        assert_eq!(config.scoreboard_limit, 10);
        assert!(!config.self_collision);
        assert!(config.database_url.starts_with("sqlite://"));
        assert!(config.database_url.ends_with("game.db"));
    }

    #[test]
    fn overrides_are_parsed_and_bad_values_ignored() {
        let config = config_from(&[
            ("PORT", "8080"),
            ("GRID_WIDTH", "-3"),
            ("GRID_HEIGHT", "abc"),
            ("TICK_MS", "50"),
            ("SCOREBOARD_LIMIT", "500"),
            ("SELF_COLLISION", "true"),
            ("DATABASE_URL", "sqlite::memory:"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.grid_width, 1);
        assert_eq!(config.grid_height, 30);
        assert_eq!(config.tick_ms, 50);
        assert_eq!(config.scoreboard_limit, 50);
        assert!(config.self_collision);
        assert_eq!(config.database_url, "sqlite::memory:");

        let settings = config.engine_settings();
        assert!(settings.self_collision);
        assert_eq!(settings.grid_width, 1);
    }
}
