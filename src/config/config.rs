use std::env;

use once_cell::sync::Lazy;

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);

pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub game: GameConfig,
}

pub struct ServerConfig {
    pub port: u16,
    pub mode: String,
    pub allowed_origin: Option<String>,
}

pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub sslmode: String,
}

pub struct GameConfig {
    pub max_players: i32,
    pub round_time: i32,
    pub max_rounds: i32,
    pub round_gap_seconds: u64,
    pub disconnect_grace_seconds: u64,
    pub idle_room_timeout_seconds: i64,
    pub cleanup_interval_seconds: u64,
}

impl Config {
    fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: get_env_parsed("PORT", 8080),
                mode: get_env("SERVER_MODE", "development"),
                allowed_origin: env::var("ALLOWED_ORIGIN").ok().filter(|o| o != "*"),
            },
            database: DatabaseConfig {
                host: get_env("DB_HOST", "localhost"),
                port: get_env_parsed("DB_PORT", 5432),
                user: get_env("DB_USER", "postgres"),
                password: get_env("DB_PASSWORD", "postgres"),
                name: get_env("DB_NAME", "quizhub"),
                sslmode: get_env("DB_SSLMODE", "disable"),
            },
            game: GameConfig {
                max_players: get_env_parsed("MAX_PLAYERS", 10),
                round_time: get_env_parsed("ROUND_TIME", 30),
                max_rounds: get_env_parsed("MAX_ROUNDS", 5),
                round_gap_seconds: get_env_parsed("ROUND_GAP_SECONDS", 5),
                disconnect_grace_seconds: get_env_parsed("DISCONNECT_GRACE_SECONDS", 300),
                idle_room_timeout_seconds: get_env_parsed("IDLE_ROOM_TIMEOUT_SECONDS", 600),
                cleanup_interval_seconds: get_env_parsed("CLEANUP_INTERVAL_SECONDS", 60),
            },
        }
    }

    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.database.user,
            self.database.password,
            self.database.host,
            self.database.port,
            self.database.name,
            self.database.sslmode,
        )
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
