use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    dotenv().ok(); // Load .env file if present
    Config::from_env()
});

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub static_dir: String,
    pub mongo_uri: Option<String>,
    pub mongo_db_name: String,
    pub news: NewsConfig,
    pub aries_ai_enabled: bool,
}

#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub language: String,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            port: parse_env_or_default("PORT", 3000),
            static_dir: get_env_or_default("STATIC_DIR", "static"),
            mongo_uri: get_env_opt("MONGODB_URI"),
            mongo_db_name: get_env_or_default("MONGO_DB_NAME", "braver"),
            news: NewsConfig {
                api_key: get_env_opt("NEWS_API_KEY"),
                base_url: get_env_or_default("NEWS_API_URL", "https://newsapi.org"),
                language: get_env_or_default("NEWS_LANGUAGE", "tr"),
                timeout: Duration::from_secs(parse_env_or_default("NEWS_TIMEOUT_SECS", 5)),
            },
            aries_ai_enabled: parse_env_or_default("ARIES_AI_ENABLED", true),
        }
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        NewsConfig {
            api_key: None,
            base_url: "https://newsapi.org".to_string(),
            language: "tr".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

fn get_env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or_default<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("invalid value for {key}: {raw:?}, using default");
            default
        }),
        Err(_) => default,
    }
}
