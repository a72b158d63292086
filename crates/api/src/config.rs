//! Environment configuration, read once at startup.

/// Process configuration.
///
/// Absent `database_url`/`redis_url` select the in-memory store/queue
/// (dev mode). An absent `gemini_api_key` is fatal for the worker path
/// only: the HTTP server still runs, the triage consumer does not start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub gemini_api_key: Option<String>,
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env_opt("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        // Either a full URL or host+port pieces, URL winning.
        let redis_url = env_opt("REDIS_URL").or_else(|| {
            env_opt("REDIS_HOST").map(|host| {
                let port = env_opt("REDIS_PORT").unwrap_or_else(|| "6379".to_string());
                format!("redis://{host}:{port}")
            })
        });

        Self {
            port,
            database_url: env_opt("DATABASE_URL"),
            redis_url,
            gemini_api_key: env_opt("GEMINI_API_KEY"),
        }
    }
}
