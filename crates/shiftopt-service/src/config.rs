//! Service configuration loaded from environment variables.

use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Process-wide settings, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to bind the server to.
    pub host: String,
    pub port: u16,
    /// Default directive for the tracing subscriber.
    pub log_level: String,
    /// CORS origin allowlist.
    pub allowed_origins: Vec<String>,
    /// Hard cap on a single optimization run, in seconds.
    pub max_optimization_time: u64,
    pub max_shifts_per_optimization: usize,
    pub max_concurrent_optimizations: usize,
    pub ga_population: usize,
    pub ga_generations: usize,
    /// Per-request memory budget for solver formulations.
    pub max_memory_mb: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            host: "0.0.0.0".into(),
            port: 8000,
            log_level: "INFO".into(),
            allowed_origins: vec![
                "http://localhost:3000".into(),
                "http://localhost:3001".into(),
                "http://localhost:5173".into(),
            ],
            max_optimization_time: 300,
            max_shifts_per_optimization: 1000,
            max_concurrent_optimizations: 10,
            ga_population: 50,
            ga_generations: 100,
            max_memory_mb: 1024,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults above for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = ServiceConfig::default();
        Ok(ServiceConfig {
            host: env_or("HOST", &defaults.host),
            port: parsed_or("PORT", defaults.port)?,
            log_level: env_or("LOG_LEVEL", &defaults.log_level),
            allowed_origins: csv_or("ALLOWED_ORIGINS", &defaults.allowed_origins),
            max_optimization_time: parsed_or("MAX_OPTIMIZATION_TIME", defaults.max_optimization_time)?,
            max_shifts_per_optimization: parsed_or(
                "MAX_SHIFTS_PER_OPTIMIZATION",
                defaults.max_shifts_per_optimization,
            )?,
            max_concurrent_optimizations: parsed_or(
                "MAX_CONCURRENT_OPTIMIZATIONS",
                defaults.max_concurrent_optimizations,
            )?,
            ga_population: parsed_or("GA_POPULATION", defaults.ga_population)?,
            ga_generations: parsed_or("GA_GENERATIONS", defaults.ga_generations)?,
            max_memory_mb: parsed_or("MAX_MEMORY_MB", defaults.max_memory_mb)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn csv_or(name: &str, default: &[String]) -> Vec<String> {
    match env::var(name) {
        Ok(raw) => raw
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect(),
        Err(_) => default.to_vec(),
    }
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServiceConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.max_optimization_time, 300);
        assert_eq!(config.max_concurrent_optimizations, 10);
        assert_eq!(config.ga_population, 50);
        assert_eq!(config.ga_generations, 100);
        assert_eq!(config.max_memory_mb, 1024);
    }

    #[test]
    fn csv_parsing_trims_and_drops_empties() {
        std::env::set_var("SHIFTOPT_TEST_ORIGINS", "http://a.example, http://b.example,,");
        let parsed = csv_or("SHIFTOPT_TEST_ORIGINS", &[]);
        assert_eq!(parsed, vec!["http://a.example", "http://b.example"]);
        std::env::remove_var("SHIFTOPT_TEST_ORIGINS");
    }

    #[test]
    fn invalid_numbers_are_reported() {
        std::env::set_var("SHIFTOPT_TEST_PORT", "not-a-port");
        let result: Result<u16, _> = parsed_or("SHIFTOPT_TEST_PORT", 8000);
        assert!(result.is_err());
        std::env::remove_var("SHIFTOPT_TEST_PORT");
    }
}
