use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_environment")]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            environment: default_environment(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Extra origins allowed on top of the built-in defaults.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_standard_tier")]
    pub standard: RateLimitTier,
    #[serde(default = "default_strict_tier")]
    pub strict: RateLimitTier,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Procedures checked against the strict tier instead of the standard one.
    #[serde(default)]
    pub strict_procedures: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            standard: default_standard_tier(),
            strict: default_strict_tier(),
            sweep_interval_secs: default_sweep_interval(),
            strict_procedures: vec![],
        }
    }
}

impl RateLimitConfig {
    /// The tier that applies to `procedure`.
    pub fn tier_for(&self, procedure: &str) -> &RateLimitTier {
        if self.strict_procedures.iter().any(|p| p == procedure) {
            &self.strict
        } else {
            &self.standard
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitTier {
    pub max_requests: u32,
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// JSON array of student records.
    #[serde(default)]
    pub students_path: Option<PathBuf>,
    /// JSON array of civil war orphan records.
    #[serde(default)]
    pub civil_war_orphans_path: Option<PathBuf>,
}

// Default value helpers
fn default_listen() -> String {
    "0.0.0.0:3000".to_string()
}
fn default_environment() -> Environment {
    Environment::Production
}
fn default_window_ms() -> u64 {
    60_000
}
fn default_standard_tier() -> RateLimitTier {
    RateLimitTier {
        max_requests: 100,
        window_ms: default_window_ms(),
    }
}
fn default_strict_tier() -> RateLimitTier {
    RateLimitTier {
        max_requests: 20,
        window_ms: default_window_ms(),
    }
}
fn default_sweep_interval() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise start from defaults. Environment
    /// overrides are applied in both cases.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::load(path)?
        } else {
            tracing::warn!(path, "configuration file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `CORS_ORIGIN`, `APP_ENV` and `LISTEN_ADDR` from `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(origins) = lookup("CORS_ORIGIN") {
            self.cors.allowed_origins.extend(
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string),
            );
        }

        if let Some(env) = lookup("APP_ENV") {
            self.server.environment = if env.eq_ignore_ascii_case("development") {
                Environment::Development
            } else {
                Environment::Production
            };
        }

        if let Some(listen) = lookup("LISTEN_ADDR") {
            self.server.listen = listen;
        }
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.listen.trim().is_empty() {
            anyhow::bail!("server.listen must not be empty");
        }

        for (name, tier) in [
            ("standard", &self.rate_limit.standard),
            ("strict", &self.rate_limit.strict),
        ] {
            if tier.max_requests == 0 {
                anyhow::bail!("rate_limit.{}.max_requests must be at least 1", name);
            }
            if tier.window_ms == 0 {
                anyhow::bail!("rate_limit.{}.window_ms must be at least 1", name);
            }
        }

        if self.rate_limit.sweep_interval_secs == 0 {
            anyhow::bail!("rate_limit.sweep_interval_secs must be at least 1");
        }

        Ok(())
    }
}
