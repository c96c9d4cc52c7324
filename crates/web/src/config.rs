//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Profile
//! - `STOCKROOM_PROFILE` - `development` (default, alias `default`), `testing` or `production`
//!
//! ## Required in development and production
//! - `STOCKROOM_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Required in production
//! - `STOCKROOM_BASE_URL` - Public URL of the site
//! - `STOCKROOM_SESSION_SECRET` - Session cookie signing secret (min 64 chars, high entropy)
//!
//! ## Optional
//! - `STOCKROOM_HOST` - Bind address (default: 127.0.0.1)
//! - `STOCKROOM_PORT` - Listen port (default: 3000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment (default: profile name)
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.1 in production, 0.0 otherwise)
//!
//! In the `testing` profile the database URL is optional; without one the
//! application runs on in-memory stores.

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Minimum session secret length; the cookie signing key needs 64 bytes.
pub const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Named set of configuration defaults selected at process startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Profile {
    /// Local development against a real database.
    #[default]
    Development,
    /// Automated tests; memory stores unless a database URL is given.
    Testing,
    /// Deployed site; every secret must be provided.
    Production,
}

impl Profile {
    /// Profile name as used in `STOCKROOM_PROFILE`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Production => "production",
        }
    }

    /// Whether this is the production profile.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "default" => Ok(Self::Development),
            "testing" | "test" => Ok(Self::Testing),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ConfigError::InvalidEnvVar(
                "STOCKROOM_PROFILE".to_string(),
                format!("unknown profile '{other}'"),
            )),
        }
    }
}

/// Application configuration.
///
/// `Debug` is safe to log: secrets are `SecretString` and print redacted.
#[derive(Debug, Clone)]
pub struct StockroomConfig {
    /// Selected configuration profile
    pub profile: Profile,
    /// `PostgreSQL` connection URL (contains password); `None` selects memory stores
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the site
    pub base_url: String,
    /// Session cookie signing secret; `None` means a random key per process
    pub session_secret: Option<SecretString>,
    /// Throttle login and registration attempts per client IP
    pub rate_limit_auth: bool,
    /// Sentry error tracking configuration
    pub sentry: SentryConfig,
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    /// Sentry DSN; `None` disables Sentry
    pub dsn: Option<String>,
    /// Environment tag attached to events
    pub environment: String,
    /// Error event sample rate (0.0-1.0)
    pub sample_rate: f32,
    /// Performance transaction sample rate (0.0-1.0)
    pub traces_sample_rate: f32,
}

impl StockroomConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`StockroomConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let profile = env
            .optional("STOCKROOM_PROFILE")
            .map_or(Ok(Profile::default()), |value| value.parse())?;

        let database_url = env.database_url("STOCKROOM_DATABASE_URL");
        if database_url.is_none() && profile != Profile::Testing {
            return Err(ConfigError::MissingEnvVar(
                "STOCKROOM_DATABASE_URL".to_string(),
            ));
        }

        let host = env
            .or_default("STOCKROOM_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOCKROOM_HOST".to_string(), e.to_string())
            })?;
        let port = env.parsed("STOCKROOM_PORT", 3000_u16)?;

        let base_url = if profile.is_production() {
            env.required("STOCKROOM_BASE_URL")?
        } else {
            env.or_default("STOCKROOM_BASE_URL", &format!("http://localhost:{port}"))
        };
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("STOCKROOM_BASE_URL".to_string(), e.to_string())
        })?;

        let session_secret = match env.optional("STOCKROOM_SESSION_SECRET") {
            Some(value) => {
                let secret = validated_secret(value, "STOCKROOM_SESSION_SECRET")?;
                validate_session_secret(&secret, "STOCKROOM_SESSION_SECRET")?;
                Some(secret)
            }
            None if profile.is_production() => {
                return Err(ConfigError::MissingEnvVar(
                    "STOCKROOM_SESSION_SECRET".to_string(),
                ));
            }
            None => None,
        };

        let default_traces_rate = if profile.is_production() { 0.1 } else { 0.0 };
        let sentry = SentryConfig {
            dsn: env.optional("SENTRY_DSN"),
            environment: env.or_default("SENTRY_ENVIRONMENT", profile.as_str()),
            sample_rate: env.parsed("SENTRY_SAMPLE_RATE", 1.0_f32)?,
            traces_sample_rate: env.parsed("SENTRY_TRACES_SAMPLE_RATE", default_traces_rate)?,
        };

        Ok(Self {
            profile,
            database_url,
            host,
            port,
            base_url,
            session_secret,
            rate_limit_auth: profile != Profile::Testing,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies must be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable source wrapper with the typed accessors used above.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable, treating empty values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, using `default` when unset.
    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.optional(key).map_or(Ok(default), |value| {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Option<SecretString> {
        self.optional(primary_key)
            .or_else(|| self.optional("DATABASE_URL"))
            .map(SecretString::from)
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Validate a secret value and wrap it.
fn validated_secret(value: String, key: &str) -> Result<SecretString, ConfigError> {
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
