use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub onboarding: OnboardingConfig,
    pub mail: MailConfig,
    pub bootstrap: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Public base URL used when building magic links
    pub app_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string; the in-memory store is used when absent
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
    pub allow_signup: bool,
    pub require_email_verification: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingConfig {
    pub invite_expiry_hours: u64,
    pub code_expiry_minutes: u64,
    pub code_max_attempts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub from_address: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in {0:?}")]
    MissingJwtSecret(Environment),
    #[error("Invalid APP_URL '{0}'")]
    InvalidAppUrl(String),
    #[error("SECURITY_BCRYPT_COST must be between 4 and 31, got {0}")]
    InvalidBcryptCost(u32),
}

/// Secret used when no JWT_SECRET is configured outside production
const DEVELOPMENT_JWT_SECRET: &str = "churchflow-development-secret";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Some(v) = env::var("PORT").ok().or_else(|| env::var("CHURCHFLOW_PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Some(v) = env::var("APP_URL").ok().or_else(|| env::var("NEXT_PUBLIC_APP_URL").ok()) {
            self.server.app_url = v.trim_end_matches('/').to_string();
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_SECURE") {
            self.security.cookie_secure = v.parse().unwrap_or(self.security.cookie_secure);
        }
        if let Ok(v) = env::var("SECURITY_BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }
        if let Ok(v) = env::var("SECURITY_ALLOW_SIGNUP") {
            self.security.allow_signup = v.parse().unwrap_or(self.security.allow_signup);
        }
        if let Ok(v) = env::var("SECURITY_REQUIRE_EMAIL_VERIFICATION") {
            self.security.require_email_verification =
                v.parse().unwrap_or(self.security.require_email_verification);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Onboarding overrides
        if let Ok(v) = env::var("INVITE_EXPIRY_HOURS") {
            self.onboarding.invite_expiry_hours = v.parse().unwrap_or(self.onboarding.invite_expiry_hours);
        }
        if let Ok(v) = env::var("CODE_EXPIRY_MINUTES") {
            self.onboarding.code_expiry_minutes = v.parse().unwrap_or(self.onboarding.code_expiry_minutes);
        }
        if let Ok(v) = env::var("CODE_MAX_ATTEMPTS") {
            self.onboarding.code_max_attempts = v.parse().unwrap_or(self.onboarding.code_max_attempts);
        }

        // Mail overrides
        if let Some(v) = env::var("MAIL_FROM").ok().or_else(|| env::var("SENDGRID_FROM_EMAIL").ok()) {
            self.mail.from_address = v;
        }
        if let Ok(v) = env::var("MAIL_FROM_NAME") {
            self.mail.from_name = v;
        }

        // Bootstrap admin (both email and password required)
        if let (Ok(email), Ok(password)) = (
            env::var("BOOTSTRAP_ADMIN_EMAIL"),
            env::var("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            let name = env::var("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|_| "Super Admin".to_string());
            self.bootstrap = Some(BootstrapAdmin { email, password, name });
        }

        self
    }

    /// Reject configurations that cannot run safely
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret(self.environment));
        }
        if self.environment == Environment::Production
            && self.security.jwt_secret == DEVELOPMENT_JWT_SECRET
        {
            return Err(ConfigError::MissingJwtSecret(self.environment));
        }
        if url::Url::parse(&self.server.app_url).is_err() {
            return Err(ConfigError::InvalidAppUrl(self.server.app_url.clone()));
        }
        if !(4..=31).contains(&self.security.bcrypt_cost) {
            return Err(ConfigError::InvalidBcryptCost(self.security.bcrypt_cost));
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                app_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7, // matches the 7-day auth cookie
                cookie_secure: false,
                bcrypt_cost: 10,
                allow_signup: true,
                require_email_verification: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            onboarding: OnboardingConfig {
                invite_expiry_hours: 72,
                code_expiry_minutes: 15,
                code_max_attempts: 5,
            },
            mail: MailConfig {
                from_address: "noreply@localhost".to_string(),
                from_name: "ChurchFlow".to_string(),
            },
            bootstrap: None,
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 3000,
                app_url: "https://staging.churchflow.app".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7,
                cookie_secure: true,
                bcrypt_cost: 12,
                allow_signup: true,
                require_email_verification: true,
                cors_origins: vec!["https://staging.churchflow.app".to_string()],
            },
            onboarding: OnboardingConfig {
                invite_expiry_hours: 72,
                code_expiry_minutes: 15,
                code_max_attempts: 5,
            },
            mail: MailConfig {
                from_address: "noreply@churchflow.app".to_string(),
                from_name: "ChurchFlow (staging)".to_string(),
            },
            bootstrap: None,
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 3000,
                app_url: "https://churchflow.app".to_string(),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7,
                cookie_secure: true,
                bcrypt_cost: 12,
                allow_signup: false,
                require_email_verification: true,
                cors_origins: vec!["https://churchflow.app".to_string()],
            },
            onboarding: OnboardingConfig {
                invite_expiry_hours: 48,
                code_expiry_minutes: 10,
                code_max_attempts: 5,
            },
            mail: MailConfig {
                from_address: "noreply@churchflow.app".to_string(),
                from_name: "ChurchFlow".to_string(),
            },
            bootstrap: None,
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
