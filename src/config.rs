use std::env;

use serde::Deserialize;

pub const DEFAULT_MORALIS_BASE_URL: &str = "https://deep-index.moralis.io/api/v2.2";
const DEFAULT_ALLOWED_HOST: &str = "portfolio-tracker-api-173r.onrender.com";
const DEFAULT_FRONTEND_DOMAIN: &str = "icd-frontend-five.vercel.app";
const DEV_DATABASE_URL: &str = "sqlite://db.sqlite3?mode=rwc";
const DEV_JWT_SECRET: &str = "insecure-dev-secret";

/// Local frontends that are always allowed to call the API.
const LOCAL_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:3000"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub debug: bool,
    pub database_url: String,
    pub moralis_api_key: String,
    pub moralis_base_url: String,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Host header values the server answers to. Empty means any host.
    pub allowed_hosts: Vec<String>,
    /// CORS origins. Empty means any origin.
    pub allowed_origins: Vec<String>,
    /// Emit HSTS, nosniff and frame-deny headers.
    pub secure: bool,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::dotenv().ok();

        let environment = match
            env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()).to_lowercase().as_str()
        {
            "production" | "prod" => Environment::Production,
            "development" | "dev" | "" => Environment::Development,
            other => {
                return Err(
                    format!("APP_ENV must be 'development' or 'production', got '{}'", other).into()
                );
            }
        };

        Self::build(environment, |key| env::var(key).ok())
    }

    /// Build a profile from an arbitrary variable source.
    pub fn build<F>(environment: Environment, var: F) -> Result<Self, Box<dyn std::error::Error>>
        where F: Fn(&str) -> Option<String>
    {
        let server_host = var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = var("SERVER_PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse()?;
        let moralis_base_url = var("MORALIS_BASE_URL")
            .unwrap_or_else(|| DEFAULT_MORALIS_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let token_ttl_hours = var("TOKEN_TTL_HOURS")
            .unwrap_or_else(|| "24".to_string())
            .parse()?;

        let config = match environment {
            Environment::Development =>
                Config {
                    environment,
                    debug: true,
                    database_url: var("DATABASE_URL").unwrap_or_else(|| DEV_DATABASE_URL.to_string()),
                    moralis_api_key: var("MORALIS_API_KEY").unwrap_or_default(),
                    moralis_base_url,
                    jwt_secret: var("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
                    token_ttl_hours,
                    allowed_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
                    allowed_origins: Vec::new(),
                    secure: false,
                    server_host,
                    server_port,
                },
            Environment::Production => {
                let database_url = var("DATABASE_URL").ok_or("DATABASE_URL must be set in production")?;
                let moralis_api_key = var("MORALIS_API_KEY").ok_or(
                    "MORALIS_API_KEY must be set in production"
                )?;
                let jwt_secret = var("JWT_SECRET").ok_or("JWT_SECRET must be set in production")?;

                let allowed_host = var("ALLOWED_HOST").unwrap_or_else(||
                    DEFAULT_ALLOWED_HOST.to_string()
                );
                let frontend_domain = var("FRONTEND_DOMAIN").unwrap_or_else(||
                    DEFAULT_FRONTEND_DOMAIN.to_string()
                );

                let mut allowed_origins = vec![normalize_origin(&frontend_domain)];
                allowed_origins.extend(LOCAL_ORIGINS.iter().map(|o| o.to_string()));

                Config {
                    environment,
                    debug: false,
                    database_url,
                    moralis_api_key,
                    moralis_base_url,
                    jwt_secret,
                    token_ttl_hours,
                    allowed_hosts: vec![host_only(&allowed_host)],
                    allowed_origins,
                    secure: true,
                    server_host,
                    server_port,
                }
            }
        };

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment, Environment::Production)
    }

    /// Whether a request's Host header (port included or not) is served.
    pub fn is_host_allowed(&self, host: &str) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }
        let host = host.rsplit_once(':').map_or(host, |(name, port)| {
            if port.chars().all(|c| c.is_ascii_digit()) { name } else { host }
        });
        self.allowed_hosts.iter().any(|allowed| allowed.eq_ignore_ascii_case(host))
    }
}

/// Turn a bare domain or URL into a CORS origin: `https://` is assumed and
/// trailing slashes are dropped.
pub fn normalize_origin(domain: &str) -> String {
    let domain = domain.trim().trim_end_matches('/');
    if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

/// Strip scheme and trailing slashes so an env value can be compared to a Host header.
fn host_only(value: &str) -> String {
    let value = value.trim().trim_end_matches('/');
    value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .unwrap_or(value)
        .to_string()
}
