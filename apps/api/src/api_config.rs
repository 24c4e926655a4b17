use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use leadline_core::AppError;
use leadline_domain::{
    AuthRouteMap, DEFAULT_MAX_REDIRECTS_PER_WINDOW, DEFAULT_MIN_REPEAT_INTERVAL,
    DEFAULT_RESET_WINDOW, RedirectGuardPolicy, RoutePath,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_RECORD_TTL_SECONDS: u64 = 24 * 60 * 60;
const DEFAULT_PUBLIC_PATHS: &str = "/register,/forgot-password";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectGuardStoreConfig {
    InMemory,
    Redis,
    Postgres,
}

impl RedirectGuardStoreConfig {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InMemory => "memory",
            Self::Redis => "redis",
            Self::Postgres => "postgres",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStoreConfig {
    Memory,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub cookie_secure: bool,
    pub session_store: SessionStoreConfig,
    pub redirect_guard_store: RedirectGuardStoreConfig,
    pub redirect_guard_policy: RedirectGuardPolicy,
    pub redirect_guard_record_ttl_seconds: u64,
    pub route_map: AuthRouteMap,
    pub demo_auth_enabled: bool,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");
        Self::from_lookup(migrate_only, |name| env::var(name).ok())
    }

    pub fn from_lookup(
        migrate_only: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let database_url = non_empty("DATABASE_URL");
        let redis_url = non_empty("REDIS_URL");
        let frontend_url =
            non_empty("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".to_owned());

        let api_host = non_empty("API_HOST").unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = non_empty("API_PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);
        let cookie_secure = parse_flag(lookup("SESSION_COOKIE_SECURE"));
        let demo_auth_enabled = parse_flag(lookup("DEMO_AUTH_ENABLED"));

        let session_store = match non_empty("SESSION_STORE")
            .unwrap_or_else(|| "memory".to_owned())
            .as_str()
        {
            "memory" => SessionStoreConfig::Memory,
            "postgres" => SessionStoreConfig::Postgres,
            other => {
                return Err(AppError::Validation(format!(
                    "SESSION_STORE must be either 'memory' or 'postgres', got '{other}'"
                )));
            }
        };

        let redirect_guard_store = match non_empty("REDIRECT_GUARD_STORE")
            .unwrap_or_else(|| "memory".to_owned())
            .as_str()
        {
            "memory" => RedirectGuardStoreConfig::InMemory,
            "redis" => RedirectGuardStoreConfig::Redis,
            "postgres" => RedirectGuardStoreConfig::Postgres,
            other => {
                return Err(AppError::Validation(format!(
                    "REDIRECT_GUARD_STORE must be one of 'memory', 'redis' or 'postgres', got '{other}'"
                )));
            }
        };

        let needs_postgres = migrate_only
            || session_store == SessionStoreConfig::Postgres
            || redirect_guard_store == RedirectGuardStoreConfig::Postgres;
        if needs_postgres && database_url.is_none() {
            return Err(AppError::Validation(
                "DATABASE_URL is required when a postgres backend is configured".to_owned(),
            ));
        }

        if redirect_guard_store == RedirectGuardStoreConfig::Redis && redis_url.is_none() {
            return Err(AppError::Validation(
                "REDIS_URL is required when REDIRECT_GUARD_STORE=redis".to_owned(),
            ));
        }

        let reset_window = parse_millis(
            "REDIRECT_GUARD_RESET_WINDOW_MS",
            non_empty("REDIRECT_GUARD_RESET_WINDOW_MS"),
            DEFAULT_RESET_WINDOW,
        )?;
        let min_repeat_interval = parse_millis(
            "REDIRECT_GUARD_MIN_REPEAT_INTERVAL_MS",
            non_empty("REDIRECT_GUARD_MIN_REPEAT_INTERVAL_MS"),
            DEFAULT_MIN_REPEAT_INTERVAL,
        )?;
        let max_redirects_per_window = non_empty("REDIRECT_GUARD_MAX_REDIRECTS")
            .map(|value| {
                value.trim().parse::<u32>().map_err(|error| {
                    AppError::Validation(format!("invalid REDIRECT_GUARD_MAX_REDIRECTS: {error}"))
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_REDIRECTS_PER_WINDOW);
        let redirect_guard_policy =
            RedirectGuardPolicy::new(reset_window, min_repeat_interval, max_redirects_per_window)?;

        let login_path = parse_route(
            "LOGIN_PATH",
            non_empty("LOGIN_PATH").unwrap_or_else(|| "/login".to_owned()),
        )?;
        let dashboard_path = parse_route(
            "DASHBOARD_PATH",
            non_empty("DASHBOARD_PATH").unwrap_or_else(|| "/dashboard".to_owned()),
        )?;
        let public_paths = lookup("PUBLIC_PATHS")
            .unwrap_or_else(|| DEFAULT_PUBLIC_PATHS.to_owned())
            .split(',')
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| parse_route("PUBLIC_PATHS", value.to_owned()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            migrate_only,
            database_url,
            redis_url,
            frontend_url,
            api_host,
            api_port,
            cookie_secure,
            session_store,
            redirect_guard_store,
            redirect_guard_policy,
            redirect_guard_record_ttl_seconds: DEFAULT_RECORD_TTL_SECONDS,
            route_map: AuthRouteMap::new(login_path, dashboard_path, public_paths),
            demo_auth_enabled,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn parse_flag(value: Option<String>) -> bool {
    value.is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

fn parse_route(name: &str, value: String) -> Result<RoutePath, AppError> {
    RoutePath::new(value).map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))
}

fn parse_millis(
    name: &str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, AppError> {
    value
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))
        })
        .transpose()
        .map(|parsed| parsed.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use leadline_domain::RoutePath;

    use super::{ApiConfig, RedirectGuardStoreConfig, SessionStoreConfig};

    fn load(vars: &[(&str, &str)]) -> Result<ApiConfig, leadline_core::AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        ApiConfig::from_lookup(false, |name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_use_in_memory_backends() {
        let Ok(config) = load(&[]) else {
            panic!("defaults must load");
        };

        assert_eq!(config.session_store, SessionStoreConfig::Memory);
        assert_eq!(config.redirect_guard_store, RedirectGuardStoreConfig::InMemory);
        assert_eq!(config.api_port, 3001);
        assert!(!config.demo_auth_enabled);
        assert_eq!(
            config.redirect_guard_policy.reset_window(),
            Duration::from_millis(3_000)
        );
        assert_eq!(config.redirect_guard_policy.max_redirects_per_window(), 3);
    }

    #[test]
    fn guard_tunables_are_read_from_environment() {
        let Ok(config) = load(&[
            ("REDIRECT_GUARD_RESET_WINDOW_MS", "2000"),
            ("REDIRECT_GUARD_MIN_REPEAT_INTERVAL_MS", "250"),
            ("REDIRECT_GUARD_MAX_REDIRECTS", "4"),
            ("DEMO_AUTH_ENABLED", "TRUE"),
        ]) else {
            panic!("config must load");
        };

        let policy = config.redirect_guard_policy;
        assert_eq!(policy.reset_window(), Duration::from_millis(2_000));
        assert_eq!(policy.min_repeat_interval(), Duration::from_millis(250));
        assert_eq!(policy.max_redirects_per_window(), 4);
        assert!(config.demo_auth_enabled);
    }

    #[test]
    fn invalid_tunables_are_rejected() {
        assert!(load(&[("REDIRECT_GUARD_MAX_REDIRECTS", "0")]).is_err());
        assert!(load(&[("REDIRECT_GUARD_RESET_WINDOW_MS", "soon")]).is_err());
        assert!(load(&[("REDIRECT_GUARD_RESET_WINDOW_MS", "100")]).is_err());
    }

    #[test]
    fn backends_require_connection_urls() {
        assert!(load(&[("REDIRECT_GUARD_STORE", "redis")]).is_err());
        assert!(load(&[("REDIRECT_GUARD_STORE", "postgres")]).is_err());
        assert!(load(&[("SESSION_STORE", "postgres")]).is_err());
        assert!(load(&[("REDIRECT_GUARD_STORE", "sqlite")]).is_err());

        let config = load(&[
            ("REDIRECT_GUARD_STORE", "redis"),
            ("REDIS_URL", "redis://127.0.0.1:6379"),
        ]);
        assert!(config.is_ok());
    }

    #[test]
    fn route_map_is_configurable() {
        let Ok(config) = load(&[
            ("LOGIN_PATH", "/sign-in"),
            ("DASHBOARD_PATH", "/home"),
            ("PUBLIC_PATHS", "/pricing, /about"),
        ]) else {
            panic!("config must load");
        };

        let Ok(pricing) = RoutePath::new("/pricing/enterprise") else {
            panic!("route must be valid");
        };
        assert_eq!(config.route_map.login_path().as_str(), "/sign-in");
        assert_eq!(config.route_map.dashboard_path().as_str(), "/home");
        assert!(config.route_map.is_public(&pricing));

        assert!(load(&[("LOGIN_PATH", "sign-in")]).is_err());
    }

    #[test]
    fn socket_address_rejects_invalid_host() {
        let Ok(config) = load(&[("API_HOST", "not-an-ip")]) else {
            panic!("config must load");
        };
        assert!(config.socket_address().is_err());
    }
}
