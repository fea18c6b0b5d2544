//! Store configuration

use std::path::PathBuf;
use std::time::Duration;

use salvo_core::http::cookie::time::{Duration as CookieDuration, OffsetDateTime};
use salvo_core::http::cookie::{self, Cookie};

use crate::error::SessionError;

/// Default database file path
pub const DEFAULT_DB_PATH: &str = "./sessions.db";

/// Default bucket (table) name
pub const DEFAULT_BUCKET_NAME: &str = "sessions";

/// Default cookie path
pub const DEFAULT_COOKIE_PATH: &str = "/";

/// Default max age: 30 days
pub const DEFAULT_MAX_AGE: i64 = 60 * 60 * 24 * 30;

/// Configuration for the session store.
///
/// Zero-valued fields (empty strings, a max age of `0`) are replaced with
/// their defaults when the store is constructed.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Database options
    pub db_options: DbOptions,

    /// Default cookie options copied into every new session
    pub session_options: SessionOptions,
}

/// Where the session database lives
#[derive(Clone, Debug, Default)]
pub struct DbOptions {
    /// Path of the database file (default: "./sessions.db")
    pub path: PathBuf,

    /// Name of the bucket holding session records (default: "sessions")
    pub bucket_name: String,
}

/// Cookie options carried by each session
#[derive(Clone, Debug, PartialEq)]
pub struct SessionOptions {
    /// Max age in seconds.
    /// `0` means a browser-session cookie and a record that never expires,
    /// a negative value deletes the session on save.
    pub max_age: i64,

    /// Cookie path (default: "/")
    pub path: String,

    /// Cookie domain (default: None - current domain only)
    pub domain: Option<String>,

    /// Secure flag for cookie (default: false)
    pub secure: bool,

    /// HttpOnly flag for cookie (default: true)
    pub http_only: bool,

    /// SameSite attribute for cookie (default: None - attribute omitted)
    pub same_site: Option<SameSite>,
}

/// SameSite cookie attribute
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SameSite {
    /// Strict - cookie only sent for same-site requests
    Strict,
    /// Lax - cookie sent for same-site requests and top-level navigations
    Lax,
    /// None - cookie sent for all requests (requires Secure)
    None,
}

impl From<SameSite> for cookie::SameSite {
    fn from(same_site: SameSite) -> Self {
        match same_site {
            SameSite::Strict => cookie::SameSite::Strict,
            SameSite::Lax => cookie::SameSite::Lax,
            SameSite::None => cookie::SameSite::None,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_age: 0,
            path: String::new(),
            domain: None,
            secure: false,
            http_only: true,
            same_site: None,
        }
    }
}

impl Config {
    /// Create a configuration for the database at `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            db_options: DbOptions {
                path: path.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Set the database file path (default: "./sessions.db")
    pub fn with_db_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.db_options.path = path.into();
        self
    }

    /// Set the bucket name (default: "sessions")
    pub fn with_bucket_name<S: Into<String>>(mut self, name: S) -> Self {
        self.db_options.bucket_name = name.into();
        self
    }

    /// Set max age in seconds (default: 30 days)
    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.session_options.max_age = max_age;
        self
    }

    /// Set max age from Duration, saturating at `i64::MAX` seconds
    pub fn with_max_age_duration(mut self, duration: Duration) -> Self {
        self.session_options.max_age = i64::try_from(duration.as_secs()).unwrap_or(i64::MAX);
        self
    }

    /// Set the cookie path (default: "/")
    pub fn with_cookie_path<S: Into<String>>(mut self, path: S) -> Self {
        self.session_options.path = path.into();
        self
    }

    /// Set the cookie domain
    pub fn with_cookie_domain<S: Into<String>>(mut self, domain: S) -> Self {
        self.session_options.domain = Some(domain.into());
        self
    }

    /// Set the Secure flag (default: false)
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.session_options.secure = secure;
        self
    }

    /// Set the HttpOnly flag (default: true)
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.session_options.http_only = http_only;
        self
    }

    /// Set the SameSite attribute
    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.session_options.same_site = Some(same_site);
        self
    }

    /// Replace zero-valued fields with their defaults
    pub(crate) fn apply_defaults(&mut self) {
        if self.db_options.path.as_os_str().is_empty() {
            self.db_options.path = PathBuf::from(DEFAULT_DB_PATH);
        }
        if self.db_options.bucket_name.is_empty() {
            self.db_options.bucket_name = DEFAULT_BUCKET_NAME.to_string();
        }
        if self.session_options.path.is_empty() {
            self.session_options.path = DEFAULT_COOKIE_PATH.to_string();
        }
        if self.session_options.max_age == 0 {
            self.session_options.max_age = DEFAULT_MAX_AGE;
        }
    }

    /// Reject option combinations browsers or the store cannot honor
    pub(crate) fn validate(&self) -> Result<(), SessionError> {
        if self.session_options.same_site == Some(SameSite::None) && !self.session_options.secure {
            return Err(SessionError::Config(
                "SameSite=None requires the Secure flag".to_string(),
            ));
        }
        let max_age = self.session_options.max_age;
        if max_age > 0 && cookie_expiry(max_age).is_none() {
            return Err(SessionError::Config(format!(
                "max age of {} seconds is past the latest cookie expiry date",
                max_age
            )));
        }
        if self.db_options.path.is_dir() {
            return Err(SessionError::Config(format!(
                "database path {} is a directory",
                self.db_options.path.display()
            )));
        }
        Ok(())
    }
}

impl SessionOptions {
    /// Build a cookie carrying `value` with these options applied
    pub(crate) fn build_cookie(&self, name: &str, value: String) -> Cookie<'static> {
        let mut builder = Cookie::build((name.to_string(), value))
            .path(self.path.clone())
            .http_only(self.http_only)
            .secure(self.secure);

        if let Some(domain) = self.domain.clone() {
            builder = builder.domain(domain);
        }

        if let Some(same_site) = self.same_site {
            builder = builder.same_site(same_site.into());
        }

        if self.max_age > 0 {
            builder = builder.max_age(CookieDuration::seconds(self.max_age));
            // Past year 9999 only Max-Age is sent.
            if let Some(expires) = cookie_expiry(self.max_age) {
                builder = builder.expires(expires);
            }
        } else if self.max_age < 0 {
            builder = builder
                .max_age(CookieDuration::seconds(self.max_age))
                .expires(OffsetDateTime::UNIX_EPOCH);
        }

        builder.build()
    }
}

fn cookie_expiry(max_age: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::now_utc().checked_add(CookieDuration::seconds(max_age))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_zero_values() {
        let mut config = Config::default();
        config.apply_defaults();

        assert_eq!(config.db_options.path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.db_options.bucket_name, "sessions");
        assert_eq!(config.session_options.path, "/");
        assert_eq!(config.session_options.max_age, DEFAULT_MAX_AGE);
        assert!(config.session_options.http_only);
    }

    #[test]
    fn test_explicit_values_survive_defaults() {
        let mut config = Config::new("/tmp/app.db")
            .with_bucket_name("app")
            .with_max_age(3600)
            .with_cookie_path("/app");
        config.apply_defaults();

        assert_eq!(config.db_options.bucket_name, "app");
        assert_eq!(config.session_options.max_age, 3600);
        assert_eq!(config.session_options.path, "/app");
    }

    #[test]
    fn test_same_site_none_requires_secure() {
        let config = Config::new("x.db").with_same_site(SameSite::None);
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));

        let config = config.with_secure(true);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unrepresentable_max_age_is_rejected() {
        let config = Config::new("x.db").with_max_age(1_000_000_000_000);
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));

        let config = Config::new("x.db").with_max_age(86400 * 365 * 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_age_duration_saturates() {
        let config = Config::new("x.db").with_max_age_duration(Duration::from_secs(90));
        assert_eq!(config.session_options.max_age, 90);

        let config = Config::new("x.db").with_max_age_duration(Duration::from_secs(u64::MAX));
        assert_eq!(config.session_options.max_age, i64::MAX);
        assert!(matches!(config.validate(), Err(SessionError::Config(_))));
    }

    #[test]
    fn test_build_cookie_attributes() {
        let options = SessionOptions {
            max_age: 60,
            path: "/".to_string(),
            domain: Some("example.com".to_string()),
            secure: true,
            http_only: true,
            same_site: Some(SameSite::Lax),
        };
        let cookie = options.build_cookie("app", "token".to_string());

        assert_eq!(cookie.name(), "app");
        assert_eq!(cookie.value(), "token");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.domain(), Some("example.com"));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(cookie::SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(CookieDuration::seconds(60)));
        assert!(cookie.expires().is_some());
    }

    #[test]
    fn test_build_cookie_huge_max_age() {
        let options = SessionOptions {
            max_age: 1_000_000_000_000,
            path: "/".to_string(),
            ..Default::default()
        };
        let cookie = options.build_cookie("app", "v".to_string());

        assert_eq!(cookie.max_age(), Some(CookieDuration::seconds(1_000_000_000_000)));
        assert!(cookie.expires().is_none());
    }

    #[test]
    fn test_build_cookie_negative_max_age() {
        let options = SessionOptions {
            max_age: -1,
            path: "/".to_string(),
            ..Default::default()
        };
        let cookie = options.build_cookie("app", String::new());

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(CookieDuration::seconds(-1)));
    }

    #[test]
    fn test_build_cookie_without_max_age() {
        let options = SessionOptions {
            path: "/".to_string(),
            ..Default::default()
        };
        let cookie = options.build_cookie("app", "v".to_string());
        assert_eq!(cookie.max_age(), None);
    }
}
