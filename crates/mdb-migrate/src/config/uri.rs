//! Destination URI parsing.
//!
//! Maps a user-facing URI onto a backend and the connection string SQLx
//! expects for it.

use std::fmt;

use url::Url;

use crate::core::traits::Dialect;
use crate::drivers::Backend;
use crate::error::{MigrateError, Result};

/// Value reported to PostgreSQL as `application_name`.
const APPLICATION_NAME: &str = concat!(env!("CARGO_PKG_NAME"), "(", env!("CARGO_PKG_VERSION"), ")");

/// A parsed destination.
#[derive(Clone)]
pub struct Destination {
    /// URI as given by the user.
    pub uri: String,
    /// Backend selected from the scheme.
    pub backend: Backend,
    /// Connection string handed to the driver.
    pub dsn: String,
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destination")
            .field("uri", &redact(&self.uri))
            .field("backend", &self.backend.name())
            .field("dsn", &redact(&self.dsn))
            .finish()
    }
}

impl Destination {
    /// Parse a destination URI.
    ///
    /// - `pg`, `postgres`, `postgresql`: PostgreSQL, tagged with `application_name`
    /// - `mysql`, `mariadb`: MySQL
    /// - `sqlite`, `sqlite3`: SQLite file; the path is required and the query
    ///   string is kept verbatim
    pub fn parse(uri: &str) -> Result<Self> {
        let mut url = Url::parse(uri)
            .map_err(|_| MigrateError::Config(format!("invalid destination uri {:?}", uri)))?;
        let backend = Backend::from_scheme(url.scheme())?;

        let dsn = match backend {
            Backend::Postgres(_) => {
                set_scheme(&mut url, "postgres", uri)?;
                let pairs: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(key, _)| key != "application_name")
                    .map(|(key, value)| (key.into_owned(), value.into_owned()))
                    .collect();
                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(pairs)
                    .append_pair("application_name", APPLICATION_NAME);
                url.to_string()
            }
            Backend::Mysql(_) => {
                set_scheme(&mut url, "mysql", uri)?;
                url.to_string()
            }
            Backend::Sqlite(_) => {
                let path = url.path();
                if path.is_empty() {
                    return Err(MigrateError::Config(
                        "sqlite destination requires a file name".into(),
                    ));
                }
                match url.query() {
                    Some(query) => format!("sqlite://{}?{}", path, query),
                    None => format!("sqlite://{}", path),
                }
            }
        };

        Ok(Self {
            uri: uri.to_string(),
            backend,
            dsn,
        })
    }

    /// The user's URI with any password masked, for logging.
    pub fn redacted(&self) -> String {
        redact(&self.uri)
    }
}

fn set_scheme(url: &mut Url, scheme: &str, uri: &str) -> Result<()> {
    url.set_scheme(scheme)
        .map_err(|_| MigrateError::Config(format!("invalid destination uri {:?}", uri)))
}

fn redact(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(mut url) if url.password().is_some() => {
            // Only fails for cannot-be-a-base URLs, which carry no password
            let _ = url.set_password(Some("[REDACTED]"));
            url.to_string()
        }
        _ => uri.to_string(),
    }
}
