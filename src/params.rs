//! Runtime parameters.
//!
//! Databases are declared through environment variables (a `.env` file is loaded
//! by the binary): `MODELKIT_DATABASE_URL` declares the `default` database and
//! `MODELKIT_DATABASE_URL_<NAME>` declares the logical database `<name>`.
//! Pool tunables are read once through [`load_configurables_from_env`].

use std::{collections::BTreeMap, env, fmt::Display, str::FromStr, sync::OnceLock};

use log::warn;

use crate::repo;

pub const ENV_DATABASE_URL: &str = "MODELKIT_DATABASE_URL";
pub const ENV_MAX_CONNECTIONS: &str = "MODELKIT_MAX_CONNECTIONS";
pub const ENV_CREATE_IF_MISSING: &str = "MODELKIT_CREATE_IF_MISSING";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing environment variable `{0}`")]
    MissingVar(String),
    #[error("bad value for `{name}` :: {msg}")]
    BadValue { name: String, msg: String },
}

/// Tunables shared by every configured database.
#[derive(Debug, Clone)]
pub struct Configurables {
    pub max_connections: u32,
    pub create_if_missing: bool,
}

impl Default for Configurables {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            create_if_missing: false,
        }
    }
}

static CONFIGURABLES: OnceLock<Configurables> = OnceLock::new();

/// Reads the tunables from the environment. Unparsable values are reported and
/// replaced by their default. Only the first call has effect.
pub fn load_configurables_from_env() {
    let defaults = Configurables::default();
    let loaded = Configurables {
        max_connections: optional_env_var(ENV_MAX_CONNECTIONS, defaults.max_connections),
        create_if_missing: optional_env_var(ENV_CREATE_IF_MISSING, defaults.create_if_missing),
    };
    let _ = CONFIGURABLES.set(loaded);
}

pub fn configurables() -> &'static Configurables {
    CONFIGURABLES.get_or_init(Configurables::default)
}

pub fn require_env_var<T>(name: &str) -> Result<T, Error>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = env::var(name).map_err(|_| Error::MissingVar(name.to_string()))?;
    raw.parse().map_err(|e: T::Err| Error::BadValue {
        name: name.to_string(),
        msg: e.to_string(),
    })
}

fn optional_env_var<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match require_env_var(name) {
        Ok(v) => v,
        Err(Error::MissingVar(_)) => default,
        Err(err) => {
            warn!("{err}, using default");
            default
        }
    }
}

/// Maps an environment variable name to the logical database it declares, if any.
fn database_name_from_var(var: &str) -> Option<String> {
    if var == ENV_DATABASE_URL {
        return Some(repo::DEFAULT_DATABASE.to_string());
    }

    var.strip_prefix(ENV_DATABASE_URL)
        .and_then(|rest| rest.strip_prefix('_'))
        .filter(|name| !name.is_empty())
        .map(str::to_lowercase)
}

/// Collects the database urls declared in the environment, keyed by logical name.
pub fn database_urls_from_env() -> Result<BTreeMap<String, url::Url>, Error> {
    database_urls(env::vars())
}

fn database_urls(
    vars: impl Iterator<Item = (String, String)>,
) -> Result<BTreeMap<String, url::Url>, Error> {
    let mut urls = BTreeMap::new();
    for (var, value) in vars {
        if let Some(name) = database_name_from_var(&var) {
            let url = value.parse().map_err(|e: url::ParseError| Error::BadValue {
                name: var.clone(),
                msg: e.to_string(),
            })?;
            urls.insert(name, url);
        }
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_names() {
        assert_eq!(
            database_name_from_var("MODELKIT_DATABASE_URL").as_deref(),
            Some("default")
        );
        assert_eq!(
            database_name_from_var("MODELKIT_DATABASE_URL_REPORTS").as_deref(),
            Some("reports")
        );
        assert_eq!(database_name_from_var("MODELKIT_DATABASE_URL_"), None);
        assert_eq!(database_name_from_var("MODELKIT_DATABASE_URLX"), None);
        assert_eq!(database_name_from_var("DATABASE_URL"), None);
    }

    #[test]
    fn collect_urls() {
        let vars = vec![
            ("MODELKIT_DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
            (
                "MODELKIT_DATABASE_URL_ARCHIVE".to_string(),
                "sqlite:///tmp/archive.db".to_string(),
            ),
            ("HOME".to_string(), "/root".to_string()),
        ];

        let urls = database_urls(vars.into_iter()).expect("valid urls");
        assert_eq!(urls.len(), 2);
        assert_eq!(urls["default"].as_str(), "sqlite::memory:");
        assert_eq!(urls["archive"].path(), "/tmp/archive.db");
    }

    #[test]
    fn bad_url() {
        let vars = vec![("MODELKIT_DATABASE_URL".to_string(), "not a url".to_string())];
        assert!(matches!(
            database_urls(vars.into_iter()),
            Err(Error::BadValue { .. })
        ));
    }
}
