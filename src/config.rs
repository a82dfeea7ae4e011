//! Runtime configuration for the todo service, read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `VERDICT_ADDR` | `127.0.0.1:3000` |
//! | `VERDICT_TODO_FILE` | `storage/todos.json` |
//! | `VERDICT_VIEWS` | `views` |
//! | `VERDICT_BODY_LIMIT` | `1048576` (bytes) |
//!
//! Log filtering is configured separately through `RUST_LOG`.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::Error;
use crate::server::DEFAULT_BODY_LIMIT;

pub const ADDR_VAR: &str = "VERDICT_ADDR";
pub const TODO_FILE_VAR: &str = "VERDICT_TODO_FILE";
pub const VIEWS_VAR: &str = "VERDICT_VIEWS";
pub const BODY_LIMIT_VAR: &str = "VERDICT_BODY_LIMIT";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    pub todo_file: PathBuf,
    pub views: PathBuf,
    pub body_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let addr = lookup(ADDR_VAR).unwrap_or_else(|| "127.0.0.1:3000".to_owned());
        let addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("{ADDR_VAR}=`{addr}`: {e}")))?;

        let body_limit = match lookup(BODY_LIMIT_VAR) {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| Error::Config(format!("{BODY_LIMIT_VAR}=`{raw}`: {e}")))?,
            None => DEFAULT_BODY_LIMIT,
        };

        Ok(Self {
            addr,
            body_limit,
            todo_file: lookup(TODO_FILE_VAR)
                .map_or_else(|| PathBuf::from("storage/todos.json"), PathBuf::from),
            views: lookup(VIEWS_VAR).map_or_else(|| PathBuf::from("views"), PathBuf::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.addr.port(), 3000);
        assert_eq!(config.todo_file, PathBuf::from("storage/todos.json"));
        assert_eq!(config.views, PathBuf::from("views"));
        assert_eq!(config.body_limit, DEFAULT_BODY_LIMIT);
    }

    #[test]
    fn overrides_apply() {
        let vars = HashMap::from([
            (ADDR_VAR, "0.0.0.0:8080"),
            (VIEWS_VAR, "/srv/views"),
            (BODY_LIMIT_VAR, "4096"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| (*v).to_owned())).unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.views, PathBuf::from("/srv/views"));
        assert_eq!(config.body_limit, 4096);
    }

    #[test]
    fn invalid_addresses_fail() {
        let err = Config::from_lookup(|key| (key == ADDR_VAR).then(|| "nowhere".to_owned()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("nowhere")));
    }

    #[test]
    fn invalid_body_limits_fail() {
        let err = Config::from_lookup(|key| (key == BODY_LIMIT_VAR).then(|| "lots".to_owned()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains(BODY_LIMIT_VAR)));
    }
}
