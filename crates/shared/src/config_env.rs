use std::env;
use std::net::IpAddr;
use std::str::FromStr;

use crate::config::ConfigError;

/// Trimmed value of `key`; unset and blank are treated alike.
pub(crate) fn env_value(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|raw| non_blank(&raw))
}

pub(crate) fn required_env(key: &str) -> Result<String, ConfigError> {
    env_value(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()))
}

pub(crate) fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    parse_or(key, env_value(key), default)
}

pub(crate) fn ip_list_env(key: &str) -> Result<Vec<IpAddr>, ConfigError> {
    parse_ip_list(key, env_value(key).as_deref().unwrap_or_default())
}

fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        None => Ok(default),
    }
}

fn parse_ip_list(key: &str, raw: &str) -> Result<Vec<IpAddr>, ConfigError> {
    raw.split(',')
        .filter_map(non_blank)
        .map(|item| {
            item.parse::<IpAddr>().map_err(|_| {
                ConfigError::InvalidConfiguration(format!(
                    "{key} contains invalid IP address '{item}'"
                ))
            })
        })
        .collect()
}
