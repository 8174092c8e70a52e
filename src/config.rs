use std::env;
use std::str::FromStr;

const DEFAULT_IP: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8001;
const DEFAULT_WORKERS: usize = 4;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Runtime settings, read from `TRANSCRIPT_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub ip: String,
    pub port: u16,
    pub workers: usize,
    /// `None` waits indefinitely.
    pub http_timeout_secs: Option<u64>,
    pub proxy: Option<String>,
    pub cookie_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ip: DEFAULT_IP.to_string(),
            port: DEFAULT_PORT,
            workers: DEFAULT_WORKERS,
            http_timeout_secs: Some(DEFAULT_HTTP_TIMEOUT_SECS),
            proxy: None,
            cookie_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());

        // 0 disables the timeout
        let http_timeout_secs = match parsed::<u64>(non_empty("TRANSCRIPT_HTTP_TIMEOUT_SECS")) {
            Some(0) => None,
            Some(secs) => Some(secs),
            None => defaults.http_timeout_secs,
        };

        Self {
            ip: non_empty("TRANSCRIPT_IP").unwrap_or(defaults.ip),
            port: parsed(non_empty("TRANSCRIPT_PORT")).unwrap_or(defaults.port),
            workers: parsed(non_empty("TRANSCRIPT_WORKERS"))
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.workers),
            http_timeout_secs,
            proxy: non_empty("TRANSCRIPT_PROXY"),
            cookie_file: non_empty("TRANSCRIPT_COOKIES"),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

fn parsed<T: FromStr>(value: Option<String>) -> Option<T> {
    value.and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.bind_addr(), "0.0.0.0:8001");
        assert_eq!(config.workers, 4);
        assert_eq!(config.http_timeout_secs, Some(15));
        assert!(config.proxy.is_none());
        assert!(config.cookie_file.is_none());
    }

    #[test]
    fn values_are_read_and_invalid_ones_ignored() {
        let config = config_from(&[
            ("TRANSCRIPT_PORT", "9000"),
            ("TRANSCRIPT_WORKERS", "zero"),
            ("TRANSCRIPT_HTTP_TIMEOUT_SECS", "0"),
            ("TRANSCRIPT_PROXY", "http://127.0.0.1:3128"),
            ("TRANSCRIPT_COOKIES", " "),
        ]);
        assert_eq!(config.port, 9000);
        assert_eq!(config.workers, 4);
        assert_eq!(config.http_timeout_secs, None);
        assert_eq!(config.proxy.as_deref(), Some("http://127.0.0.1:3128"));
        assert!(config.cookie_file.is_none());
    }
}
