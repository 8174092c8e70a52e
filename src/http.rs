use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::debug;

use crate::config::Config;
use crate::error::HttpError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const ACCEPT_LANGUAGE: &str = "en-US";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), domain: domain.into() }
    }

    /// `.youtube.com` matches `youtube.com` and every subdomain, a bare domain only itself.
    pub fn matches_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let domain = self.domain.to_ascii_lowercase();
        match domain.strip_prefix('.') {
            Some(bare) => host == bare || host.ends_with(&domain),
            None => host == domain,
        }
    }
}

/// Cookies keyed by domain. Setting a cookie with an existing name on the same
/// domain replaces it.
#[derive(Debug, Default)]
pub struct CookieJar {
    domains: RwLock<BTreeMap<String, Vec<Cookie>>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cookie(&self, name: &str, value: &str, domain: &str) {
        self.insert(Cookie::new(name, value, domain));
    }

    pub fn insert(&self, cookie: Cookie) {
        let mut domains = match self.domains.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let entry = domains.entry(cookie.domain.clone()).or_default();
        match entry.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => entry.push(cookie),
        }
    }

    pub fn extend<I: IntoIterator<Item = Cookie>>(&self, cookies: I) {
        for cookie in cookies {
            self.insert(cookie);
        }
    }

    pub fn cookies(&self) -> Vec<Cookie> {
        self.read(|domains| domains.values().flatten().cloned().collect())
    }

    pub fn cookies_for_domain(&self, domain: &str) -> Vec<Cookie> {
        self.read(|domains| domains.get(domain).cloned().unwrap_or_default())
    }

    /// Value for a `Cookie:` request header, `None` when nothing matches.
    pub fn header_for_host(&self, host: &str) -> Option<String> {
        let pairs: Vec<String> = self.read(|domains| {
            domains
                .values()
                .flatten()
                .filter(|c| c.matches_host(host))
                .map(|c| format!("{}={}", c.name, c.value))
                .collect()
        });
        if pairs.is_empty() { None } else { Some(pairs.join("; ")) }
    }

    pub fn is_empty(&self) -> bool {
        self.read(|domains| domains.values().all(Vec::is_empty))
    }

    fn read<T>(&self, f: impl FnOnce(&BTreeMap<String, Vec<Cookie>>) -> T) -> T {
        match self.domains.read() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}

/// Blocking GET plus the cookie store that travels with it.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str) -> Result<String, HttpError>;

    fn cookie_jar(&self) -> &CookieJar;
}

pub struct MinreqClient {
    jar: CookieJar,
    timeout_secs: Option<u64>,
    proxy: Option<String>,
}

impl MinreqClient {
    pub fn new(config: &Config) -> Self {
        Self {
            jar: CookieJar::new(),
            timeout_secs: config.http_timeout_secs,
            proxy: config.proxy.clone(),
        }
    }
}

impl HttpClient for MinreqClient {
    fn get(&self, url: &str) -> Result<String, HttpError> {
        let mut req = minreq::get(url)
            .with_header("User-Agent", USER_AGENT)
            .with_header("Accept-Language", ACCEPT_LANGUAGE);
        if let Some(cookie) = self.jar.header_for_host(host_of(url)) {
            req = req.with_header("Cookie", cookie);
        }
        if let Some(secs) = self.timeout_secs {
            req = req.with_timeout(secs);
        }
        if let Some(proxy) = &self.proxy {
            req = req.with_proxy(minreq::Proxy::new(proxy.as_str())?);
        }

        let response = req.send()?;
        debug!(url, status = response.status_code, "GET");

        if response.status_code < 200 || response.status_code > 299 {
            return Err(HttpError::Status { url: url.to_string(), status: response.status_code });
        }
        Ok(response.as_str()?.to_string())
    }

    fn cookie_jar(&self) -> &CookieJar {
        &self.jar
    }
}

/// Host part of an absolute URL, without scheme, port, path or query.
pub fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let end = rest.find(['/', '?', '#', ':']).unwrap_or(rest.len());
    &rest[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_extracted_from_urls() {
        assert_eq!(host_of("https://www.youtube.com/watch?v=abc"), "www.youtube.com");
        assert_eq!(host_of("http://localhost:8001/api"), "localhost");
        assert_eq!(host_of("consent.youtube.com"), "consent.youtube.com");
    }

    #[test]
    fn dotted_domain_matches_subdomains() {
        let cookie = Cookie::new("CONSENT", "YES+1", ".youtube.com");
        assert!(cookie.matches_host("www.youtube.com"));
        assert!(cookie.matches_host("youtube.com"));
        assert!(!cookie.matches_host("notyoutube.com"));

        let exact = Cookie::new("a", "b", "www.youtube.com");
        assert!(exact.matches_host("www.youtube.com"));
        assert!(!exact.matches_host("m.youtube.com"));
    }

    #[test]
    fn jar_replaces_cookie_with_same_name() {
        let jar = CookieJar::new();
        jar.add_cookie("CONSENT", "YES+1", ".youtube.com");
        jar.add_cookie("CONSENT", "YES+2", ".youtube.com");
        jar.add_cookie("PREF", "hl=en", ".youtube.com");

        let cookies = jar.cookies_for_domain(".youtube.com");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].value, "YES+2");
        assert_eq!(
            jar.header_for_host("www.youtube.com").as_deref(),
            Some("CONSENT=YES+2; PREF=hl=en")
        );
        assert_eq!(jar.header_for_host("example.com"), None);
    }
}
