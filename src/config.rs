use log::info;
use std::env;
use std::net::SocketAddr;
use url::Url;

const DEFAULT_LISTING_URL: &str = "https://nikhilraghav.site/vehicleapinikhilapiapi/";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Clone)]
pub struct Config {
    pub listing_url: Url,
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Reads `LISTING_URL` and `BIND_ADDR`, falling back to the built-in defaults.
    pub fn from_env() -> Result<Config, failure::Error> {
        Config::from_vars(env::var("LISTING_URL").ok(), env::var("BIND_ADDR").ok())
    }

    fn from_vars(
        listing_url: Option<String>,
        bind_addr: Option<String>,
    ) -> Result<Config, failure::Error> {
        let listing_url = setting("LISTING_URL", listing_url, DEFAULT_LISTING_URL);
        let bind_addr = setting("BIND_ADDR", bind_addr, DEFAULT_BIND_ADDR);
        Ok(Config {
            listing_url: Url::parse(&listing_url)
                .map_err(|e| format_err!("Invalid LISTING_URL {:?}: {}", listing_url, e))?,
            bind_addr: bind_addr
                .parse()
                .map_err(|e| format_err!("Invalid BIND_ADDR {:?}: {}", bind_addr, e))?,
        })
    }
}

/// An unset or empty variable keeps the default. Anything else is logged.
fn setting(name: &str, value: Option<String>, default: &str) -> String {
    match value {
        Some(value) if !value.is_empty() && value != default => {
            info!("{} overridden from environment: {}", name, value);
            value
        }
        _ => default.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::from_vars(None, None).unwrap();
        assert_eq!(config.listing_url.as_str(), DEFAULT_LISTING_URL);
        assert_eq!(config.bind_addr, "0.0.0.0:5000".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn overrides() {
        let config = Config::from_vars(
            Some("http://localhost:8000/files/".to_string()),
            Some("127.0.0.1:8080".to_string()),
        )
        .unwrap();
        assert_eq!(config.listing_url.as_str(), "http://localhost:8000/files/");
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn empty_variables_keep_defaults() {
        let config = Config::from_vars(Some(String::new()), Some(String::new())).unwrap();
        assert_eq!(config.listing_url.as_str(), DEFAULT_LISTING_URL);
        assert_eq!(config.bind_addr.port(), 5000);
    }

    #[test]
    fn setting_prefers_non_empty_override() {
        assert_eq!(setting("BIND_ADDR", None, DEFAULT_BIND_ADDR), DEFAULT_BIND_ADDR);
        assert_eq!(
            setting("BIND_ADDR", Some("127.0.0.1:1".to_string()), DEFAULT_BIND_ADDR),
            "127.0.0.1:1"
        );
        assert_eq!(
            setting("BIND_ADDR", Some(String::new()), DEFAULT_BIND_ADDR),
            DEFAULT_BIND_ADDR
        );
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(Config::from_vars(Some("not a url".to_string()), None).is_err());
        assert!(Config::from_vars(None, Some("localhost".to_string())).is_err());
    }
}
