use std::env;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// HTTP server settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` allows any origin.
    pub cors_origins: Option<Vec<String>>,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = lookup("HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(DEFAULT_HOST.to_string());

        let port = match lookup("PORT") {
            Some(value) => value.parse::<u16>().unwrap_or_else(|_| {
                tracing::warn!("Ignoring invalid PORT='{}'", value);
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty());

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(value) => match value.parse::<usize>() {
                Ok(bytes) if bytes > 0 => bytes,
                _ => {
                    tracing::warn!("Ignoring invalid MAX_UPLOAD_BYTES='{}'", value);
                    DEFAULT_MAX_UPLOAD_BYTES
                }
            },
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Self {
            host,
            port,
            cors_origins,
            max_upload_bytes,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:5001");
    }

    #[test]
    fn reads_overrides() {
        let config = ServerConfig::from_lookup(|key| match key {
            "HOST" => Some("127.0.0.1".to_string()),
            "PORT" => Some("8080".to_string()),
            "CORS_ORIGINS" => Some("http://localhost:5173, ,http://localhost:8081".to_string()),
            "MAX_UPLOAD_BYTES" => Some("1024".to_string()),
            _ => None,
        });

        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(
            config.cors_origins,
            Some(vec![
                "http://localhost:5173".to_string(),
                "http://localhost:8081".to_string()
            ])
        );
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = ServerConfig::from_lookup(|key| match key {
            "PORT" => Some("eighty".to_string()),
            "CORS_ORIGINS" => Some(" , ".to_string()),
            "MAX_UPLOAD_BYTES" => Some("0".to_string()),
            _ => None,
        });

        assert_eq!(config, ServerConfig::default());
    }
}
