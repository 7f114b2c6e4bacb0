use multiplex_core::AppError;

/// Configuration of the HTTP surface.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Prefix of every route, e.g. `/api/v1`. Empty or starting with `/`,
    /// never ending with `/`.
    pub base_path: String,
}

impl ServerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `MULTIPLEX_PORT` (optional, defaults to 8080)
    /// - `MULTIPLEX_BASE_PATH` (optional, defaults to `/api/v1`)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let port = match lookup("MULTIPLEX_PORT") {
            None => 8080,
            Some(raw) => {
                let parsed: u16 = raw.trim().parse().map_err(|_| {
                    AppError::ConfigError(format!(
                        "Invalid MULTIPLEX_PORT '{raw}': must be from 1 to 65535"
                    ))
                })?;
                if parsed == 0 {
                    return Err(AppError::ConfigError(
                        "MULTIPLEX_PORT must be from 1 to 65535".into(),
                    ));
                }
                parsed
            }
        };

        let base_path = lookup("MULTIPLEX_BASE_PATH").unwrap_or_else(|| "/api/v1".to_string());
        if base_path.ends_with('/') {
            return Err(AppError::ConfigError(format!(
                "MULTIPLEX_BASE_PATH '{base_path}' must not end with \"/\""
            )));
        }
        if !base_path.is_empty() && !base_path.starts_with('/') {
            return Err(AppError::ConfigError(format!(
                "MULTIPLEX_BASE_PATH '{base_path}' must start with \"/\""
            )));
        }

        Ok(Self { port, base_path })
    }
}
