use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    Region(String),
    MaskThreshold(f64),
    Border(f64),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Region(msg) => write!(f, "Invalid region: {}", msg),
            ConfigError::MaskThreshold(v) => {
                write!(f, "mask_threshold must be within [0, 1], got {}", v)
            }
            ConfigError::Border(v) => {
                write!(f, "detection_border must be non-negative, got {}", v)
            }
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Json(e) => write!(f, "Failed to parse JSON: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> ConfigError {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> ConfigError {
        ConfigError::Json(err)
    }
}
