use thiserror::Error;

pub const DEFAULT_TABLE_NAME: &str = "hospital";
pub const DEFAULT_IMAGE_API_BASE: &str = "https://api.cloudinary.com";
pub const DEFAULT_IMAGE_FOLDER: &str = "hospital";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Image service account settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageServiceConfig {
    pub api_base: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Unsigned preset; when absent uploads are signed with the API secret.
    pub upload_preset: Option<String>,
    pub folder: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub table_name: String,
    pub image: ImageServiceConfig,
}

impl AppConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        Ok(Self {
            table_name: get("TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            image: ImageServiceConfig {
                api_base: get("IMAGE_API_BASE")
                    .unwrap_or_else(|| DEFAULT_IMAGE_API_BASE.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                cloud_name: require("IMAGE_CLOUD_NAME")?,
                api_key: require("IMAGE_API_KEY")?,
                api_secret: require("IMAGE_API_SECRET")?,
                upload_preset: get("IMAGE_UPLOAD_PRESET"),
                folder: get("IMAGE_FOLDER").unwrap_or_else(|| DEFAULT_IMAGE_FOLDER.to_string()),
            },
        })
    }
}
