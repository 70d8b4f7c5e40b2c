use crate::utils::error::{DeployError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(DeployError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// Rejects relative paths that climb out of the deployment target.
pub fn validate_relative_subpath(field_name: &str, path: &str) -> Result<()> {
    validate_path(field_name, path)?;

    if path.split('/').any(|segment| segment == "..") {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path must not contain '..' segments".to_string(),
        });
    }
    Ok(())
}

pub fn validate_port(field_name: &str, value: &str) -> Result<u16> {
    match value.trim().parse::<u16>() {
        Ok(0) | Err(_) => Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Port must be a number between 1 and 65535".to_string(),
        }),
        Ok(port) => Ok(port),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DeployError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("KINSTA_MU_PLUGIN_URL", "https://example.com/a.zip").is_ok());
        assert!(validate_url("KINSTA_MU_PLUGIN_URL", "http://127.0.0.1:8080/a.zip").is_ok());
        assert!(validate_url("KINSTA_MU_PLUGIN_URL", "").is_err());
        assert!(validate_url("KINSTA_MU_PLUGIN_URL", "invalid-url").is_err());
        assert!(validate_url("KINSTA_MU_PLUGIN_URL", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_port() {
        assert_eq!(validate_port("KINSTA_PORT", "22").unwrap(), 22);
        assert_eq!(validate_port("KINSTA_PORT", " 41234 ").unwrap(), 41234);
        assert!(validate_port("KINSTA_PORT", "0").is_err());
        assert!(validate_port("KINSTA_PORT", "70000").is_err());
        assert!(validate_port("KINSTA_PORT", "ssh").is_err());
    }

    #[test]
    fn test_validate_relative_subpath() {
        assert!(validate_relative_subpath("KINSTA_MU_PLUGIN_PATH", "wp-content/mu-plugins").is_ok());
        assert!(validate_relative_subpath("KINSTA_MU_PLUGIN_PATH", "../etc").is_err());
        assert!(validate_relative_subpath("KINSTA_MU_PLUGIN_PATH", "").is_err());
    }
}
