//! Invite-link configuration.
//!
//! The browser widget read the token from the page's query string. The
//! desktop rendition takes the same invite link on the command line and
//! extracts the token from it; the upload endpoint is derived from the
//! link's origin.

use clap::Parser;
use reqwest::Url;

use crate::intake::MAX_UPLOAD_BYTES;

#[derive(Debug, Parser)]
#[command(name = "cropsend", version, about = "Crop an image and send it to your bot")]
pub struct Cli {
    /// Invite link containing the upload token,
    /// e.g. https://example.org/?token=abc123
    pub link: String,

    /// Client-side upload size limit in bytes.
    #[arg(long, default_value_t = MAX_UPLOAD_BYTES)]
    pub max_upload_size: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid invite link: {0}")]
    InvalidLink(String),
    #[error("the invite link carries no token")]
    MissingToken,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub endpoint: Url,
    pub token: String,
    pub max_upload_size: u64,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        Self::from_link(&cli.link, cli.max_upload_size)
    }

    /// Parses an invite link, extracting the opaque `token` query parameter
    /// and deriving the `/upload` endpoint from the link's origin.
    pub fn from_link(link: &str, max_upload_size: u64) -> Result<Self, ConfigError> {
        let url = Url::parse(link).map_err(|err| ConfigError::InvalidLink(err.to_string()))?;
        let token = url
            .query_pairs()
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingToken)?;
        let endpoint = url
            .join("/upload")
            .map_err(|err| ConfigError::InvalidLink(err.to_string()))?;
        Ok(Self {
            endpoint,
            token,
            max_upload_size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_token_and_derives_endpoint() {
        let config =
            Config::from_link("https://bot.example.org/?token=abc123", MAX_UPLOAD_BYTES).unwrap();
        assert_eq!(config.token, "abc123");
        assert_eq!(config.endpoint.as_str(), "https://bot.example.org/upload");
    }

    #[test]
    fn token_survives_other_query_parameters() {
        let config = Config::from_link(
            "https://bot.example.org/page?lang=en&token=t-42",
            MAX_UPLOAD_BYTES,
        )
        .unwrap();
        assert_eq!(config.token, "t-42");
    }

    #[test]
    fn missing_or_empty_token_is_an_error() {
        assert!(matches!(
            Config::from_link("https://bot.example.org/", MAX_UPLOAD_BYTES),
            Err(ConfigError::MissingToken)
        ));
        assert!(matches!(
            Config::from_link("https://bot.example.org/?token=", MAX_UPLOAD_BYTES),
            Err(ConfigError::MissingToken)
        ));
    }

    #[test]
    fn malformed_links_are_errors() {
        assert!(matches!(
            Config::from_link("not a url", MAX_UPLOAD_BYTES),
            Err(ConfigError::InvalidLink(_))
        ));
    }
}
