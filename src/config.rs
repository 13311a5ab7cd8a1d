use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{transport::Transport, Beta, Client, Result};

/// Configuration for [`Client`].
///
/// # Examples
/// ```
/// # use prefinery::{Beta, ClientConfig};
/// let client = ClientConfig::new("acme", "api-key")
///     .beta(Beta::new(1234, "secret-decode-key").with_name("launch"))
///     .to_client();
/// ```
pub struct ClientConfig<'a> {
    pub(crate) account_name: String,
    pub(crate) api_key: String,
    pub(crate) base_url: Option<String>,
    pub(crate) betas: Vec<Beta>,
    pub(crate) transport: Option<Box<dyn Transport + Send + Sync + 'a>>,
}

impl<'a> ClientConfig<'a> {
    /// Create a configuration for the account `account_name` (the subdomain used in API calls).
    ///
    /// ```
    /// # use prefinery::ClientConfig;
    /// ClientConfig::new("acme", "api-key");
    /// ```
    pub fn new(account_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        ClientConfig {
            account_name: account_name.into(),
            api_key: api_key.into(),
            base_url: None,
            betas: Vec::new(),
            transport: None,
        }
    }

    /// Create a configuration from a parsed [`Settings`] document.
    pub fn from_settings(settings: Settings) -> Self {
        let mut config = ClientConfig::new(settings.account.name, settings.account.api_key);
        config.betas = settings.betas.into_iter().map(Beta::from).collect();
        config
    }

    /// Register a beta with the client.
    pub fn beta(mut self, beta: Beta) -> Self {
        self.betas.push(beta);
        self
    }

    /// Override base URL for API calls. Clients should use the default setting in most cases.
    ///
    /// The URL should point at the API root, e.g. `http://localhost:8080/api/v1`.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Replace the HTTP transport. Defaults to
    /// [`ReqwestTransport`](crate::transport::ReqwestTransport).
    pub fn transport(mut self, transport: impl Transport + Send + Sync + 'a) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Base URL used for API calls.
    ///
    /// ```
    /// # use prefinery::ClientConfig;
    /// let config = ClientConfig::new("acme", "api-key");
    /// assert_eq!(config.effective_base_url(), "https://acme.prefinery.com/api/v1");
    /// ```
    pub fn effective_base_url(&self) -> String {
        match &self.base_url {
            Some(base_url) => base_url.clone(),
            None => format!("https://{}.prefinery.com/api/v1", self.account_name),
        }
    }

    /// Create a new [`Client`] using the specified configuration.
    pub fn to_client(self) -> Client<'a> {
        Client::new(self)
    }
}

/// Settings document describing one account and the betas it manages.
///
/// ```json
/// {
///   "account": { "name": "acme", "apiKey": "..." },
///   "betas": [ { "id": 1234, "name": "launch", "decodeKey": "..." } ]
/// }
/// ```
///
/// The API key belongs to the account. Beta names are optional local labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Account credentials.
    pub account: AccountSettings,
    /// Betas managed by the account.
    #[serde(default)]
    pub betas: Vec<BetaSettings>,
}

/// `account` section of [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSettings {
    /// Account name as it appears in the API host name.
    pub name: String,
    /// API key of the account.
    pub api_key: String,
}

/// One entry of the `betas` section of [`Settings`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaSettings {
    /// Beta id as used by the API.
    pub id: u64,
    /// Local label for the beta.
    #[serde(default)]
    pub name: Option<String>,
    /// Key used to derive invite codes.
    pub decode_key: String,
}

impl Settings {
    /// Parse settings from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Settings> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Settings> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn parses_settings() {
        let settings = Settings::from_json_str(
            r#"
              {
                "account": { "name": "acme", "apiKey": "key" },
                "betas": [
                  { "id": 1, "name": "launch", "decodeKey": "one" },
                  { "id": 2, "decodeKey": "two" }
                ]
              }
            "#,
        )
        .unwrap();

        assert_eq!(settings.account.name, "acme");
        assert_eq!(settings.account.api_key, "key");
        assert_eq!(settings.betas.len(), 2);
        assert_eq!(settings.betas[0].name.as_deref(), Some("launch"));
        assert_eq!(settings.betas[1].name, None);
        assert_eq!(settings.betas[1].decode_key, "two");
    }

    #[test]
    fn betas_are_optional() {
        let settings =
            Settings::from_json_str(r#"{ "account": { "name": "acme", "apiKey": "key" } }"#)
                .unwrap();
        assert!(settings.betas.is_empty());
    }

    #[test]
    fn missing_api_key_is_configuration_error() {
        let result = Settings::from_json_str(r#"{ "account": { "name": "acme" } }"#);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = Settings::from_path("tests/data/does-not-exist.json");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn from_settings_registers_betas() {
        let settings = Settings::from_path("tests/data/settings.json").unwrap();
        let config = ClientConfig::from_settings(settings);

        assert_eq!(config.account_name, "acme");
        assert_eq!(config.betas.len(), 2);
        assert_eq!(config.betas[0].id(), 1234);
        assert_eq!(config.effective_base_url(), "https://acme.prefinery.com/api/v1");
    }

    #[test]
    fn base_url_override() {
        let config = ClientConfig::new("acme", "key").base_url("http://localhost:9000/api/v1");
        assert_eq!(config.effective_base_url(), "http://localhost:9000/api/v1");
    }
}
