//! TOML configuration of the trading client.

use {
    crate::registry::ClientRegistry,
    anyhow::{Context, Result, anyhow, ensure},
    app_data::{Ipfs, Validator},
    contracts::{Env, deployments},
    reqwest::Client,
    serde::Deserialize,
    std::{collections::HashMap, fmt, path::Path, time::Duration},
    url::Url,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    #[serde(default)]
    pub env: Env,
    pub chain_id: u64,
    /// Identifies the integrating application in app data documents.
    pub app_code: String,
    #[serde(default)]
    pub order_book: OrderBookConfig,
    #[serde(default)]
    pub ipfs: IpfsConfig,
    #[serde(default)]
    pub app_data: AppDataConfig,
    #[serde(default)]
    pub eth_flow: EthFlowConfig,
    #[serde(default)]
    pub logging: observe::Config,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OrderBookConfig {
    /// Replaces the public API root of an environment, e.g. for a local
    /// order book.
    #[serde(default)]
    pub base_url: HashMap<Env, Url>,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for OrderBookConfig {
    fn default() -> Self {
        Self {
            base_url: Default::default(),
            timeout: default_timeout(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct IpfsConfig {
    /// Defaults to the public Pinata gateway.
    #[serde(default)]
    pub gateway: Option<Url>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for IpfsConfig {
    fn default() -> Self {
        Self {
            gateway: None,
            auth_token: None,
            timeout: default_timeout(),
        }
    }
}

impl fmt::Debug for IpfsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IpfsConfig")
            .field("gateway", &self.gateway.as_ref().map(Url::as_str))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "SECRET"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AppDataConfig {
    /// Largest full app data document accepted, in bytes.
    #[serde(default = "default_size_limit")]
    pub size_limit: usize,
}

impl Default for AppDataConfig {
    fn default() -> Self {
        Self {
            size_limit: default_size_limit(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EthFlowConfig {
    /// Gas limit of `createOrder` before the safety margin is added.
    #[serde(default = "default_gas_limit")]
    pub gas_limit_default: u64,
}

impl Default for EthFlowConfig {
    fn default() -> Self {
        Self {
            gas_limit_default: default_gas_limit(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_size_limit() -> usize {
    8192
}

fn default_gas_limit() -> u64 {
    crate::eth_flow::GAS_LIMIT_DEFAULT
}

impl Configuration {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("I/O error while reading {path:?}"))?;
        // Not printing the detailed error because it could leak the auth token.
        let config: Self = toml::from_str(&data)
            .map_err(|_| anyhow!("TOML syntax error while reading {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            deployments::is_supported(self.chain_id),
            "chain {} is not supported",
            self.chain_id
        );
        ensure!(!self.app_code.is_empty(), "app-code must not be empty");
        ensure!(self.app_data.size_limit > 0, "app-data.size-limit must be positive");
        Ok(())
    }

    /// An order book client registry honouring the configured base URLs.
    pub fn registry(&self) -> Result<ClientRegistry> {
        let client = Client::builder()
            .timeout(self.order_book.timeout)
            .build()
            .context("failed to build order book http client")?;
        Ok(self
            .order_book
            .base_url
            .iter()
            .fold(ClientRegistry::new(client), |registry, (env, url)| {
                registry.with_base_url(*env, url.clone())
            }))
    }

    pub fn ipfs(&self) -> Result<Ipfs> {
        let client = Client::builder()
            .timeout(self.ipfs.timeout)
            .build()
            .context("failed to build ipfs http client")?;
        Ok(Ipfs::new(
            client,
            self.ipfs_gateway()?,
            self.ipfs.auth_token.clone(),
        ))
    }

    pub fn ipfs_gateway(&self) -> Result<Url> {
        match &self.ipfs.gateway {
            Some(gateway) => Ok(gateway.clone()),
            None => Url::parse(app_data::ipfs::DEFAULT_GATEWAY).context("invalid default gateway"),
        }
    }

    pub fn validator(&self) -> Validator {
        Validator::new(self.app_data.size_limit)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::io::Write, tracing::Level};

    fn write(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn minimal_configuration() {
        let file = write(
            r#"
            chain-id = 1
            app-code = "CoW Swap"
            "#,
        );
        let config = Configuration::from_path(file.path()).unwrap();
        assert_eq!(config.env, Env::Prod);
        assert_eq!(config.order_book.timeout, Duration::from_secs(10));
        assert_eq!(
            config.ipfs_gateway().unwrap().as_str(),
            "https://gnosis.mypinata.cloud/ipfs"
        );
        assert_eq!(config.app_data.size_limit, 8192);
        assert_eq!(config.eth_flow.gas_limit_default, 150_000);
        assert_eq!(config.validator().size_limit(), 8192);
        assert_eq!(
            config.registry().unwrap().base_url(config.env, config.chain_id).unwrap().as_str(),
            "https://api.cow.fi/mainnet/"
        );
    }

    #[test]
    fn full_configuration() {
        let file = write(
            r#"
            env = "barn"
            chain-id = 100
            app-code = "CoW Swap"

            [order-book]
            timeout = "30s"
            base-url = { staging = "http://localhost:8080" }

            [ipfs]
            gateway = "https://ipfs.io/ipfs"
            auth-token = "super-secret"
            timeout = "2m"

            [app-data]
            size-limit = 4096

            [eth-flow]
            gas-limit-default = 200000

            [logging]
            env-filter = "trading=debug"
            stderr-threshold = "warn"
            use-json-format = true
            "#,
        );
        let config = Configuration::from_path(file.path()).unwrap();
        assert_eq!(config.env, Env::Staging);
        assert_eq!(config.order_book.timeout, Duration::from_secs(30));
        assert_eq!(
            config.registry().unwrap().base_url(Env::Staging, 100).unwrap().as_str(),
            "http://localhost:8080/xdai/"
        );
        assert_eq!(config.ipfs.timeout, Duration::from_secs(120));
        assert_eq!(config.app_data.size_limit, 4096);
        assert_eq!(config.eth_flow.gas_limit_default, 200_000);
        assert_eq!(
            config.logging,
            observe::Config::new("trading=debug", Some(Level::WARN), true)
        );
        assert_eq!(config.ipfs_gateway().unwrap().as_str(), "https://ipfs.io/ipfs");
        assert!(!format!("{config:?}").contains("super-secret"));
        config.ipfs().unwrap();
    }

    #[test]
    fn rejects_invalid_configuration() {
        let unknown_field = write(
            r#"
            chain-id = 1
            app-code = "CoW Swap"
            colour = "blue"
            "#,
        );
        assert!(Configuration::from_path(unknown_field.path()).is_err());

        let unsupported_chain = write(
            r#"
            chain-id = 5
            app-code = "CoW Swap"
            "#,
        );
        let err = Configuration::from_path(unsupported_chain.path()).unwrap_err();
        assert!(err.to_string().contains("not supported"));

        assert!(Configuration::from_path(Path::new("/does/not/exist.toml")).is_err());
    }

    #[test]
    fn syntax_errors_do_not_leak_contents() {
        let file = write(
            r#"
            chain-id = 1
            app-code = "CoW Swap"
            [ipfs]
            auth-token = "super-secret
            "#,
        );
        let err = Configuration::from_path(file.path()).unwrap_err();
        assert!(!format!("{err:?}").contains("super-secret"));
    }
}
