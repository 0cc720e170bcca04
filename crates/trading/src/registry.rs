//! Order book clients shared per environment and chain.

use {
    crate::{error::Error, order_book::OrderBookApi},
    contracts::{Env, deployments},
    dashmap::DashMap,
    reqwest::Client,
    std::{collections::HashMap, sync::Arc},
    url::Url,
};

pub const PROD_BASE_URL: &str = "https://api.cow.fi/";
pub const STAGING_BASE_URL: &str = "https://barn.api.cow.fi/";

/// Creates order book clients on first use and hands out the same instance
/// afterwards. Entries are never evicted.
#[derive(Debug)]
pub struct ClientRegistry {
    client: Client,
    overrides: HashMap<Env, Url>,
    clients: DashMap<(Env, u64), Arc<OrderBookApi>>,
}

impl ClientRegistry {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            overrides: HashMap::new(),
            clients: DashMap::new(),
        }
    }

    /// Serves `env` from `base_url` instead of the public API. The network
    /// name is appended to it.
    pub fn with_base_url(mut self, env: Env, base_url: Url) -> Self {
        self.overrides.insert(env, base_url);
        self
    }

    /// The API root for `chain_id` in `env`, e.g. `https://api.cow.fi/mainnet/`.
    pub fn base_url(&self, env: Env, chain_id: u64) -> Result<Url, Error> {
        let network = deployments::network_name(chain_id).ok_or(Error::UnsupportedChain(chain_id))?;
        let root = match self.overrides.get(&env) {
            Some(url) => url.clone(),
            None => match env {
                Env::Prod => Url::parse(PROD_BASE_URL),
                Env::Staging => Url::parse(STAGING_BASE_URL),
            }
            .map_err(|err| Error::OrderBook(err.into()))?,
        };
        let root = if root.path().ends_with('/') {
            root
        } else {
            let mut root = root;
            root.set_path(&format!("{}/", root.path()));
            root
        };
        root.join(&format!("{network}/"))
            .map_err(|err| Error::OrderBook(err.into()))
    }

    pub fn get_or_create(&self, env: Env, chain_id: u64) -> Result<Arc<OrderBookApi>, Error> {
        if let Some(api) = self.clients.get(&(env, chain_id)) {
            return Ok(api.clone());
        }
        let base_url = self.base_url(env, chain_id)?;
        // A concurrent caller may have inserted in the meantime; the entry
        // API keeps whichever client got there first.
        let api = self
            .clients
            .entry((env, chain_id))
            .or_insert_with(|| {
                tracing::debug!(%env, chain_id, %base_url, "creating order book client");
                Arc::new(OrderBookApi::new(self.client.clone(), base_url))
            })
            .clone();
        Ok(api)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
