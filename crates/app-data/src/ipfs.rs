use {
    crate::cid::{self, CidError},
    moka::future::Cache,
    reqwest::{Client, StatusCode},
    serde_json::Value,
    std::time::Duration,
    url::Url,
};

pub const DEFAULT_GATEWAY: &str = "https://gnosis.mypinata.cloud/ipfs";

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("gateway responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("document is not valid json: {0}")]
    MalformedJson(#[source] serde_json::Error),
    #[error("request to gateway failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("gateway url {0} cannot be used as a base")]
    InvalidGateway(Url),
    #[error(transparent)]
    Cid(#[from] CidError),
}

/// Read access to documents pinned on an IPFS gateway.
pub struct Ipfs {
    client: Client,
    gateway: Url,
    auth_token: Option<String>,
    cache: Cache<String, Value>,
}

impl Ipfs {
    pub fn new(client: Client, gateway: Url, auth_token: Option<String>) -> Self {
        Self {
            client,
            gateway,
            auth_token,
            cache: Cache::builder()
                .max_capacity(1000)
                .time_to_live(Duration::from_secs(600))
                .build(),
        }
    }

    fn prepare_url(&self, cid: &str) -> Result<Url, RetrievalError> {
        let mut url = self.gateway.clone();
        url.path_segments_mut()
            .map_err(|()| RetrievalError::InvalidGateway(self.gateway.clone()))?
            .pop_if_empty()
            .push(cid);
        if let Some(jwt) = &self.auth_token {
            url.set_query(Some(&format!("pinataGatewayToken={jwt}")));
        }
        Ok(url)
    }

    /// Fetches the document stored under `cid` and parses it as JSON.
    ///
    /// Only successfully parsed documents are cached. Gateways answer unknown
    /// CIDs inconsistently (404, 504 or their own timeout statuses), so any
    /// non-2xx status is reported as an error for the caller to retry.
    pub async fn fetch(&self, cid: &str) -> Result<Value, RetrievalError> {
        if let Some(cached) = self.cache.get(cid).await {
            tracing::trace!(%cid, "app data document from cache");
            return Ok(cached);
        }

        let url = self.prepare_url(cid)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&body).into_owned();
            tracing::debug!(%cid, %status, %body, "IPFS gateway error");
            return Err(RetrievalError::Status { status, body });
        }

        let document: Value =
            serde_json::from_slice(&body).map_err(RetrievalError::MalformedJson)?;
        tracing::debug!(%cid, "found app data document");
        self.cache.insert(cid.to_owned(), document.clone()).await;
        Ok(document)
    }

    /// Fetches the document referenced by an order's `appData` field.
    pub async fn fetch_doc_from_app_data_hex(
        &self,
        app_data_hex: &str,
    ) -> Result<Value, RetrievalError> {
        let cid = cid::app_data_hex_to_cid(app_data_hex)?;
        self.fetch(&cid).await
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        serde_json::json,
        wiremock::{
            Mock,
            MockServer,
            ResponseTemplate,
            matchers::{method, path, query_param},
        },
    };

    const HASH: &str = "0xa6c81f4ca727252a05b108f1742a07430f28d474d2a3492d8f325746824d22e5";
    const CID: &str = "QmZZhNnqMF1gRywNKnTPuZksX7rVjQgTT3TJAZ7R6VE3b2";

    fn ipfs(server: &MockServer, auth_token: Option<&str>) -> Ipfs {
        let gateway = format!("{}/ipfs", server.uri()).parse().unwrap();
        Ipfs::new(Client::new(), gateway, auth_token.map(str::to_owned))
    }

    #[tokio::test]
    async fn fetches_and_caches_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/ipfs/{CID}")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"version":"0.1.0","appCode":"CowSwap","metadata":{}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let ipfs = ipfs(&server, None);
        let document = ipfs.fetch_doc_from_app_data_hex(HASH).await.unwrap();
        assert_eq!(document["appCode"], json!("CowSwap"));
        let cached = ipfs.fetch(CID).await.unwrap();
        assert_eq!(cached, document);
    }

    #[tokio::test]
    async fn passes_gateway_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/ipfs/{CID}")))
            .and(query_param("pinataGatewayToken", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let document = ipfs(&server, Some("secret")).fetch(CID).await.unwrap();
        assert_eq!(document, json!({}));
    }

    #[tokio::test]
    async fn non_success_status_is_retrieval_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let err = ipfs(&server, None).fetch(CID).await.unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Status { status, .. } if status == StatusCode::NOT_FOUND
        ));
    }

    #[tokio::test]
    async fn malformed_json_is_retrieval_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = ipfs(&server, None).fetch(CID).await.unwrap_err();
        assert!(matches!(err, RetrievalError::MalformedJson(_)));
    }

    #[tokio::test]
    async fn invalid_hash_fails_before_request() {
        let server = MockServer::start().await;
        let err = ipfs(&server, None)
            .fetch_doc_from_app_data_hex("0x1234")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Cid(CidError::InvalidHashLength { actual: 2 })
        ));
    }

    #[ignore]
    #[tokio::test]
    async fn public_gateway() {
        let ipfs = Ipfs::new(Client::new(), DEFAULT_GATEWAY.parse().unwrap(), None);
        let document = ipfs.fetch_doc_from_app_data_hex(HASH).await;
        let _ = dbg!(document);
    }
}
