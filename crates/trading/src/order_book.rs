//! HTTP client for the order book API.

use {
    app_data::AppDataHash,
    model::{
        order::{Order, OrderCreation, OrderUid, SignedOrderCancellations},
        quote::{OrderQuoteRequest, OrderQuoteResponse},
    },
    reqwest::{Client, Response, StatusCode},
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    url::Url,
};

#[derive(Debug, thiserror::Error)]
pub enum OrderBookError {
    /// The order book understood the request and refused it.
    #[error("order book responded with {status} {error_type}: {description}")]
    Api {
        status: StatusCode,
        error_type: String,
        description: String,
    },
    #[error("not found")]
    NotFound,
    #[error("request to order book failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid order book url: {0}")]
    Url(#[from] url::ParseError),
}

/// The order book endpoints the trading flow talks to.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait OrderBook: Send + Sync {
    /// Prices a trade. Quotes of optimal quality carry the id that eth-flow
    /// orders must reference.
    async fn get_quote(
        &self,
        request: &OrderQuoteRequest,
    ) -> Result<OrderQuoteResponse, OrderBookError>;

    /// Submits a signed order and returns the uid the order book assigned.
    async fn send_order(&self, order: &OrderCreation) -> Result<OrderUid, OrderBookError>;

    /// Stores the pre-image of an app data hash. Uploading the same document
    /// twice is a no-op.
    async fn upload_app_data(
        &self,
        hash: AppDataHash,
        full_app_data: &str,
    ) -> Result<AppDataHash, OrderBookError>;

    async fn get_app_data(&self, hash: AppDataHash) -> Result<String, OrderBookError>;

    /// Eth-flow orders are returned as the user placed them, selling the
    /// native currency.
    async fn get_order(&self, uid: &OrderUid) -> Result<Order, OrderBookError>;

    async fn cancel_orders(
        &self,
        cancellations: &SignedOrderCancellations,
    ) -> Result<(), OrderBookError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiError {
    error_type: String,
    description: String,
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct AppDataDocument<'a> {
    full_app_data: std::borrow::Cow<'a, str>,
}

#[derive(Debug)]
pub struct OrderBookApi {
    client: Client,
    base_url: Url,
}

impl OrderBookApi {
    /// `base_url` is the per-network root of the API, e.g.
    /// `https://api.cow.fi/mainnet`.
    pub fn new(client: Client, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, OrderBookError> {
        Ok(self.base_url.join(path)?)
    }

    async fn error(response: Response) -> OrderBookError {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return OrderBookError::NotFound;
        }
        match response.text().await {
            Ok(body) => match serde_json::from_str::<ApiError>(&body) {
                Ok(err) => OrderBookError::Api {
                    status,
                    error_type: err.error_type,
                    description: err.description,
                },
                Err(_) => OrderBookError::Api {
                    status,
                    error_type: "Unknown".to_string(),
                    description: body,
                },
            },
            Err(err) => OrderBookError::Transport(err),
        }
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, OrderBookError> {
        if !response.status().is_success() {
            return Err(Self::error(response).await);
        }
        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl OrderBook for OrderBookApi {
    async fn get_quote(
        &self,
        request: &OrderQuoteRequest,
    ) -> Result<OrderQuoteResponse, OrderBookError> {
        let response = self
            .client
            .post(self.url("api/v1/quote")?)
            .json(request)
            .send()
            .await?;
        let quote: OrderQuoteResponse = Self::json(response).await?;
        tracing::debug!(
            id = ?quote.id,
            sell_amount = %quote.quote.sell_amount,
            buy_amount = %quote.quote.buy_amount,
            "received quote"
        );
        Ok(quote)
    }

    async fn send_order(&self, order: &OrderCreation) -> Result<OrderUid, OrderBookError> {
        let response = self
            .client
            .post(self.url("api/v1/orders")?)
            .json(order)
            .send()
            .await?;
        let uid: OrderUid = Self::json(response).await?;
        tracing::debug!(%uid, "order accepted by order book");
        Ok(uid)
    }

    async fn upload_app_data(
        &self,
        hash: AppDataHash,
        full_app_data: &str,
    ) -> Result<AppDataHash, OrderBookError> {
        let response = self
            .client
            .put(self.url(&format!("api/v1/app_data/{hash}"))?)
            .json(&AppDataDocument {
                full_app_data: full_app_data.into(),
            })
            .send()
            .await?;
        let stored = Self::json(response).await?;
        tracing::debug!(%hash, "uploaded app data");
        Ok(stored)
    }

    async fn get_app_data(&self, hash: AppDataHash) -> Result<String, OrderBookError> {
        let response = self
            .client
            .get(self.url(&format!("api/v1/app_data/{hash}"))?)
            .send()
            .await?;
        let document: AppDataDocument<'static> = Self::json(response).await?;
        Ok(document.full_app_data.into_owned())
    }

    async fn get_order(&self, uid: &OrderUid) -> Result<Order, OrderBookError> {
        let response = self
            .client
            .get(self.url(&format!("api/v1/orders/{uid}"))?)
            .send()
            .await?;
        let order: Order = Self::json(response).await?;
        Ok(order.with_eth_flow_normalized())
    }

    async fn cancel_orders(
        &self,
        cancellations: &SignedOrderCancellations,
    ) -> Result<(), OrderBookError> {
        let response = self
            .client
            .delete(self.url("api/v1/orders")?)
            .json(cancellations)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::error(response).await);
        }
        tracing::debug!(count = cancellations.data.order_uids.len(), "cancelled orders");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::primitives::{Address, U256},
        model::{
            order::{OrderCancellations, OrderCreationAppData, OrderData, OrderKind},
            quote::{OrderQuoteSide, SellAmount},
            signature::{EcdsaSignature, EcdsaSigningScheme, Signature},
        },
        serde_json::json,
        wiremock::{
            Mock,
            MockServer,
            ResponseTemplate,
            matchers::{body_json, body_partial_json, method, path},
        },
    };

    const UID: &str = "0x1111111111111111111111111111111111111111111111111111111111111111f39fd6e51aad88f6f4ce6ab8827279cfffb92266ffffffff";

    async fn api(server: &MockServer) -> OrderBookApi {
        OrderBookApi::new(Client::new(), format!("{}/mainnet", server.uri()).parse().unwrap())
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        let api = OrderBookApi::new(Client::new(), "https://api.cow.fi/xdai".parse().unwrap());
        assert_eq!(
            api.url("api/v1/orders").unwrap().as_str(),
            "https://api.cow.fi/xdai/api/v1/orders"
        );
        let api = OrderBookApi::new(Client::new(), "https://api.cow.fi/xdai/".parse().unwrap());
        assert_eq!(api.base_url().as_str(), "https://api.cow.fi/xdai/");
    }

    #[tokio::test]
    async fn posts_orders() {
        let server = MockServer::start().await;
        let order = OrderCreation::new(
            &OrderData {
                sell_token: Address::repeat_byte(1),
                buy_token: Address::repeat_byte(2),
                sell_amount: U256::from(1_000),
                buy_amount: U256::from(2_000),
                kind: OrderKind::Sell,
                ..Default::default()
            },
            OrderCreationAppData::Full {
                full: "{}".to_string(),
            },
            Some(Address::repeat_byte(3)),
            Signature::PreSign(Address::repeat_byte(3)),
            Some(7),
        );
        Mock::given(method("POST"))
            .and(path("/mainnet/api/v1/orders"))
            .and(body_partial_json(json!({
                "sellAmount": "1000",
                "buyAmount": "2000",
                "kind": "sell",
                "signingScheme": "presign",
                "quoteId": 7,
                "appData": "{}",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(UID))
            .expect(1)
            .mount(&server)
            .await;

        let uid = api(&server).await.send_order(&order).await.unwrap();
        assert_eq!(uid.to_string(), UID);
    }

    #[tokio::test]
    async fn requests_quotes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mainnet/api/v1/quote"))
            .and(body_partial_json(json!({
                "kind": "sell",
                "sellAmountBeforeFee": "1000",
                "priceQuality": "optimal",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quote": {
                    "sellToken": "0x0101010101010101010101010101010101010101",
                    "buyToken": "0x0202020202020202020202020202020202020202",
                    "sellAmount": "990",
                    "buyAmount": "1980",
                    "validTo": 1700000000,
                    "appData": "0x0000000000000000000000000000000000000000000000000000000000000000",
                    "feeAmount": "10",
                    "kind": "sell",
                    "partiallyFillable": false,
                },
                "from": "0x0303030303030303030303030303030303030303",
                "expiration": "2023-11-14T22:13:20Z",
                "id": 1337,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = OrderQuoteRequest {
            from: Address::repeat_byte(3),
            sell_token: Address::repeat_byte(1),
            buy_token: Address::repeat_byte(2),
            side: OrderQuoteSide::Sell {
                sell_amount: SellAmount::BeforeFee {
                    value: U256::from(1_000),
                },
            },
            ..Default::default()
        };
        let response = api(&server).await.get_quote(&request).await.unwrap();
        assert_eq!(response.id, Some(1337));
        assert_eq!(response.quote.sell_amount, U256::from(990));
        assert_eq!(response.quote.fee_amount, U256::from(10));
        assert_eq!(response.quote.kind, OrderKind::Sell);
    }

    #[tokio::test]
    async fn unsupported_token_quote_is_an_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mainnet/api/v1/quote"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "errorType": "UnsupportedToken",
                "description": "Token 0x0101010101010101010101010101010101010101 is not supported",
            })))
            .mount(&server)
            .await;

        let err = api(&server)
            .await
            .get_quote(&OrderQuoteRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderBookError::Api { error_type, .. } if error_type == "UnsupportedToken"));
    }

    #[tokio::test]
    async fn api_errors_are_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mainnet/api/v1/orders"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "errorType": "InsufficientValidTo",
                "description": "validTo is not far enough in the future",
            })))
            .mount(&server)
            .await;

        let err = api(&server)
            .await
            .send_order(&OrderCreation::default())
            .await
            .unwrap_err();
        match err {
            OrderBookError::Api {
                status,
                error_type,
                description,
            } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(error_type, "InsufficientValidTo");
                assert!(description.contains("validTo"));
            }
            err => panic!("unexpected error {err:?}"),
        }
    }

    #[tokio::test]
    async fn uploads_and_reads_app_data() {
        let server = MockServer::start().await;
        let full_app_data = r#"{"appCode":"CoW Swap","metadata":{},"version":"1.11.0"}"#;
        let hash = AppDataHash::of_full_app_data(full_app_data);
        Mock::given(method("PUT"))
            .and(path(format!("/mainnet/api/v1/app_data/{hash}")))
            .and(body_json(json!({ "fullAppData": full_app_data })))
            .respond_with(ResponseTemplate::new(201).set_body_json(hash.to_string()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/mainnet/api/v1/app_data/{hash}")))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "fullAppData": full_app_data })),
            )
            .mount(&server)
            .await;

        let api = api(&server).await;
        assert_eq!(api.upload_app_data(hash, full_app_data).await.unwrap(), hash);
        assert_eq!(api.get_app_data(hash).await.unwrap(), full_app_data);
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/mainnet/api/v1/orders/{UID}")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "errorType": "NotFound",
                "description": "Order was not found",
            })))
            .mount(&server)
            .await;

        let uid: OrderUid = UID.parse().unwrap();
        let err = api(&server).await.get_order(&uid).await.unwrap_err();
        assert!(matches!(err, OrderBookError::NotFound));
    }

    #[tokio::test]
    async fn cancels_orders() {
        let server = MockServer::start().await;
        let cancellations = SignedOrderCancellations {
            data: OrderCancellations {
                order_uids: vec![UID.parse().unwrap()],
            },
            signature: EcdsaSignature::non_zero(),
            signing_scheme: EcdsaSigningScheme::Eip712,
        };
        Mock::given(method("DELETE"))
            .and(path("/mainnet/api/v1/orders"))
            .and(body_partial_json(json!({
                "orderUids": [UID],
                "signingScheme": "eip712",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json("Cancelled"))
            .expect(1)
            .mount(&server)
            .await;

        api(&server).await.cancel_orders(&cancellations).await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn mainnet_order_book() {
        let api = OrderBookApi::new(Client::new(), "https://api.cow.fi/mainnet".parse().unwrap());
        let err = api.get_order(&OrderUid([0; 56])).await.unwrap_err();
        assert!(matches!(err, OrderBookError::NotFound));
    }
}
