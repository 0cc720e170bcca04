use {
    crate::{
        canonical::{self, CanonicalError},
        cid,
        hash::AppDataHash,
        hooks::Hooks,
        merge,
        metadata::{
            Bridging, Flashloan, OrderClass, OrderClassKind, PartnerFees, Quote, Referrer,
            ReplacedOrder, Utm, Widget, WrapperCall,
        },
        schema::{self, LATEST_APP_DATA_VERSION, SchemaValidationError, SchemaVersion},
    },
    alloy::primitives::Address,
    anyhow::{Context, Result, anyhow},
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    serde_json::{Map, Value},
};

/// The minimum valid empty app data JSON string.
pub const EMPTY: &str = "{}";

/// A schema-validated app data document.
///
/// The document is kept as JSON so that metadata this crate has no typed
/// shape for survives unchanged; typed views are available through the
/// accessors.
#[derive(Clone, Debug, PartialEq)]
pub struct AppDataDoc {
    root: Map<String, Value>,
    version: SchemaVersion,
}

impl AppDataDoc {
    /// Validates `value` against the schema of the version it declares.
    pub fn from_value(value: Value) -> Result<Self, SchemaValidationError> {
        let version = schema::validate(&value)?;
        match value {
            Value::Object(root) => Ok(Self { root, version }),
            _ => Err(SchemaValidationError::new("<root>", "must be an object")),
        }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn app_code(&self) -> Option<&str> {
        self.root.get("appCode").and_then(Value::as_str)
    }

    pub fn environment(&self) -> Option<&str> {
        self.root.get("environment").and_then(Value::as_str)
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.root.get("metadata").and_then(Value::as_object)
    }

    fn category<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.metadata()?.get(key)?;
        T::deserialize(value).ok()
    }

    pub fn quote(&self) -> Option<Quote> {
        self.category("quote")
    }

    pub fn order_class(&self) -> Option<OrderClass> {
        self.category("orderClass")
    }

    pub fn hooks(&self) -> Option<Hooks> {
        self.category("hooks")
    }

    pub fn partner_fee(&self) -> Option<PartnerFees> {
        self.category("partnerFee")
    }

    pub fn signer(&self) -> Option<Address> {
        self.category("signer")
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// The exact document string that gets hashed and submitted.
    pub fn to_full_app_data(&self) -> Result<String, CanonicalError> {
        canonical::to_canonical_string(&Value::Object(self.root.clone()))
    }

    pub fn info(&self) -> Result<AppDataInfo, CanonicalError> {
        let full_app_data = self.to_full_app_data()?;
        let app_data_hex = AppDataHash::of_full_app_data(&full_app_data);
        Ok(AppDataInfo {
            doc: self.clone(),
            cid: cid::cid_v0_from_hash(&app_data_hex.0),
            full_app_data,
            app_data_hex,
        })
    }
}

impl Serialize for AppDataDoc {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.root.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AppDataDoc {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Everything needed to reference a document from an order.
#[derive(Clone, Debug, PartialEq)]
pub struct AppDataInfo {
    pub doc: AppDataDoc,
    /// The pre-image of `app_data_hex`.
    pub full_app_data: String,
    /// keccak-256 of `full_app_data`; goes into the `appData` field of the order.
    pub app_data_hex: AppDataHash,
    /// Legacy content identifier under which the document can be retrieved.
    pub cid: String,
}

/// Serialises a document and derives every reference to it.
pub fn get_app_data_info(doc: &AppDataDoc) -> Result<AppDataInfo, CanonicalError> {
    doc.info()
}

impl AppDataHash {
    pub fn of_document(doc: &AppDataDoc) -> Result<Self, CanonicalError> {
        Ok(Self::of_full_app_data(&doc.to_full_app_data()?))
    }
}

impl AppDataInfo {
    /// Builds the info for an already serialized document. The string is
    /// hashed as is, without canonicalising it first.
    pub fn from_full_app_data(full_app_data: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(full_app_data).context("invalid app data json")?;
        let doc = AppDataDoc::from_value(value)?;
        let app_data_hex = AppDataHash::of_full_app_data(full_app_data);
        Ok(Self {
            doc,
            cid: cid::cid_v0_from_hash(&app_data_hex.0),
            full_app_data: full_app_data.to_owned(),
            app_data_hex,
        })
    }
}

/// Inputs to the generated part of a document.
#[derive(Clone, Debug, Default)]
pub struct AppDataParams {
    pub app_code: String,
    pub environment: Option<String>,
    pub slippage_bps: u32,
    pub order_class: OrderClassKind,
    pub partner_fee: Option<PartnerFees>,
    pub hooks: Option<Hooks>,
    pub referrer: Option<Address>,
    pub utm: Option<Utm>,
    pub widget: Option<Widget>,
    pub signer: Option<Address>,
    pub replaced_order: Option<ReplacedOrder>,
    pub bridging: Option<Bridging>,
    pub flashloan: Option<Flashloan>,
    pub wrappers: Option<Vec<WrapperCall>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BaseDocument<'a> {
    version: &'static str,
    app_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    environment: Option<&'a str>,
    metadata: BaseMetadata<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BaseMetadata<'a> {
    quote: Quote,
    order_class: OrderClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    partner_fee: Option<&'a PartnerFees>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hooks: Option<&'a Hooks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    referrer: Option<Referrer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    utm: Option<&'a Utm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    widget: Option<&'a Widget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signer: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replaced_order: Option<&'a ReplacedOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bridging: Option<&'a Bridging>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flashloan: Option<&'a Flashloan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wrappers: Option<&'a Vec<WrapperCall>>,
}

impl AppDataParams {
    fn base_document(&self) -> Result<Value, SchemaValidationError> {
        let base = BaseDocument {
            version: LATEST_APP_DATA_VERSION,
            app_code: &self.app_code,
            environment: self.environment.as_deref(),
            metadata: BaseMetadata {
                quote: Quote {
                    slippage_bips: self.slippage_bps,
                    smart_slippage: None,
                },
                order_class: OrderClass {
                    order_class: self.order_class,
                },
                partner_fee: self.partner_fee.as_ref().filter(|fees| !fees.is_empty()),
                hooks: self.hooks.as_ref(),
                referrer: self.referrer.map(|address| Referrer { address }),
                utm: self.utm.as_ref(),
                widget: self.widget.as_ref(),
                signer: self.signer,
                replaced_order: self.replaced_order.as_ref(),
                bridging: self.bridging.as_ref(),
                flashloan: self.flashloan.as_ref(),
                wrappers: self.wrappers.as_ref(),
            },
        };
        serde_json::to_value(base).map_err(|err| SchemaValidationError::new("<root>", err.to_string()))
    }
}

/// Builds a document from the generated base and optional caller overrides.
///
/// The document targets the latest schema version unless the overrides pin
/// another `version`.
pub fn build_app_data_doc(
    params: &AppDataParams,
    overrides: Option<Value>,
) -> Result<AppDataDoc, SchemaValidationError> {
    let base = params.base_document()?;
    let document = match overrides {
        Some(overrides) if !overrides.is_object() => {
            return Err(SchemaValidationError::new(
                "<overrides>",
                "must be an object",
            ));
        }
        Some(overrides) => merge::merge_document(base, overrides),
        None => base,
    };
    let doc = AppDataDoc::from_value(document)?;
    tracing::debug!(version = %doc.version(), app_code = ?doc.app_code(), "built app data document");
    Ok(doc)
}

/// Merges overrides into an existing document and revalidates the result.
pub fn merge_app_data_doc(doc: &AppDataDoc, overrides: Value) -> Result<AppDataDoc, SchemaValidationError> {
    AppDataDoc::from_value(merge::merge_document(doc.as_value(), overrides))
}

/// The protocol relevant parts of a document.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolAppData {
    #[serde(default)]
    pub hooks: Hooks,
    pub signer: Option<Address>,
    pub replaced_order: Option<ReplacedOrder>,
    #[serde(default)]
    pub partner_fee: PartnerFees,
    pub flashloan: Option<Flashloan>,
    #[serde(default)]
    pub wrappers: Vec<WrapperCall>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedAppData {
    pub hash: AppDataHash,
    pub document: String,
    pub protocol: ProtocolAppData,
}

#[derive(Deserialize)]
struct Root {
    metadata: Option<ProtocolAppData>,
}

#[derive(Clone, Debug)]
pub struct Validator {
    /// App data size limit (in bytes).
    size_limit: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self { size_limit: 8192 }
    }
}

impl Validator {
    /// Creates a new app data [`Validator`] with the provided app data
    /// `size_limit` (in bytes).
    pub fn new(size_limit: usize) -> Self {
        Self { size_limit }
    }

    /// Returns the app data size limit (in bytes).
    pub fn size_limit(&self) -> usize {
        self.size_limit
    }

    /// Parses and validates the provided app data bytes.
    ///
    /// Valid app data is considered to be:
    /// 1. Below or equal to [`Validator::size_limit`] in size.
    /// 2. A valid JSON & app data object.
    pub fn validate(&self, full_app_data: &[u8]) -> Result<ValidatedAppData> {
        if full_app_data.len() > self.size_limit {
            return Err(anyhow!(
                "app data has byte size {} which is larger than limit {}",
                full_app_data.len(),
                self.size_limit
            ));
        }

        let document = String::from_utf8(full_app_data.to_vec())?;
        let root = serde_json::from_slice::<Root>(full_app_data).context("invalid app data json")?;

        Ok(ValidatedAppData {
            hash: AppDataHash::of_full_app_data(&document),
            document,
            protocol: root.metadata.unwrap_or_default(),
        })
    }
}
