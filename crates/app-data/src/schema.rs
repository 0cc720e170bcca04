//! Versioned validation of app data documents.
//!
//! Each document declares the schema version it was written against. A
//! version determines which metadata categories may appear; every known
//! category is checked against its typed shape. Categories this crate does not
//! know about are left untouched so newer documents still round-trip.

use {
    crate::{
        hooks::Hooks,
        metadata::{
            Bridging, Flashloan, OrderClass, PartnerFees, Quote, Referrer, ReplacedOrder, Utm,
            Widget, WrapperCall,
        },
    },
    alloy::primitives::Address,
    serde::de::DeserializeOwned,
    serde_json::{Map, Value},
    std::{
        fmt::{self, Display},
        str::FromStr,
    },
};

pub const LATEST_APP_DATA_VERSION: &str = "1.11.0";

/// Every document version that was ever published.
pub const SUPPORTED_VERSIONS: &[&str] = &[
    "0.1.0", "0.2.0", "0.3.0", "0.4.0", "0.5.0", "0.6.0", "0.7.0", "0.8.0", "0.9.0", "0.10.0",
    "0.11.0", "1.0.0", "1.1.0", "1.2.0", "1.3.0", "1.4.0", "1.5.0", "1.6.0", "1.7.0", "1.8.0",
    "1.9.0", "1.10.0", "1.11.0",
];

/// Largest basis point value any category accepts.
const MAX_BPS: u64 = 10_000;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid app data at {path}: {message}")]
pub struct SchemaValidationError {
    /// Dotted path of the offending field, e.g. `metadata.quote.slippageBips`.
    pub path: String,
    pub message: String,
}

impl SchemaValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A `major.minor.patch` document version.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SchemaVersion(pub u32, pub u32, pub u32);

impl SchemaVersion {
    pub fn latest() -> Self {
        Self(1, 11, 0)
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_VERSIONS
            .iter()
            .any(|v| v.parse::<SchemaVersion>().ok() == Some(*self))
    }
}

impl Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

impl FromStr for SchemaVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.').map(str::parse::<u32>);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(major)), Some(Ok(minor)), Some(Ok(patch)), None) => {
                Ok(Self(major, minor, patch))
            }
            _ => Err(format!("{s:?} is not a semantic version")),
        }
    }
}

/// The metadata categories with a known shape.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::EnumIter, strum::IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum Category {
    Referrer,
    Quote,
    OrderClass,
    Utm,
    Hooks,
    Widget,
    Signer,
    PartnerFee,
    ReplacedOrder,
    Flashloan,
    Bridging,
    Wrappers,
}

impl Category {
    pub fn key(self) -> &'static str {
        self.into()
    }

    pub fn from_key(key: &str) -> Option<Self> {
        <Self as strum::IntoEnumIterator>::iter().find(|category| category.key() == key)
    }

    /// First document version that allows the category.
    pub fn introduced_in(self) -> SchemaVersion {
        match self {
            Self::Referrer => SchemaVersion(0, 1, 0),
            Self::Quote => SchemaVersion(0, 2, 0),
            Self::OrderClass => SchemaVersion(0, 5, 0),
            Self::Utm => SchemaVersion(0, 6, 0),
            Self::Hooks => SchemaVersion(0, 8, 0),
            Self::Widget => SchemaVersion(0, 9, 0),
            Self::Signer => SchemaVersion(0, 10, 0),
            Self::PartnerFee => SchemaVersion(0, 11, 0),
            Self::ReplacedOrder => SchemaVersion(1, 0, 0),
            Self::Flashloan => SchemaVersion(1, 3, 0),
            Self::Bridging => SchemaVersion(1, 5, 0),
            Self::Wrappers => SchemaVersion(1, 10, 0),
        }
    }

    /// Fields that must be present in the category object.
    fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Referrer => &["address"],
            Self::Quote => &["slippageBips"],
            Self::OrderClass => &["orderClass"],
            Self::Widget => &["appCode"],
            Self::ReplacedOrder => &["uid"],
            Self::Flashloan => &[
                "liquidityProvider",
                "protocolAdapter",
                "receiver",
                "token",
                "amount",
            ],
            Self::Bridging => &["destinationChainId", "destinationTokenAddress"],
            Self::Utm | Self::Hooks | Self::Signer | Self::PartnerFee | Self::Wrappers => &[],
        }
    }

    fn validate(self, value: &Value, path: &str) -> Result<(), SchemaValidationError> {
        if let Value::Object(fields) = value {
            for field in self.required_fields() {
                if !fields.contains_key(*field) {
                    return Err(SchemaValidationError::new(
                        format!("{path}.{field}"),
                        "required property is missing",
                    ));
                }
            }
        }

        match self {
            Self::Referrer => shape::<Referrer>(value, path).map(drop),
            Self::Quote => {
                let quote = shape::<Quote>(value, path)?;
                check_bps(u64::from(quote.slippage_bips), &format!("{path}.slippageBips"))
            }
            Self::OrderClass => shape::<OrderClass>(value, path).map(drop),
            Self::Utm => shape::<Utm>(value, path).map(drop),
            Self::Hooks => shape::<Hooks>(value, path).map(drop),
            Self::Widget => shape::<Widget>(value, path).map(drop),
            Self::Signer => shape::<Address>(value, path).map(drop),
            Self::PartnerFee => {
                let fees = shape::<PartnerFees>(value, path)?;
                for fee in fees.iter() {
                    for (field, bps) in fee.policy.bps_values() {
                        check_bps(bps, &format!("{path}.{field}"))?;
                    }
                }
                Ok(())
            }
            Self::ReplacedOrder => shape::<ReplacedOrder>(value, path).map(drop),
            Self::Flashloan => shape::<Flashloan>(value, path).map(drop),
            Self::Bridging => shape::<Bridging>(value, path).map(drop),
            Self::Wrappers => shape::<Vec<WrapperCall>>(value, path).map(drop),
        }
    }
}

fn shape<T: DeserializeOwned>(value: &Value, path: &str) -> Result<T, SchemaValidationError> {
    T::deserialize(value).map_err(|err| SchemaValidationError::new(path, err.to_string()))
}

fn check_bps(bps: u64, path: &str) -> Result<(), SchemaValidationError> {
    if bps > MAX_BPS {
        return Err(SchemaValidationError::new(
            path,
            format!("must be at most {MAX_BPS} basis points, got {bps}"),
        ));
    }
    Ok(())
}

/// Resolves the version a document declares.
pub fn document_version(document: &Map<String, Value>) -> Result<SchemaVersion, SchemaValidationError> {
    let version = match document.get("version") {
        Some(Value::String(version)) => version,
        Some(_) => return Err(SchemaValidationError::new("version", "must be a string")),
        None => {
            return Err(SchemaValidationError::new(
                "version",
                "required property is missing",
            ));
        }
    };
    let parsed: SchemaVersion = version
        .parse()
        .map_err(|err: String| SchemaValidationError::new("version", err))?;
    if !parsed.is_supported() {
        return Err(SchemaValidationError::new(
            "version",
            format!("app data version {version} doesn't exist"),
        ));
    }
    Ok(parsed)
}

/// Validates a full document against the schema of the version it declares.
pub fn validate(document: &Value) -> Result<SchemaVersion, SchemaValidationError> {
    let Value::Object(root) = document else {
        return Err(SchemaValidationError::new("<root>", "must be an object"));
    };
    let version = document_version(root)?;

    for key in ["appCode", "environment"] {
        if let Some(value) = root.get(key) {
            if !value.is_string() {
                return Err(SchemaValidationError::new(key, "must be a string"));
            }
        }
    }

    let metadata = match root.get("metadata") {
        Some(Value::Object(metadata)) => metadata,
        Some(_) => return Err(SchemaValidationError::new("metadata", "must be an object")),
        None => {
            return Err(SchemaValidationError::new(
                "metadata",
                "required property is missing",
            ));
        }
    };

    for (key, value) in metadata {
        let Some(category) = Category::from_key(key) else {
            continue;
        };
        let path = format!("metadata.{key}");
        if version < category.introduced_in() {
            return Err(SchemaValidationError::new(
                path,
                format!(
                    "not allowed in version {version}, introduced in {}",
                    category.introduced_in()
                ),
            ));
        }
        category.validate(value, &path)?;
    }

    Ok(version)
}
