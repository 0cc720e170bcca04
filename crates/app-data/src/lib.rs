//! App data documents: the JSON metadata orders commit to through their
//! `appData` hash.

pub mod canonical;
pub mod cid;
pub mod document;
pub mod hash;
pub mod hooks;
pub mod ipfs;
pub mod merge;
pub mod metadata;
pub mod schema;

pub use {
    canonical::{CanonicalError, to_canonical_string, to_canonical_string_from},
    cid::{CidError, app_data_hex_to_cid, app_data_hex_to_cid_v1},
    document::{
        AppDataDoc,
        AppDataInfo,
        AppDataParams,
        EMPTY,
        ProtocolAppData,
        ValidatedAppData,
        Validator,
        build_app_data_doc,
        get_app_data_info,
        merge_app_data_doc,
    },
    hash::{AppDataHash, hash_full_app_data},
    hooks::{Hook, Hooks},
    ipfs::{Ipfs, RetrievalError},
    merge::MergePolicy,
    metadata::{FeePolicy, OrderClassKind, OrderUid, PartnerFee, PartnerFees},
    schema::{LATEST_APP_DATA_VERSION, SchemaValidationError, SchemaVersion},
};
