use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A resolved file that knows where it would be served from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticAsset {
    pub path: String,
    /// The tag the asset was resolved for, if it is locale-keyed.
    pub language_tag: Option<String>,
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
}

/// One resolved translation value and the language it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub language_tag: String,
    pub value: String,
}

/// The result of reducing a list of raw files through one view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Artifact {
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    Asset(StaticAsset),
    Translations(BTreeMap<String, Translation>),
    Document(serde_json::Value),
    Validated,
}

impl Artifact {
    /// Raw payload of byte-like artifacts.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Artifact::Bytes(data) => Some(data),
            Artifact::Asset(asset) => Some(&asset.data),
            _ => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Artifact::Bytes(data) => Some(data),
            Artifact::Asset(asset) => Some(asset.data),
            _ => None,
        }
    }

    pub fn into_asset(self) -> Option<StaticAsset> {
        match self {
            Artifact::Asset(asset) => Some(asset),
            _ => None,
        }
    }

    pub fn into_translations(self) -> Option<BTreeMap<String, Translation>> {
        match self {
            Artifact::Translations(map) => Some(map),
            _ => None,
        }
    }

    pub fn into_document(self) -> Option<serde_json::Value> {
        match self {
            Artifact::Document(value) => Some(value),
            _ => None,
        }
    }
}
