//! Gateway wire types
//!
//! Action descriptors sent to the content gateway and the typed views of its
//! JSON responses. The gateway speaks camelCase JSON and is loose about
//! numeric fields, so numbers are accepted both as numbers and as strings.

use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// In-band answer the gateway returns instead of an error when a resource
/// is absent. Recognized at the transport boundary and surfaced as
/// [`FetchOutcome::Missing`]; the cache and queue layers never see it.
pub const NOT_FOUND_SENTINEL: &str = "Resource does not exist";

/// Deserialize a number that might be encoded as a string or null.
/// The gateway sometimes returns numeric fields as strings
/// (e.g. "1536964279000") and may return null for status-only entries.
fn deserialize_flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct FlexibleU64Visitor;

    impl<'de> de::Visitor<'de> for FlexibleU64Visitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a u64, a string containing a u64, or null")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
            u64::try_from(value).map_err(|_| de::Error::custom("negative value for u64"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
            value.parse::<u64>().map_err(de::Error::custom)
        }

        fn visit_none<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }

        fn visit_unit<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }
    }

    deserializer.deserialize_any(FlexibleU64Visitor)
}

/// Resource service/category on the content network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Service {
    Audio,
    Video,
    Document,
    Thumbnail,
    Playlist,
    Metadata,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Audio => "AUDIO",
            Service::Video => "VIDEO",
            Service::Document => "DOCUMENT",
            Service::Thumbnail => "THUMBNAIL",
            Service::Playlist => "PLAYLIST",
            Service::Metadata => "METADATA",
        };
        f.write_str(name)
    }
}

/// Search mode for resource listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchMode {
    All,
    Latest,
}

/// Parameters for a resource search/list request
///
/// Serialization order follows the struct declaration, so the canonical
/// cache key for two logically identical requests always collides —
/// callers never hand-build key strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub mode: SearchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<Service>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub limit: u32,
    pub offset: u32,
    pub reverse: bool,
    pub include_metadata: bool,
    pub include_status: bool,
    pub exclude_blocked: bool,
    pub exact_match_names: bool,
}

impl SearchParams {
    /// Latest-first listing for a service, the most common call shape
    pub fn latest(service: Service, limit: u32) -> Self {
        Self {
            mode: SearchMode::Latest,
            service: Some(service),
            query: None,
            name: None,
            identifier: None,
            limit,
            offset: 0,
            reverse: true,
            include_metadata: true,
            include_status: false,
            exclude_blocked: true,
            exact_match_names: false,
        }
    }

    /// Canonical cache key: fixed-order JSON serialization of the params
    pub fn canonical_key(&self) -> String {
        serde_json::to_string(self).expect("SearchParams serializes infallibly")
    }
}

/// Resource listing entry from a search response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    /// Publisher (registered name) of the resource
    pub name: String,
    pub service: Service,
    #[serde(default)]
    pub identifier: Option<String>,
    /// Resource size in bytes
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub size: u64,
    /// Creation timestamp in milliseconds since epoch
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub created: u64,
    /// Last-update timestamp in milliseconds since epoch
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub updated: u64,
    #[serde(default)]
    pub metadata: Option<ResourceMetadata>,
    #[serde(default)]
    pub status: Option<ResourceStatus>,
}

/// Optional descriptive metadata attached to a resource
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Local availability status of a resource
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    /// e.g. "READY", "DOWNLOADING", "NOT_PUBLISHED"
    pub status: String,
    #[serde(default)]
    pub percent_loaded: Option<f64>,
}

/// A single resource to publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub name: String,
    pub service: Service,
    pub identifier: String,
    /// Base64-encoded payload
    pub data64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl PublishRequest {
    /// Build a publish request from raw payload bytes
    pub fn with_data(name: &str, service: Service, identifier: &str, data: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            service,
            identifier: identifier.to_string(),
            data64: base64::engine::general_purpose::STANDARD.encode(data),
            title: None,
            description: None,
            category: None,
            filename: None,
            tags: Vec::new(),
        }
    }
}

/// Action descriptor accepted by the gateway request function
///
/// The wire form is the action's parameter object with an added `action`
/// discriminator, matching what the gateway bridge expects.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action")]
pub enum GatewayAction {
    #[serde(rename = "SEARCH_QDN_RESOURCES")]
    SearchResources(SearchParams),

    #[serde(rename = "FETCH_QDN_RESOURCE")]
    #[serde(rename_all = "camelCase")]
    FetchResource {
        name: String,
        service: Service,
        #[serde(skip_serializing_if = "Option::is_none")]
        identifier: Option<String>,
    },

    #[serde(rename = "GET_QDN_RESOURCE_URL")]
    #[serde(rename_all = "camelCase")]
    ResourceUrl {
        name: String,
        service: Service,
        #[serde(skip_serializing_if = "Option::is_none")]
        identifier: Option<String>,
    },

    #[serde(rename = "PUBLISH_QDN_RESOURCE")]
    PublishResource(PublishRequest),

    #[serde(rename = "PUBLISH_MULTIPLE_QDN_RESOURCES")]
    #[serde(rename_all = "camelCase")]
    PublishMultiple { resources: Vec<PublishRequest> },

    #[serde(rename = "DELETE_QDN_RESOURCE")]
    #[serde(rename_all = "camelCase")]
    DeleteResource { service: Service, identifier: String },
}

impl GatewayAction {
    /// Wire name of the action, for logging
    pub fn name(&self) -> &'static str {
        match self {
            GatewayAction::SearchResources(_) => "SEARCH_QDN_RESOURCES",
            GatewayAction::FetchResource { .. } => "FETCH_QDN_RESOURCE",
            GatewayAction::ResourceUrl { .. } => "GET_QDN_RESOURCE_URL",
            GatewayAction::PublishResource(_) => "PUBLISH_QDN_RESOURCE",
            GatewayAction::PublishMultiple { .. } => "PUBLISH_MULTIPLE_QDN_RESOURCES",
            GatewayAction::DeleteResource { .. } => "DELETE_QDN_RESOURCE",
        }
    }
}

/// Result of a fetch/resolve call, with "absent" as a first-class variant
/// instead of the gateway's in-band sentinel string
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(Value),
    Missing,
}

impl FetchOutcome {
    /// Interpret a raw gateway response, recognizing the not-found sentinel
    pub fn from_value(value: Value) -> Self {
        if value.as_str() == Some(NOT_FOUND_SENTINEL) {
            return FetchOutcome::Missing;
        }
        if value
            .get("error")
            .and_then(Value::as_str)
            .is_some_and(|msg| msg.contains(NOT_FOUND_SENTINEL))
        {
            return FetchOutcome::Missing;
        }
        FetchOutcome::Found(value)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FetchOutcome::Missing)
    }
}
