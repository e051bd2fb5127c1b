//! The span payload.

use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parent reference used by root spans.
pub const ROOT_PARENT_SPAN_ID: &str = "0000000000000000";

/// Schema version stamped on every generated span.
pub const SCHEMA_VERSION: &str = "1";

/// Free-form attribute namespace. Ordered so encoded spans are stable.
pub type AttributeMap = BTreeMap<String, serde_json::Value>;

/// Role of the span within its trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpanKind {
    Client,
    Server,
    Internal,
    Producer,
    Consumer,
    #[default]
    Unspecified,
}

/// Wire protocol observed for the span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Http,
    Db,
    Grpc,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Exception,
}

/// One error recorded against a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanErrorInfo {
    pub message: String,
    pub error_type: ErrorType,
    pub exception_type: String,
    pub hash: String,
}

/// One issue grouping a span is attached to under a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupByValue {
    pub workload_id: String,
    pub title: String,
    pub hash: String,
}

/// Groupings keyed by scenario id.
pub type GroupByMap = BTreeMap<String, Vec<GroupByValue>>;

/// A synthetic span.
///
/// The identifiers live in the storage key, not in the payload. The parent
/// reference is never empty: [`Span::new`] and [`Span::set_parent_span_id`]
/// replace an empty value with [`ROOT_PARENT_SPAN_ID`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    #[serde(default)]
    pub parent_span_id: String,
    pub span_kind: SpanKind,
    pub start_ns: u64,
    pub latency_ns: u64,
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SpanErrorInfo>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: AttributeMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_attributes: AttributeMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scope_attributes: AttributeMap,

    pub service_name: String,
    pub span_name: String,
    pub protocol: Protocol,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(
        default,
        rename = "destination_ip",
        skip_serializing_if = "Option::is_none"
    )]
    pub dest_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workload_id_list: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub group_by: GroupByMap,
}

impl Span {
    /// Create a span with empty attribute namespaces and zeroed timings.
    pub fn new(
        span_kind: SpanKind,
        service_name: impl Into<String>,
        span_name: impl Into<String>,
        parent_span_id: &str,
    ) -> Self {
        let mut span = Self {
            parent_span_id: String::new(),
            span_kind,
            start_ns: 0,
            latency_ns: 0,
            schema_version: SCHEMA_VERSION.to_string(),
            errors: Vec::new(),
            attributes: AttributeMap::new(),
            resource_attributes: AttributeMap::new(),
            scope_attributes: AttributeMap::new(),
            service_name: service_name.into(),
            span_name: span_name.into(),
            protocol: Protocol::Unknown,
            source_ip: None,
            source: None,
            dest_ip: None,
            destination: None,
            method: None,
            route: None,
            scheme: None,
            path: None,
            query: None,
            status: None,
            username: None,
            workload_id_list: Vec::new(),
            group_by: GroupByMap::new(),
        };
        span.set_parent_span_id(parent_span_id);
        span
    }

    /// Set the parent reference, defaulting an empty id to the root sentinel.
    pub fn set_parent_span_id(&mut self, parent_span_id: &str) {
        self.parent_span_id = if parent_span_id.is_empty() {
            ROOT_PARENT_SPAN_ID.to_string()
        } else {
            parent_span_id.to_string()
        };
    }

    pub fn is_root(&self) -> bool {
        self.parent_span_id == ROOT_PARENT_SPAN_ID
    }

    /// IP of the resource that owns this span.
    ///
    /// Client spans are owned by their source, server spans by their
    /// destination. Any other kind, or a missing address, yields `""`.
    pub fn resource_ip(&self) -> &str {
        let ip = match self.span_kind {
            SpanKind::Client => self.source_ip.as_deref(),
            SpanKind::Server => self.dest_ip.as_deref(),
            _ => None,
        };
        ip.unwrap_or("")
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        serde_json::to_vec(self).map_err(RecordError::Encode)
    }

    /// Decode a span. A missing or empty parent reference becomes
    /// [`ROOT_PARENT_SPAN_ID`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        let mut span: Self = serde_json::from_slice(bytes).map_err(RecordError::Decode)?;
        if span.parent_span_id.is_empty() {
            span.set_parent_span_id("");
        }
        Ok(span)
    }
}
