//! Minimal Intersight API client and inventory models.
//!
//! Only the two resource collections required by the commands in this
//! crate are modeled; everything else about the API is left alone.
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::signing::SigningKey;
use crate::types::{UtilError, UtilResult};
use crate::walker::MoWalker;

/// Resource path of the chassis collection.
pub const CHASSIS_PATH: &str = "equipment/Chasses";

/// Resource path of the blade server collection.
pub const BLADES_PATH: &str = "compute/Blades";

/// A chassis as returned by `equipment/Chasses`.
///
/// `oper_state` distinguishes a missing attribute (`None`) from an
/// explicit `null` (`Some(None)`).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Chassis {
    pub moid: Option<String>,
    pub name: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub oper_state: Option<Option<String>>,
}

/// A blade server as returned by `compute/Blades`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Blade {
    pub moid: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub slot_id: Option<Value>,
}

/// Page of managed objects returned by a list call.
#[derive(Deserialize)]
pub struct MoList<T> {
    #[serde(rename = "Results")]
    pub results: Option<Vec<T>>,
}

/// Marks a present attribute as `Some`, even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Query options for a list call, mapped to `$filter` and `$select`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    pub filter: Option<String>,
    pub select: Option<String>,
}

impl Query {
    /// Constructs an empty `Query`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the `$filter` expression.
    pub fn filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the `$select` property list.
    pub fn select<S: Into<String>>(mut self, select: S) -> Self {
        self.select = Some(select.into());
        self
    }
}

/// Builds an OData equality term, escaping quotes in the value.
pub fn eq(field: &str, value: &str) -> String {
    format!("{} eq '{}'", field, value.replace('\'', "''"))
}

/// Joins filter terms with `and`, returning `None` for no terms.
pub fn and<I, S>(terms: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = terms
        .into_iter()
        .map(|term| term.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" and ");

    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Inventory operations required by the subcommands.
///
/// This is implemented by `IntersightClient`, but kept as a trait so that
/// command logic can be exercised against an in-memory inventory.
#[async_trait]
pub trait Inventory: Sync {
    /// Lists all chassis matching the query.
    async fn chassis(&self, query: &Query) -> UtilResult<Vec<Chassis>>;

    /// Lists all blades matching the query.
    async fn blades(&self, query: &Query) -> UtilResult<Vec<Blade>>;
}

/// Authenticated client against an Intersight endpoint.
pub struct IntersightClient {
    http: Client,
    base: Url,
    key: SigningKey,
}

impl IntersightClient {
    /// Constructs a new client for the endpoint, signing with `key`.
    pub fn new(endpoint: &str, key: SigningKey, ignore_tls: bool) -> UtilResult<Self> {
        let base = Url::parse(endpoint)
            .and_then(|url| url.join("/api/v1/"))
            .map_err(|err| UtilError::config(format!("Invalid endpoint '{}': {}", endpoint, err)))?;

        if base.host_str().is_none() {
            return Err(UtilError::config(format!("Endpoint '{}' has no host", endpoint)));
        }

        if ignore_tls {
            warn!("TLS certificate verification is disabled");
        }

        let http = Client::builder()
            .danger_accept_invalid_certs(ignore_tls)
            .build()?;

        Ok(Self { http, base, key })
    }

    /// Constructs the full URL of a page request.
    pub fn page_url(&self, path: &str, query: &Query, skip: usize, top: usize) -> UtilResult<Url> {
        let mut url = self
            .base
            .join(path)
            .map_err(|err| UtilError::config(format!("Invalid resource path '{}': {}", path, err)))?;

        {
            let mut pairs = url.query_pairs_mut();
            if let Some(filter) = &query.filter {
                pairs.append_pair("$filter", filter);
            }
            if let Some(select) = &query.select {
                pairs.append_pair("$select", select);
            }
            pairs.append_pair("$top", &top.to_string());
            pairs.append_pair("$skip", &skip.to_string());
        }

        Ok(url)
    }

    /// Fetches a single page of a resource collection.
    pub async fn page<T>(&self, path: &str, query: &Query, skip: usize, top: usize) -> UtilResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.page_url(path, query, skip, top)?;
        let headers = self.key.sign("GET", &target(&url), &host(&url), b"")?;

        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .header("Date", headers.date)
            .header("Digest", headers.digest)
            .header("Authorization", headers.authorization)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(UtilError::from_api(status.as_u16(), &body));
        }

        let body = response.bytes().await?;
        let list: MoList<T> = serde_json::from_slice(&body)?;

        Ok(list.results.unwrap_or_default())
    }

    /// Collects every page of a resource collection.
    async fn collect<T>(&self, path: &'static str, query: &Query) -> UtilResult<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let mut walker = MoWalker::new(self, path, query.clone());
        let mut items = Vec::new();

        while let Some(item) = walker.next().await? {
            items.push(item);
        }

        Ok(items)
    }
}

#[async_trait]
impl Inventory for IntersightClient {
    async fn chassis(&self, query: &Query) -> UtilResult<Vec<Chassis>> {
        self.collect(CHASSIS_PATH, query).await
    }

    async fn blades(&self, query: &Query) -> UtilResult<Vec<Blade>> {
        self.collect(BLADES_PATH, query).await
    }
}

/// Formats the `(request-target)` path and query of a URL.
fn target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

/// Formats the `host` of a URL, including any non-default port.
fn host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}
