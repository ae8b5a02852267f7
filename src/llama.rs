use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

const BASE_URL: &str = "https://api.llama.fi";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// One record of a protocol's TVL series. The API reports the value as
/// `totalLiquidityUSD` inside `/protocol/{name}` responses.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TvlPoint {
    #[serde(deserialize_with = "timestamp")]
    pub date: i64,
    #[serde(alias = "totalLiquidityUSD")]
    pub tvl: f64,
}

/// One record of the aggregate (`/charts`) or single-chain
/// (`/charts/{chain}`) series. Both fields are kept under their source names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    #[serde(deserialize_with = "timestamp")]
    pub date: i64,
    #[serde(rename = "totalLiquidityUSD")]
    pub total_liquidity_usd: f64,
}

/// An aggregate or single-chain series together with the raw body it was
/// decoded from, so callers can dump the body exactly as the API sent it.
#[derive(Debug)]
pub struct Chart {
    pub raw: serde_json::Value,
    pub points: Vec<ChartPoint>,
}

impl Chart {
    fn from_raw(raw: serde_json::Value) -> Result<Self> {
        let points = serde_json::from_value(raw.clone())?;
        Ok(Chart { raw, points })
    }
}

/// `/protocol/{name}` body: an object carrying the `tvl` series (the live
/// API, which also attaches chain/token breakdowns we ignore) or a bare
/// array of records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProtocolResponse {
    Detailed { tvl: Vec<TvlPoint> },
    Series(Vec<TvlPoint>),
}

impl ProtocolResponse {
    fn into_series(self) -> Vec<TvlPoint> {
        match self {
            ProtocolResponse::Detailed { tvl } => tvl,
            ProtocolResponse::Series(points) => points,
        }
    }
}

// `/charts` serializes dates as decimal strings, `/protocol/{name}` as
// numbers.
fn timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Ok(n),
        Raw::Float(f) => Ok(f as i64),
        Raw::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// DeFiLlama API client. One connection-pooling session reused for every
/// request of the run.
pub struct DefiLlama {
    client: Client,
    base_url: String,
}

impl DefiLlama {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(DefiLlama {
            client,
            base_url: base_url.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let res = self.client.get(&url).send().await?;

        res.error_for_status_ref()?;

        Ok(res.json().await?)
    }

    /// Historical liquidity/TVL of a named protocol. GET /protocol/{name}
    pub async fn get_protocol(&self, name: &str) -> Result<Vec<TvlPoint>> {
        let resp: ProtocolResponse = self.get_json(&format!("/protocol/{}", name)).await?;
        Ok(resp.into_series())
    }

    /// Historical sum of TVLs across all listed protocols. GET /charts
    pub async fn get_historical_tvl(&self) -> Result<Chart> {
        Chart::from_raw(self.get_json("/charts").await?)
    }

    /// Historical TVL of a single chain. GET /charts/{chain}
    ///
    /// Chain names are case-sensitive and passed through unvalidated; an
    /// unknown name yields whatever the API answers for it.
    pub async fn get_historical_tvl_chain(&self, name: &str) -> Result<Chart> {
        Chart::from_raw(self.get_json(&format!("/charts/{}", name)).await?)
    }
}
