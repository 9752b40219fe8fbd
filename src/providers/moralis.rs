use std::time::Duration;

use async_trait::async_trait;

use crate::enums::Chain;
use crate::error::{ AppError, Result };

use super::{ BalanceProvider, NetWorthPayload };

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Client for the Moralis wallet net-worth endpoint.
///
/// One best-effort request per call: no retries and no backoff.
#[derive(Clone)]
pub struct MoralisClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MoralisClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = reqwest::Client
            ::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn net_worth_url(&self, address: &str) -> String {
        format!("{}/wallets/{}/net-worth", self.base_url, urlencoding::encode(address))
    }

    async fn request(&self, address: &str, chain: Option<Chain>) -> Result<NetWorthPayload> {
        let mut request = self.client
            .get(self.net_worth_url(address))
            .header("accept", "application/json")
            .header("X-API-Key", &self.api_key);

        match chain {
            Some(chain) => {
                tracing::info!(
                    "Querying Moralis for wallet {} on chain {}",
                    address,
                    chain.provider_id()
                );
                request = request.query(&[("chains", chain.provider_id())]);
            }
            None => {
                tracing::info!("Querying Moralis for wallet {} across all chains", address);
            }
        }

        let response = request
            .send().await
            .map_err(|e| AppError::Provider(format!("Error fetching wallet net worth: {}", e)))?;

        let status = response.status();
        let body = response
            .text().await
            .map_err(|e| AppError::Provider(format!("Error fetching wallet net worth: {}", e)))?;

        tracing::debug!("Moralis API response: {}", body);

        if status != reqwest::StatusCode::OK {
            return Err(AppError::Provider(format!("Moralis API error: {}, {}", status.as_u16(), body)));
        }

        let payload: NetWorthPayload = serde_json
            ::from_str(&body)
            .map_err(|e| AppError::Provider(format!("Error fetching wallet net worth: {}", e)))?;

        if let Some(chain) = chain {
            if payload.chain_entry(chain).is_none() {
                return Err(
                    AppError::Provider(
                        format!(
                            "No data found for chain: {} (Moralis chain ID: {})",
                            chain,
                            chain.provider_id()
                        )
                    )
                );
            }
        }

        Ok(payload)
    }
}

#[async_trait]
impl BalanceProvider for MoralisClient {
    async fn fetch_net_worth(&self, address: &str, chain: Option<Chain>) -> Result<NetWorthPayload> {
        self.request(address, chain).await.inspect_err(|e| {
            tracing::error!("{}", e);
        })
    }
}
