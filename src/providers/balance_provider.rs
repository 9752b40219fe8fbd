use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{ Deserialize, Deserializer, Serialize };

use crate::enums::Chain;
use crate::error::Result;

/// Net worth of one address on one chain, as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainNetWorth {
    #[serde(default)]
    pub chain: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub balance_usd: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub networth_usd: Option<Decimal>,
}

impl ChainNetWorth {
    /// USD balance to store for this entry.
    ///
    /// `balance_usd` wins when it carries a non-zero amount, otherwise
    /// `networth_usd` is used. A zero `balance_usd`, whether sent as `0` or
    /// `"0.00"`, counts as absent. Anything missing collapses to zero.
    pub fn balance_usd(&self) -> Decimal {
        self.balance_usd
            .filter(|amount| !amount.is_zero())
            .or(self.networth_usd)
            .unwrap_or(Decimal::ZERO)
            .round_dp(2)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetWorthPayload {
    #[serde(default, deserialize_with = "deserialize_entries")]
    pub chains: Vec<ChainNetWorth>,
}

impl NetWorthPayload {
    /// Entry reported under the provider's identifier for `chain`.
    pub fn chain_entry(&self, chain: Chain) -> Option<&ChainNetWorth> {
        self.chains.iter().find(|entry| entry.chain == chain.provider_id())
    }
}

#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Fetch the USD net worth of `address`, optionally restricted to one chain.
    ///
    /// When a chain is given the returned payload is guaranteed to contain an
    /// entry for it.
    async fn fetch_net_worth(&self, address: &str, chain: Option<Chain>) -> Result<NetWorthPayload>;
}

/// Amounts arrive as strings ("42.50"), numbers or null.
fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<Option<Decimal>, D::Error>
    where D: Deserializer<'de>
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_amount))
}

fn parse_amount(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok()
        }
        serde_json::Value::Number(n) => {
            let repr = n.to_string();
            Decimal::from_str(&repr)
                .or_else(|_| Decimal::from_scientific(&repr))
                .ok()
        }
        _ => None,
    }
}

/// Skips entries that are not objects and treats a non-list as empty.
fn deserialize_entries<'de, D>(deserializer: D) -> std::result::Result<Vec<ChainNetWorth>, D::Error>
    where D: Deserializer<'de>
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let entries = match value {
        Some(serde_json::Value::Array(items)) =>
            items
                .into_iter()
                .filter(|item| item.is_object())
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        _ => Vec::new(),
    };
    Ok(entries)
}
