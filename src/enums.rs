use std::fmt;
use std::str::FromStr;

use serde::{ Deserialize, Serialize };

use crate::error::AppError;

// ─── Chain ───────────────────────────────────────────────────────────

/// Blockchain networks the balance provider can report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Eth,
    Bsc,
    Polygon,
    Avalanche,
    Fantom,
    Arbitrum,
    Optimism,
}

impl Chain {
    /// Canonical string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Eth => "eth",
            Chain::Bsc => "bsc",
            Chain::Polygon => "polygon",
            Chain::Avalanche => "avalanche",
            Chain::Fantom => "fantom",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
        }
    }

    /// Chain identifier understood by the Moralis API.
    /// Currently the same token we store; kept separate so the two can diverge.
    pub fn provider_id(&self) -> &'static str {
        match self {
            Chain::Eth => "eth",
            Chain::Bsc => "bsc",
            Chain::Polygon => "polygon",
            Chain::Avalanche => "avalanche",
            Chain::Fantom => "fantom",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
        }
    }

    /// Human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Chain::Eth => "Ethereum",
            Chain::Bsc => "BNB Smart Chain",
            Chain::Polygon => "Polygon",
            Chain::Avalanche => "Avalanche",
            Chain::Fantom => "Fantom",
            Chain::Arbitrum => "Arbitrum",
            Chain::Optimism => "Optimism",
        }
    }

    pub fn all() -> &'static [Chain] {
        &[
            Chain::Eth,
            Chain::Bsc,
            Chain::Polygon,
            Chain::Avalanche,
            Chain::Fantom,
            Chain::Arbitrum,
            Chain::Optimism,
        ]
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "eth" => Ok(Chain::Eth),
            "bsc" => Ok(Chain::Bsc),
            "polygon" => Ok(Chain::Polygon),
            "avalanche" => Ok(Chain::Avalanche),
            "fantom" => Ok(Chain::Fantom),
            "arbitrum" => Ok(Chain::Arbitrum),
            "optimism" => Ok(Chain::Optimism),
            _ =>
                Err(
                    AppError::invalid_field(
                        "chain",
                        format!(
                            "Unsupported chain: {}. Supported: eth, bsc, polygon, avalanche, fantom, arbitrum, optimism",
                            s
                        )
                    )
                ),
        }
    }
}
