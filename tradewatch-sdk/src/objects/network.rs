use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Blockchain networks understood by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Network {
    Eth,
    Btc,
    Sol,
    Ltc,
}

impl Network {
    pub const ALL: [Network; 4] = [Network::Eth, Network::Btc, Network::Sol, Network::Ltc];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Eth => "ETH",
            Network::Btc => "BTC",
            Network::Sol => "SOL",
            Network::Ltc => "LTC",
        }
    }

    /// Bitcoin and Litecoin share the UTXO payload and RPC shape.
    pub fn is_utxo(&self) -> bool {
        matches!(self, Network::Btc | Network::Ltc)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported network: {0}")]
pub struct UnknownNetwork(pub String);

impl FromStr for Network {
    type Err = UnknownNetwork;

    /// Case-insensitive: monitors send `eth`, `ETH` and `Eth` interchangeably.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL
            .into_iter()
            .find(|n| n.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownNetwork(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_any_case() {
        assert_eq!("eth".parse::<Network>(), Ok(Network::Eth));
        assert_eq!("Btc".parse::<Network>(), Ok(Network::Btc));
        assert_eq!(" SOL ".parse::<Network>(), Ok(Network::Sol));
        assert_eq!("ltc".parse::<Network>(), Ok(Network::Ltc));
    }

    #[test]
    fn rejects_unknown() {
        let err = "DOGE".parse::<Network>().unwrap_err();
        assert_eq!(err.to_string(), "unsupported network: DOGE");
        assert!("".parse::<Network>().is_err());
    }

    #[test]
    fn serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Network::Ltc).unwrap(), "\"LTC\"");
        let n: Network = serde_json::from_str("\"SOL\"").unwrap();
        assert_eq!(n, Network::Sol);
    }
}
