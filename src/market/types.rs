//! Market domain types
//!
//! Numeric fields cross the action boundary as decimal strings so that
//! `uint256` values survive JSON intact.

use crate::config::{AiMarker, PhaseSource};
use crate::{Error, Result};
use alloy::primitives::{hex, TxHash, B256, U256};
use serde::Serialize;

/// Lifecycle phase of a market, as numbered by the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketPhase {
    /// Open for entries
    Prediction = 0,
    /// Closed to entries, not yet resolvable
    Lock = 1,
    /// Resolvable
    Settlement = 2,
}

impl MarketPhase {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(MarketPhase::Prediction),
            1 => Ok(MarketPhase::Lock),
            2 => Ok(MarketPhase::Settlement),
            other => Err(Error::ChainRead(format!(
                "Contract reported unknown market phase {}",
                other
            ))),
        }
    }

    /// Phase from the clock alone.
    ///
    /// `now == deadline` is already SETTLEMENT. The contract may report LOCK
    /// in a window before the deadline; the clock cannot see that window.
    pub fn derive(now: u64, deadline: u64) -> Self {
        if now < deadline {
            MarketPhase::Prediction
        } else {
            MarketPhase::Settlement
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketPhase::Prediction => "PREDICTION",
            MarketPhase::Lock => "LOCK",
            MarketPhase::Settlement => "SETTLEMENT",
        }
    }
}

impl std::fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The 32-byte provenance slot on a player entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuxTag(pub B256);

impl AuxTag {
    pub const ZERO: AuxTag = AuxTag(B256::ZERO);

    /// Parse a caller-supplied tag.
    ///
    /// Empty or omitted is zero. `0x` followed by 64 hex digits is taken
    /// verbatim. Any other text up to 32 bytes is UTF-8 encoded and
    /// right-padded with zeros.
    pub fn parse(input: Option<&str>) -> Result<Self> {
        let Some(input) = input.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::ZERO);
        };

        if let Some(hex_digits) = input.strip_prefix("0x") {
            let bytes = hex::decode(hex_digits)
                .map_err(|e| Error::Validation(format!("Invalid aux data hex: {}", e)))?;
            if bytes.len() != 32 {
                return Err(Error::Validation(format!(
                    "Aux data hex must be exactly 32 bytes, got {}",
                    bytes.len()
                )));
            }
            return Ok(AuxTag(B256::from_slice(&bytes)));
        }

        let bytes = input.as_bytes();
        if bytes.len() > 32 {
            return Err(Error::Validation(format!(
                "Aux data text must fit in 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut padded = [0u8; 32];
        padded[..bytes.len()].copy_from_slice(bytes);
        Ok(AuxTag(B256::from(padded)))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whether this tag marks an agent-originated entry
    pub fn is_agent(&self, marker: AiMarker) -> bool {
        match marker {
            AiMarker::ZeroIsAgent => self.is_zero(),
            AiMarker::NonZeroIsAgent => !self.is_zero(),
        }
    }
}

impl std::fmt::Display for AuxTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// On-chain market record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    pub start_time: u64,
    pub deadline: u64,
    pub entrance_fee: U256,
    pub final_price: U256,
    pub total_amount: U256,
    pub settled: bool,
    pub name: String,
}

/// A player's entry in a market. `timestamp == 0` means no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerEntry {
    pub prediction_price: U256,
    pub timestamp: u64,
    pub aux: AuxTag,
}

impl PlayerEntry {
    pub fn exists(&self) -> bool {
        self.timestamp != 0
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntryView {
    pub prediction_price: String,
    pub timestamp: String,
    pub aux_data: String,
}

impl From<&PlayerEntry> for PlayerEntryView {
    fn from(entry: &PlayerEntry) -> Self {
        Self {
            prediction_price: entry.prediction_price.to_string(),
            timestamp: entry.timestamp.to_string(),
            aux_data: entry.aux.to_string(),
        }
    }
}

/// Read-market result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub market_id: String,
    pub start_time: String,
    pub deadline: String,
    /// Wei
    pub entrance_fee: String,
    pub entrance_fee_eth: String,
    /// 8-decimal price, `0` until settled
    pub final_price: String,
    /// Wei
    pub total_amount: String,
    pub settled: bool,
    pub name: String,
    pub phase: MarketPhase,
    pub phase_source: PhaseSource,
    /// `None` when the caller has no entry in this market
    #[serde(rename = "isPredictedByAI")]
    pub is_predicted_by_ai: Option<bool>,
    pub player_entry: Option<PlayerEntryView>,
    pub player_count: String,
}

/// A transaction the node accepted. Not yet mined.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedTx {
    pub status: &'static str,
    pub confirmed: bool,
    pub tx_hash: TxHash,
    pub chain_id: u64,
}

impl SubmittedTx {
    pub fn new(tx_hash: TxHash, chain_id: u64) -> Self {
        Self {
            status: "submitted",
            confirmed: false,
            tx_hash,
            chain_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMarketSubmission {
    #[serde(flatten)]
    pub tx: SubmittedTx,
    pub name: String,
    pub start_time: String,
    pub deadline: String,
    pub requested_deadline_days: Option<i64>,
    pub effective_deadline_days: i64,
    pub deadline_clamped: bool,
    pub requested_participation_fee: Option<String>,
    /// Wei
    pub participation_fee: String,
    pub participation_fee_eth: String,
    pub fee_clamped: bool,
}

/// Mined `createMarket` with the id the contract assigned
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketCreatedConfirmation {
    pub status: &'static str,
    pub confirmed: bool,
    pub tx_hash: TxHash,
    pub block_number: Option<String>,
    pub market_id: String,
    pub start_time: String,
    pub deadline: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationSubmission {
    #[serde(flatten)]
    pub tx: SubmittedTx,
    pub market_id: String,
    pub prediction_price: String,
    pub requested_entrance_fee: Option<String>,
    /// Wei attached as `msg.value`
    pub value: String,
    pub value_eth: String,
    pub fee_clamped: bool,
    pub aux_data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementSubmission {
    #[serde(flatten)]
    pub tx: SubmittedTx,
    pub market_id: String,
    pub final_price: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalSubmission {
    #[serde(flatten)]
    pub tx: SubmittedTx,
    /// Wei
    pub amount: String,
    pub amount_eth: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentBalance {
    pub address: String,
    /// Wei
    pub balance: String,
    pub balance_eth: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_boundary_at_deadline() {
        let deadline = 1_700_000_000;
        assert_eq!(
            MarketPhase::derive(deadline - 1, deadline),
            MarketPhase::Prediction
        );
        assert_eq!(
            MarketPhase::derive(deadline, deadline),
            MarketPhase::Settlement
        );
        assert_eq!(
            MarketPhase::derive(deadline + 1, deadline),
            MarketPhase::Settlement
        );
    }

    #[test]
    fn phase_from_contract_value() {
        assert_eq!(MarketPhase::from_u8(1).unwrap(), MarketPhase::Lock);
        assert!(matches!(MarketPhase::from_u8(3), Err(Error::ChainRead(_))));
        assert_eq!(
            serde_json::to_value(MarketPhase::Settlement).unwrap(),
            "SETTLEMENT"
        );
    }

    #[test]
    fn aux_tag_defaults_to_zero() {
        assert!(AuxTag::parse(None).unwrap().is_zero());
        assert!(AuxTag::parse(Some("  ")).unwrap().is_zero());
    }

    #[test]
    fn aux_tag_text_is_right_padded() {
        let tag = AuxTag::parse(Some("human")).unwrap();
        assert_eq!(&tag.0[..5], b"human");
        assert!(tag.0[5..].iter().all(|b| *b == 0));
        assert!(tag.to_string().starts_with("0x68756d616e00"));
    }

    #[test]
    fn aux_tag_hex_must_be_32_bytes() {
        let full = format!("0x{}", "ab".repeat(32));
        assert_eq!(AuxTag::parse(Some(&full)).unwrap().to_string(), full);

        assert!(matches!(
            AuxTag::parse(Some("0xabcd")),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            AuxTag::parse(Some(&"x".repeat(33))),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn ai_marker_conventions() {
        let zero = AuxTag::ZERO;
        let tagged = AuxTag::parse(Some("human")).unwrap();
        assert!(zero.is_agent(AiMarker::ZeroIsAgent));
        assert!(!tagged.is_agent(AiMarker::ZeroIsAgent));
        assert!(!zero.is_agent(AiMarker::NonZeroIsAgent));
        assert!(tagged.is_agent(AiMarker::NonZeroIsAgent));
    }

    #[test]
    fn submitted_tx_says_unconfirmed() {
        let tx = SubmittedTx::new(TxHash::ZERO, 84532);
        let value = serde_json::to_value(&tx).unwrap();
        assert_eq!(value["status"], "submitted");
        assert_eq!(value["confirmed"], false);
        assert_eq!(value["chainId"], 84532);
    }
}
