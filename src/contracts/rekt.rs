//! `RektPredictionMarket` ABI bindings
//!
//! Only the surface the agent touches is declared. Selectors and event
//! topics are derived from these signatures, so they must match the
//! deployed contract exactly.

use alloy::sol;
use alloy::sol_types::{decode_revert_reason, Revert, SolError, SolInterface};

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IRektPredictionMarket {
        function markets(uint256 marketId) external view returns (
            uint256 startTime,
            uint256 deadline,
            uint256 entranceFee,
            uint256 finalPrice,
            uint256 totalAmount,
            bool settled,
            string name
        );
        function getMarketPhase(uint256 marketId) external view returns (uint8);
        function getPlayerData(uint256 marketId, address player) external view returns (
            uint256 predictionPrice,
            uint256 timestamp,
            bytes32 data
        );
        function getPlayers(uint256 marketId) external view returns (address[] playerAddresses);
        function getBalance(address user) external view returns (uint256);
        function nextOrderId() external view returns (uint256);

        function createMarket(
            uint256 _startTime,
            uint256 _deadline,
            uint256 _participationFee,
            string _name
        ) external;
        function participateInMarket(uint256 marketId, uint256 predictionPrice, bytes32 _data) external payable;
        function settleMarket(uint256 marketId, uint256 _finalPrice) external;
        function withdrawBalances(uint256 _amount) external;

        event MarketCreated(uint256 indexed marketId, uint256 startTime, uint256 deadline);
        event MarketParticipation(uint256 indexed marketId, address indexed player, uint256 predictionPrice);
        event MarketSettled(
            uint256 indexed marketId,
            address indexed winner,
            uint256 finalPrice,
            uint256 predictionPrice,
            uint256 totalAmount
        );
        event WithdrawBalance(address indexed user, uint256 amount);

        error OwnableInvalidOwner(address owner);
        error OwnableUnauthorizedAccount(address account);
        error ReentrancyGuardReentrantCall();
    }
}

use IRektPredictionMarket::IRektPredictionMarketErrors;

/// Turn raw revert data into a readable reason.
///
/// Handles `Error(string)`, `Panic(uint256)` and the contract's custom errors.
/// Returns `None` when the data matches none of them.
pub fn decode_revert(data: &[u8]) -> Option<String> {
    if data.is_empty() {
        return None;
    }

    if let Ok(custom) = IRektPredictionMarketErrors::abi_decode(data) {
        let reason = match custom {
            IRektPredictionMarketErrors::OwnableInvalidOwner(e) => {
                format!("OwnableInvalidOwner({})", e.owner)
            }
            IRektPredictionMarketErrors::OwnableUnauthorizedAccount(e) => {
                format!("OwnableUnauthorizedAccount({})", e.account)
            }
            IRektPredictionMarketErrors::ReentrancyGuardReentrantCall(_) => {
                "ReentrancyGuardReentrantCall()".to_string()
            }
        };
        return Some(reason);
    }

    // Error(string) carries the contract's message verbatim
    if let Ok(revert) = Revert::abi_decode(data) {
        return Some(revert.reason);
    }

    decode_revert_reason(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, U256};
    use alloy::sol_types::SolCall;

    #[test]
    fn decodes_error_string() {
        let data = Revert {
            reason: "Market already settled".to_string(),
        }
        .abi_encode();
        assert_eq!(
            decode_revert(&data).as_deref(),
            Some("Market already settled")
        );
    }

    #[test]
    fn decodes_custom_error() {
        let err = IRektPredictionMarket::OwnableUnauthorizedAccount {
            account: address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266"),
        };
        let reason = decode_revert(&err.abi_encode()).unwrap();
        assert!(reason.starts_with("OwnableUnauthorizedAccount("));
    }

    #[test]
    fn empty_data_has_no_reason() {
        assert!(decode_revert(&[]).is_none());
    }

    #[test]
    fn participate_calldata_carries_selector() {
        let call = IRektPredictionMarket::participateInMarketCall {
            marketId: U256::from(3),
            predictionPrice: U256::from(10_000_000_000_000u64),
            _data: Default::default(),
        };
        let encoded = call.abi_encode();
        assert_eq!(
            &encoded[..4],
            IRektPredictionMarket::participateInMarketCall::SELECTOR.as_slice()
        );
        // selector + three 32-byte words
        assert_eq!(encoded.len(), 4 + 32 * 3);
    }
}
