use alloy::primitives::U256;

pub mod multibet_types {
    use alloy::sol;

    sol! {
        #[sol(rpc)]
        interface MultiBetExp {
            function owner() external view returns (address);

            function betCount() external view returns (uint256);

            function getBet(uint256 betId)
                external
                view
                returns (
                    string memory topic,
                    bool isResolved,
                    uint256 totalAmount,
                    string memory winningOption
                );

            function getBetOptionInfos(uint256 betId)
                external
                view
                returns (string[] memory options, uint256[] memory optionBets);

            function createBet(string memory topic, string[] memory options) external;

            function placeBet(uint256 betId, string memory option) external payable;

            function resolveBet(uint256 betId, string memory winningOption) external;
        }
    }
}

/// Registry indices are `uint256` on chain and `u64` everywhere else.
pub fn bet_id_word(id: u64) -> U256 {
    U256::from(id)
}
