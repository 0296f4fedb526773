use alloy::sol;

sol! {
    /// The subset of the vNFT contract the scanner reads.
    #[sol(rpc)]
    interface IVnft {
        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);

        event VnftConsumed(uint256 nftId, address giver, uint256 itemId);

        function getVnftInfo(uint256 _nftId)
            external
            view
            returns (
                uint256 _vNFT,
                bool _isAlive,
                uint256 _score,
                uint256 _level,
                uint256 _expectedReward,
                uint256 _timeUntilStarving,
                uint256 _lastTimeMined,
                uint256 _timeVnftBorn,
                address _owner,
                address _token,
                uint256 _tokenId,
                string _name
            );
    }
}
