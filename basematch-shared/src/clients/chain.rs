//! Read-only access to the BaseMatch contracts, plus EIP-191 signature
//! recovery for wallet ownership proofs.
//!
//! The contracts are deployed and owned elsewhere; this module only knows
//! the view functions the API needs.

use std::str::FromStr;

use alloy::primitives::{Address, PrimitiveSignature, U256};
use alloy::providers::{ProviderBuilder, RootProvider};
use alloy::sol;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use serde::Serialize;

sol! {
    #[sol(rpc)]
    interface IProfileNFT {
        struct Profile {
            uint256 tokenId;
            string name;
            uint256 birthYear;
            string gender;
            string interests;
            string photoUrl;
            string email;
            bool exists;
        }

        function getProfile(address user) external view returns (Profile memory);
    }
}

sol! {
    #[sol(rpc)]
    interface IStaking {
        struct Stake {
            address user1;
            address user2;
            uint256 amount;
            uint256 meetingTime;
            bool user1Staked;
            bool user2Staked;
            bool processed;
        }

        function getStake(uint256 stakeId) external view returns (Stake memory);
    }
}

sol! {
    #[sol(rpc)]
    interface IReputation {
        function getReputation(address user) external view returns (uint256);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("{0} contract address is not configured")]
    NotConfigured(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("contract call failed: {0}")]
    Call(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// Profile as stored by the ProfileNFT contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainProfile {
    pub token_id: String,
    pub name: String,
    pub birth_year: u64,
    pub gender: String,
    pub interests: String,
    pub photo_url: String,
    pub email: String,
}

/// Stake as stored by the Staking contract. Addresses are lowercase hex.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainStake {
    pub user1: String,
    pub user2: String,
    pub amount: String,
    pub meeting_time: u64,
    pub user1_staked: bool,
    pub user2_staked: bool,
    pub processed: bool,
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `None` when the contract reports no profile for `address`.
    async fn get_profile(&self, address: &str) -> Result<Option<ChainProfile>, ChainError>;

    /// `None` when the stake id has never been used on-chain.
    async fn get_stake(&self, stake_id: i64) -> Result<Option<ChainStake>, ChainError>;

    async fn reputation_of(&self, address: &str) -> Result<u64, ChainError>;
}

/// HTTP JSON-RPC reader over the deployed contracts.
pub struct ContractClient {
    provider: RootProvider<Http<Client>>,
    profile_nft: Option<Address>,
    staking: Option<Address>,
    reputation: Option<Address>,
}

impl ContractClient {
    /// Empty contract addresses are allowed; calls against them fail with
    /// [`ChainError::NotConfigured`].
    pub fn new(
        rpc_url: &str,
        profile_nft: &str,
        staking: &str,
        reputation: &str,
    ) -> Result<Self, ChainError> {
        let url = rpc_url
            .parse()
            .map_err(|e| ChainError::InvalidConfig(format!("invalid RPC URL {rpc_url}: {e}")))?;
        let provider = ProviderBuilder::new().on_http(url);

        Ok(Self {
            provider,
            profile_nft: optional_address(profile_nft)?,
            staking: optional_address(staking)?,
            reputation: optional_address(reputation)?,
        })
    }
}

fn optional_address(raw: &str) -> Result<Option<Address>, ChainError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse_address(raw).map(Some)
}

fn parse_address(raw: &str) -> Result<Address, ChainError> {
    Address::from_str(raw.trim()).map_err(|e| ChainError::InvalidAddress(format!("{raw}: {e}")))
}

fn lower_hex(address: Address) -> String {
    address.to_string().to_lowercase()
}

#[async_trait]
impl ChainReader for ContractClient {
    async fn get_profile(&self, address: &str) -> Result<Option<ChainProfile>, ChainError> {
        let contract_address = self.profile_nft.ok_or(ChainError::NotConfigured("ProfileNFT"))?;
        let user = parse_address(address)?;

        let contract = IProfileNFT::new(contract_address, &self.provider);
        let profile = contract
            .getProfile(user)
            .call()
            .await
            .map_err(|e| ChainError::Call(e.to_string()))?
            ._0;

        if !profile.exists {
            return Ok(None);
        }

        Ok(Some(ChainProfile {
            token_id: profile.tokenId.to_string(),
            name: profile.name,
            birth_year: profile.birthYear.saturating_to::<u64>(),
            gender: profile.gender,
            interests: profile.interests,
            photo_url: profile.photoUrl,
            email: profile.email,
        }))
    }

    async fn get_stake(&self, stake_id: i64) -> Result<Option<ChainStake>, ChainError> {
        let contract_address = self.staking.ok_or(ChainError::NotConfigured("Staking"))?;
        let id = u64::try_from(stake_id)
            .map_err(|_| ChainError::Call(format!("stake id {stake_id} is negative")))?;

        let contract = IStaking::new(contract_address, &self.provider);
        let stake = contract
            .getStake(U256::from(id))
            .call()
            .await
            .map_err(|e| ChainError::Call(e.to_string()))?
            ._0;

        if stake.user1 == Address::ZERO {
            return Ok(None);
        }

        Ok(Some(ChainStake {
            user1: lower_hex(stake.user1),
            user2: lower_hex(stake.user2),
            amount: stake.amount.to_string(),
            meeting_time: stake.meetingTime.saturating_to::<u64>(),
            user1_staked: stake.user1Staked,
            user2_staked: stake.user2Staked,
            processed: stake.processed,
        }))
    }

    async fn reputation_of(&self, address: &str) -> Result<u64, ChainError> {
        let contract_address = self.reputation.ok_or(ChainError::NotConfigured("Reputation"))?;
        let user = parse_address(address)?;

        let contract = IReputation::new(contract_address, &self.provider);
        let score = contract
            .getReputation(user)
            .call()
            .await
            .map_err(|e| ChainError::Call(e.to_string()))?
            ._0;

        Ok(score.saturating_to::<u64>())
    }
}

/// Recover the signer of an EIP-191 `personal_sign` message. Returns the
/// address as lowercase hex.
pub fn recover_signer(message: &str, signature_hex: &str) -> Result<String, ChainError> {
    let bytes = hex::decode(signature_hex.trim().trim_start_matches("0x"))
        .map_err(|e| ChainError::InvalidSignature(format!("not hex: {e}")))?;
    let signature = PrimitiveSignature::try_from(bytes.as_slice())
        .map_err(|e| ChainError::InvalidSignature(e.to_string()))?;
    let signer = signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|e| ChainError::InvalidSignature(e.to_string()))?;
    Ok(lower_hex(signer))
}
