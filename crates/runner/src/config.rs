use std::collections::BTreeMap;
use std::fs;

use borrowflow_types::{
    Address, Amount, BorrowflowError, BorrowflowResult, InterestRateMode, DEFAULT_CONFIRMATIONS,
    DEFAULT_REFERRAL_CODE, MAX_CONFIRMATIONS, NATIVE_DECIMALS,
};
use serde::{Deserialize, Serialize};

use crate::simulated::SimulationSeed;

/// Runner configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BorrowflowConfig {
    /// Chain whose network entry is used
    pub chain_id: u64,

    /// Native amount to wrap, in base units (18 decimals)
    pub wrap_amount: String,

    /// Rate mode used for the borrow and the matching repay
    #[serde(default = "default_rate_mode")]
    pub interest_rate_mode: InterestRateMode,

    #[serde(default)]
    pub referral_code: u16,

    /// Whether to repay the borrow at the end of the run
    #[serde(default = "default_repay")]
    pub repay: bool,

    /// Contract addresses per chain id
    pub networks: BTreeMap<String, NetworkConfig>,

    /// Seed for the in-memory ledger used by `--simulate`
    #[serde(default)]
    pub simulation: SimulationSeed,
}

/// Contract addresses for one chain
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Network name for logging
    pub name: String,

    /// Wrapped native token (WETH)
    pub wrapped_asset: Address,

    /// Lending pool addresses provider
    pub addresses_provider: Address,

    /// Asset deposited as collateral; the wrapped asset when omitted
    #[serde(default)]
    pub collateral_asset: Option<Address>,

    /// Asset to borrow
    pub borrow_asset: Address,

    /// Feed pricing the borrow asset in the valuation unit
    pub price_feed: Address,

    /// Blocks to wait on top of each transaction
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
}

/// Everything one workflow run needs, resolved from [`BorrowflowConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub wrapped_asset: Address,
    pub addresses_provider: Address,
    pub collateral_asset: Address,
    pub borrow_asset: Address,
    pub price_feed: Address,
    pub wrap_amount: Amount,
    pub confirmations: u64,
    pub interest_rate_mode: InterestRateMode,
    pub referral_code: u16,
    pub repay: bool,
}

fn default_rate_mode() -> InterestRateMode {
    InterestRateMode::Stable
}

fn default_repay() -> bool {
    true
}

fn default_confirmations() -> u64 {
    DEFAULT_CONFIRMATIONS
}

impl BorrowflowConfig {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> BorrowflowResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BorrowflowError::invalid_configuration("config", &format!("failed to read {}: {}", path, e))
        })?;

        let config: BorrowflowConfig = toml::from_str(&content).map_err(|e| {
            BorrowflowError::invalid_configuration("config", &format!("failed to parse {}: {}", path, e))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &str) -> BorrowflowResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            BorrowflowError::invalid_configuration("config", &format!("failed to serialize: {}", e))
        })?;
        fs::write(path, content).map_err(|e| {
            BorrowflowError::invalid_configuration("config", &format!("failed to write {}: {}", path, e))
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> BorrowflowResult<()> {
        self.workflow_config()?.validate()
    }

    /// Network entry for the configured chain
    pub fn network(&self) -> BorrowflowResult<&NetworkConfig> {
        self.networks.get(&self.chain_id.to_string()).ok_or_else(|| {
            BorrowflowError::invalid_configuration(
                "networks",
                &format!("no entry for chain id {}", self.chain_id),
            )
        })
    }

    /// Resolve the selected network into an explicit workflow configuration
    pub fn workflow_config(&self) -> BorrowflowResult<WorkflowConfig> {
        let network = self.network()?;
        let wrap_amount = Amount::parse(&self.wrap_amount, NATIVE_DECIMALS)?;

        Ok(WorkflowConfig {
            wrapped_asset: network.wrapped_asset,
            addresses_provider: network.addresses_provider,
            collateral_asset: network.collateral_asset.unwrap_or(network.wrapped_asset),
            borrow_asset: network.borrow_asset,
            price_feed: network.price_feed,
            wrap_amount,
            confirmations: network.confirmations,
            interest_rate_mode: self.interest_rate_mode,
            referral_code: self.referral_code,
            repay: self.repay,
        })
    }
}

impl WorkflowConfig {
    /// Validate configuration
    pub fn validate(&self) -> BorrowflowResult<()> {
        let addresses = [
            ("wrapped_asset", &self.wrapped_asset),
            ("addresses_provider", &self.addresses_provider),
            ("collateral_asset", &self.collateral_asset),
            ("borrow_asset", &self.borrow_asset),
            ("price_feed", &self.price_feed),
        ];
        for (name, address) in addresses {
            if address.is_zero() {
                return Err(BorrowflowError::invalid_configuration(name, "zero address"));
            }
        }

        if self.wrap_amount.is_zero() {
            return Err(BorrowflowError::invalid_configuration("wrap_amount", "must be greater than 0"));
        }

        if self.wrap_amount.decimals() != NATIVE_DECIMALS {
            return Err(BorrowflowError::invalid_configuration(
                "wrap_amount",
                &format!("must be expressed at {} decimals", NATIVE_DECIMALS),
            ));
        }

        if self.confirmations == 0 || self.confirmations > MAX_CONFIRMATIONS {
            return Err(BorrowflowError::invalid_configuration(
                "confirmations",
                &format!("{} not in [1, {}]", self.confirmations, MAX_CONFIRMATIONS),
            ));
        }

        Ok(())
    }
}

impl Default for BorrowflowConfig {
    fn default() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert("31337".to_string(), NetworkConfig::default());

        Self {
            chain_id: 31337,
            wrap_amount: "100000000000000000".to_string(), // 0.1 ETH
            interest_rate_mode: InterestRateMode::Stable,
            referral_code: DEFAULT_REFERRAL_CODE,
            repay: true,
            networks,
            simulation: SimulationSeed::default(),
        }
    }
}

impl Default for NetworkConfig {
    /// Mainnet fork addresses (Aave V2, WETH, DAI, DAI/ETH feed)
    fn default() -> Self {
        Self {
            name: "localhost".to_string(),
            wrapped_asset: Address::from_bytes([
                0xc0, 0x2a, 0xaa, 0x39, 0xb2, 0x23, 0xfe, 0x8d, 0x0a, 0x0e, 0x5c, 0x4f, 0x27,
                0xea, 0xd9, 0x08, 0x3c, 0x75, 0x6c, 0xc2,
            ]),
            addresses_provider: Address::from_bytes([
                0xb5, 0x3c, 0x1a, 0x33, 0x01, 0x6b, 0x2d, 0xc2, 0xff, 0x36, 0x53, 0x53, 0x0b,
                0xff, 0x18, 0x48, 0xa5, 0x15, 0xc8, 0xc5,
            ]),
            collateral_asset: None,
            borrow_asset: Address::from_bytes([
                0x6b, 0x17, 0x54, 0x74, 0xe8, 0x90, 0x94, 0xc4, 0x4d, 0xa9, 0x8b, 0x95, 0x4e,
                0xed, 0xea, 0xc4, 0x95, 0x27, 0x1d, 0x0f,
            ]),
            price_feed: Address::from_bytes([
                0x77, 0x36, 0x16, 0xe4, 0xd1, 0x1a, 0x78, 0xf5, 0x11, 0x29, 0x90, 0x02, 0xda,
                0x57, 0xa0, 0xa9, 0x45, 0x77, 0xf1, 0xf4,
            ]),
            confirmations: DEFAULT_CONFIRMATIONS,
        }
    }
}

/// Create example configuration file
pub fn create_example_config(path: &str) -> BorrowflowResult<()> {
    BorrowflowConfig::default().save(path)
}
