//! network, asset and lifecycle configuration
//!
//! everything a run needs is passed in explicitly as a `LendingConfig`,
//! usually loaded from a toml file.

use crate::error::ConfigError;
use crate::identity::{AccountAddress, Identity, IdentityRegistry, Role};
use crate::ledger::{TxOptions, WaitOptions};
use crate::payload::{ModuleId, TypeTag};

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// address the lending module is deployed at on devnet, used by the presets
pub const SEKIE_MODULE_ADDRESS: AccountAddress = AccountAddress::new([
    0x27, 0xb8, 0x41, 0x57, 0x02, 0xfc, 0x14, 0xfc, 0x7f, 0x13, 0x45, 0xb5, 0x19, 0xbf, 0x1b, 0xbe,
    0x0b, 0x6f, 0x71, 0x87, 0x93, 0xca, 0x1d, 0x69, 0xfa, 0x0e, 0x59, 0xc3, 0x07, 0xce, 0x8e, 0xae,
]);

pub const SEKIE_MODULE_NAME: &str = "sekie";

fn default_module_name() -> String {
    SEKIE_MODULE_NAME.into()
}

fn default_coin_type() -> TypeTag {
    TypeTag::aptos_coin()
}

fn default_max_gas_amount() -> u64 {
    TxOptions::default().max_gas_amount
}

fn default_gas_unit_price() -> u64 {
    TxOptions::default().gas_unit_price
}

fn default_expiration_secs() -> u64 {
    TxOptions::default().expiration_secs
}

fn default_confirmation_timeout_secs() -> u64 {
    20
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_supply() -> u64 {
    1
}

/// fullnode and module coordinates
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// fullnode rest endpoint
    pub node_url: String,
    /// where the lending module is published, always supplied explicitly in toml
    pub module_address: AccountAddress,
    #[serde(default = "default_module_name")]
    pub module_name: String,
    /// base currency the pool lends
    #[serde(default = "default_coin_type")]
    pub coin_type: TypeTag,
    #[serde(default = "default_max_gas_amount")]
    pub max_gas_amount: u64,
    #[serde(default = "default_gas_unit_price")]
    pub gas_unit_price: u64,
    #[serde(default = "default_expiration_secs")]
    pub expiration_secs: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// bound on a single http round-trip
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl NetworkConfig {
    fn with_node(node_url: &str) -> Self {
        Self {
            node_url: node_url.into(),
            module_address: SEKIE_MODULE_ADDRESS,
            module_name: default_module_name(),
            coin_type: default_coin_type(),
            max_gas_amount: default_max_gas_amount(),
            gas_unit_price: default_gas_unit_price(),
            expiration_secs: default_expiration_secs(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn devnet() -> Self {
        Self::with_node("https://fullnode.devnet.aptoslabs.com")
    }

    pub fn testnet() -> Self {
        Self::with_node("https://fullnode.testnet.aptoslabs.com")
    }

    /// set `module_address` to the mainnet deployment before use
    pub fn mainnet() -> Self {
        Self::with_node("https://fullnode.mainnet.aptoslabs.com")
    }

    /// local node started with `aptos node run-local-testnet`
    pub fn local() -> Self {
        Self::with_node("http://127.0.0.1:8080")
    }

    /// rest api base, `/v1` appended when missing
    pub fn api_url(&self) -> String {
        let base = self.node_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            base.to_string()
        } else {
            format!("{}/v1", base)
        }
    }

    pub fn module(&self) -> ModuleId {
        ModuleId::new(self.module_address, self.module_name.clone())
    }

    pub fn tx_options(&self) -> TxOptions {
        TxOptions {
            max_gas_amount: self.max_gas_amount,
            gas_unit_price: self.gas_unit_price,
            expiration_secs: self.expiration_secs,
        }
    }

    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout: Duration::from_secs(self.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            require_success: true,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::devnet()
    }
}

/// collateral collection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    /// unique within the creator's namespace
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub uri: String,
}

/// collateral token within the collection
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub uri: String,
    /// 1 for a true non-fungible unit
    #[serde(default = "default_supply")]
    pub supply: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    /// loan duration window
    pub duration: u64,
    /// interest/fee parameter
    pub fee: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferParams {
    /// deposit in the coin's smallest unit
    pub amount: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectParams {
    #[serde(default)]
    pub token_index: u64,
}

/// hex key triple as exported by wallets
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub address: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub private_key: String,
}

impl IdentityConfig {
    pub fn to_identity(&self, role: Role) -> Result<Identity, ConfigError> {
        Identity::from_hex(role, &self.address, &self.public_key, &self.private_key).map_err(|source| {
            ConfigError::Identity {
                role: role.as_str(),
                source,
            }
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IdentitiesConfig {
    pub lender: IdentityConfig,
    pub borrower: IdentityConfig,
    pub admin: IdentityConfig,
}

/// on-disk form of `LendingConfig`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LendingConfigFile {
    pub network: NetworkConfig,
    pub identities: IdentitiesConfig,
    pub collection: CollectionDescriptor,
    pub token: TokenDescriptor,
    pub pool: PoolParams,
    pub offer: OfferParams,
    #[serde(default)]
    pub select: SelectParams,
}

/// resolved configuration of one run
#[derive(Debug)]
pub struct LendingConfig {
    pub network: NetworkConfig,
    pub identities: IdentityRegistry,
    pub collection: CollectionDescriptor,
    pub token: TokenDescriptor,
    pub pool: PoolParams,
    pub offer: OfferParams,
    pub select: SelectParams,
}

impl LendingConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let file: LendingConfigFile = toml::from_str(s)?;
        Self::try_from(file)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.collection.name.is_empty() {
            return Err(ConfigError::Invalid("collection name is empty".into()));
        }
        if self.token.name.is_empty() {
            return Err(ConfigError::Invalid("token name is empty".into()));
        }
        if self.token.supply == 0 {
            return Err(ConfigError::Invalid("token supply must be at least 1".into()));
        }
        if self.network.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll interval must be non-zero".into()));
        }
        if self.network.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request timeout must be non-zero".into()));
        }
        Ok(())
    }
}

impl TryFrom<LendingConfigFile> for LendingConfig {
    type Error = ConfigError;

    fn try_from(file: LendingConfigFile) -> Result<Self, Self::Error> {
        let identities = IdentityRegistry::new(
            file.identities.lender.to_identity(Role::Lender)?,
            file.identities.borrower.to_identity(Role::Borrower)?,
            file.identities.admin.to_identity(Role::Administrator)?,
        );

        let config = Self {
            network: file.network,
            identities,
            collection: file.collection,
            token: file.token,
            pool: file.pool,
            offer: file.offer,
            select: file.select,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [network]
        node_url = "https://fullnode.devnet.aptoslabs.com/"
        module_address = "0x27b8415702fc14fc7f1345b519bf1bbe0b6f718793ca1d69fa0e59c307ce8eae"

        [identities.lender]
        address = "0x1"
        [identities.borrower]
        address = "0x2"
        [identities.admin]
        address = "0x3"
        public_key = ""
        private_key = ""

        [collection]
        name = "Vinh Don Lua"
        description = "Thich don lua vl"
        uri = "https://gamefi.org/api/v1/boxes/9"

        [token]
        name = "Vinh Don Lua Token"
        description = "Thich don lua vl"
        uri = "https://gamefi.org/api/v1/boxes/10"

        [pool]
        duration = 180
        fee = 7

        [offer]
        amount = 80000000
    "#;

    #[test]
    fn test_parse_sample() {
        let config = LendingConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.network.module_address, SEKIE_MODULE_ADDRESS);
        assert_eq!(config.network.module_name, "sekie");
        assert_eq!(config.network.coin_type, TypeTag::aptos_coin());
        assert_eq!(config.network.api_url(), "https://fullnode.devnet.aptoslabs.com/v1");
        assert_eq!(config.token.supply, 1);
        assert_eq!(config.pool, PoolParams { duration: 180, fee: 7 });
        assert_eq!(config.offer.amount, 80_000_000);
        assert_eq!(config.select.token_index, 0);
        assert_eq!(config.network.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.identities.get(Role::Borrower).address(), &AccountAddress::from_hex("0x2").unwrap());
    }

    #[test]
    fn test_module_address_constant() {
        assert_eq!(
            SEKIE_MODULE_ADDRESS.to_hex(),
            "0x27b8415702fc14fc7f1345b519bf1bbe0b6f718793ca1d69fa0e59c307ce8eae"
        );
        assert_eq!(
            NetworkConfig::devnet().module().to_string(),
            "0x27b8415702fc14fc7f1345b519bf1bbe0b6f718793ca1d69fa0e59c307ce8eae::sekie"
        );
    }

    #[test]
    fn test_presets() {
        assert_eq!(NetworkConfig::testnet().api_url(), "https://fullnode.testnet.aptoslabs.com/v1");
        assert_eq!(NetworkConfig::mainnet().api_url(), "https://fullnode.mainnet.aptoslabs.com/v1");
        assert_eq!(NetworkConfig::mainnet().coin_type, TypeTag::aptos_coin());
        assert_eq!(NetworkConfig::default(), NetworkConfig::devnet());
    }

    #[test]
    fn test_module_address_required() {
        let text = SAMPLE.replace(
            "module_address = \"0x27b8415702fc14fc7f1345b519bf1bbe0b6f718793ca1d69fa0e59c307ce8eae\"\n",
            "",
        );
        assert_ne!(text, SAMPLE);
        let err = LendingConfig::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_network_rejected() {
        let text = SAMPLE.replacen("[network]", "[unused]", 1);
        let err = LendingConfig::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_api_url_keeps_v1() {
        let mut network = NetworkConfig::local();
        network.node_url = "http://127.0.0.1:8080/v1/".into();
        assert_eq!(network.api_url(), "http://127.0.0.1:8080/v1");
    }

    #[test]
    fn test_zero_supply_rejected() {
        let text = SAMPLE.replace(
            "uri = \"https://gamefi.org/api/v1/boxes/10\"",
            "uri = \"https://gamefi.org/api/v1/boxes/10\"\nsupply = 0",
        );
        let err = LendingConfig::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_identity_address() {
        let text = SAMPLE.replace("address = \"0x1\"", "address = \"\"");
        let err = LendingConfig::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, ConfigError::Identity { role: "lender", .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = LendingConfig::load(file.path()).unwrap();
        assert_eq!(config.collection.name, "Vinh Don Lua");
    }
}
