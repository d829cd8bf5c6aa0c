pub mod authorization;
pub mod config;
pub mod error;
pub mod gateway;
pub mod oracle;
pub mod pool;
pub mod simulated;
pub mod workflow;
pub mod wrapper;

pub use authorization::Authorizer;
pub use config::{create_example_config, BorrowflowConfig, NetworkConfig, WorkflowConfig};
pub use error::WorkflowError;
pub use gateway::{read_allowance, read_decimals, read_token_balance, submit_and_confirm, LedgerGateway};
pub use oracle::PriceOracle;
pub use pool::{PoolHandle, PoolResolver};
pub use simulated::{LedgerEvent, LedgerEventKind, ReserveConfig, SimulatedLedger, SimulationSeed};
pub use workflow::{PositionWorkflow, WorkflowReport, WorkflowState};
pub use wrapper::{AssetWrapper, WrappedBalance};
