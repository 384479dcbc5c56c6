//! Infrastructure layer: document storage, command execution, the stock
//! ledger and process configuration.

pub mod command_dispatcher;
pub mod config;
pub mod ledger;
pub mod query;
pub mod store;

pub use command_dispatcher::{CommandDispatcher, DispatchError};
pub use config::{AppConfig, ConfigError};
pub use ledger::StockLedger;
pub use query::{SearchPattern, apply_search};
