pub mod agent;
pub mod config;
pub mod item;
pub mod session;

pub use agent::{AgentHandle, AgentSpec, OutputContract};
pub use config::{
    Config, ConnectorConfig, LimitsConfig, LoggingConfig, ModelConfig, RetryConfig, RoutineConfig,
    SessionConfig,
};
pub use item::{DispatchResult, RunItem, TurnSignal};
pub use session::{Turn, TurnRole};
