//! Wayfarer core: multi-agent travel planning coordination.
//!
//! Provides the message envelope codec, the remote agent connection, the
//! capability agents and the coordinator that fans a trip request out to
//! hotel and car rental peers and folds their answers into one plan.

pub mod agent;
pub mod collaborator;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod prompt;
pub mod protocol;
pub mod registry;

// Re-export commonly used types
pub use agent::{BookingDesk, CapabilityAgent, TaskState};
pub use collaborator::{Completion, SearchHit, WebSearch};
pub use config::{PeerConfig, PlannerConfig, StrategyChoice};
pub use connection::{RemoteAgentConnection, Transport};
pub use coordinator::{Coordinator, PlannerStrategy};
pub use error::{Error, Result};
pub use protocol::{
    AgentDescriptor, AgentStatus, AggregatedPlan, BudgetTier, CapabilityResult, Envelope,
    ResultItem, TaskStatus, TripRequest,
};
pub use registry::{AgentCard, TravelCapability};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
