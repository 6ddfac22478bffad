//! Agent module - Hosted agent-memory service abstraction

mod letta;
mod mock_service;
mod service;
mod types;

pub use letta::LettaClient;
pub use mock_service::MockAgentService;
pub use service::AgentService;
pub use types::{AgentContext, AgentReply, AgentSpec, ConversationTurn, MemoryBlock, TurnRole};
