//! Role-configured generation agents.

pub mod analyst;
pub mod error;
pub mod persona;

pub use analyst::{AnalystAgent, AnalystAgentConfig};
pub use error::{AgentResult, GenerationError};
pub use persona::AgentPersona;
