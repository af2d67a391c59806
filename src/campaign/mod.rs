//! Campaign resolution: contact table, agents, filters and templates.
//!
//! Raw rows flow through each agent's filter and templates to produce a
//! concrete recipient list:
//! 1. `Table`: validated columns and rows
//! 2. `filter::matches()`: audience segment
//! 3. `template::render()`: `{{Placeholder}}` substitution
//! 4. `resolver`: per-agent recipients, batches and the distinct count

pub mod agent;
pub mod filter;
pub mod resolver;
pub mod table;
pub mod template;

pub use agent::{AgentDefinition, AgentFilter, FilterOperator};
pub use resolver::{AgentBatch, AgentPreview, Recipient};
pub use table::{Row, Table, TableInput};
