//! Database model modules - extends Database with domain-specific methods
//!
//! Each module adds `impl Database` blocks with methods for a specific table group.

mod accounts;   // accounts
mod agent_runs; // agent_runs
mod agents;     // agents
mod auth;       // auth_sessions
mod chats;      // chats, messages, votes
mod companies;  // companies, company_info
mod documents;  // documents, suggestions
mod users;      // users
