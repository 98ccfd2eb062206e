mod account;
mod agent;
mod agent_run;
mod chat;
mod company;
mod document;
mod session;
mod user;

pub use account::{Account, AccountUpdate, NewAccount};
pub use agent::{Agent, AgentUpdate, NewAgent, SearchMode, DEFAULT_SEARCH_TYPE};
pub use agent_run::{AgentRun, AgentRunStatus, NewAgentRun};
pub use chat::{Chat, ChatMessage, Visibility, Vote};
pub use company::{Company, CompanyInfo, CompanyInfoFields};
pub use document::{Document, DocumentKind, NewSuggestion, Suggestion};
pub use session::Session;
pub use user::User;

/// Rows that belong to a single user
pub trait Owned {
    fn owner_id(&self) -> &str;
}

macro_rules! impl_owned {
    ($($ty:ty),*) => {
        $(impl Owned for $ty {
            fn owner_id(&self) -> &str {
                &self.user_id
            }
        })*
    };
}

impl_owned!(Account, Agent, AgentRun, Chat, Company, Document);
