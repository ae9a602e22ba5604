pub mod analysis;
pub mod auth;
pub mod config;
pub mod db;
pub mod dialer;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod notify;
pub mod prompts;
pub mod queue;
pub mod routes;
pub mod schema;
pub mod signals;
pub mod state;
pub mod workers;

pub use dispatch::{dispatch_lead, DispatchOutcome};
pub use queue::CampaignQueue;
pub use workers::DialerPool;
