//! # Application Module
//!
//! Services orchestrating the domain and outbound ports.

pub mod dispatch;
pub mod eligibility;
pub mod ledger;
pub mod status;

pub use dispatch::{render, BotContext, Dispatcher, Inbound, NetworkReport, Outcome, Reply, Tone};
pub use eligibility::{Authorization, EligibilityConfig, EligibilityEngine, TimedOut};
pub use ledger::{ClaimLedger, ClaimReservation};
pub use status::{StatusSnapshot, StatusTask};
