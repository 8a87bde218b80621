//! Shared vocabulary for the focus workspace: branded identifiers, domain
//! entities, the actor-attribution model, action-ledger types, and the tool
//! trait exposed to agents.

pub mod action;
pub mod actor;
pub mod domain;
pub mod ids;
pub mod tools;
