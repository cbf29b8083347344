//! Minimal user record. Authentication of dashboard users is an external
//! collaborator's problem; the mediator's side of the contract is lookup
//! only — resolving a credential to an identity the control surface can
//! authorize against.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
}
