//! HTTP routes shared by the auth service and the gateway.
//!
//! Auth-specific handlers live in `auth::routes`; the gateway's catch-all
//! routes live in `gateway::routes`.

pub mod health;
