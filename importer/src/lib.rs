//! Client side of the customer import flow: header pre-check, upload state
//! machine and the transport that talks to the admin proxy.

pub mod auth;
pub mod candidate;
pub mod config;
pub mod headers;
pub mod orchestrator;
pub mod transport;

#[cfg(test)]
pub(crate) mod testutils;
