//! Adapters implementing `CarrierGateway`: the HTTP client for a real carrier
//! and the in-process sandbox.

pub mod http;
pub mod in_memory;
