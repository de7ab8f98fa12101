//! Context-attaching sink decorators.

pub mod http;
pub mod network;
