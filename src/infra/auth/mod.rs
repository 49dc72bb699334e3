//! Authorizer backends.

pub mod memory;

pub use memory::StaticAuthorizer;
