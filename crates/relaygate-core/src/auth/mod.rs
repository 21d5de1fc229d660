//! Bearer token verification for the automation endpoints.

pub mod authorizer;
pub mod cache;
pub mod token;

pub use authorizer::TokenAuthorizer;
pub use cache::SecretCache;
