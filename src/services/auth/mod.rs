pub mod authorizer;
pub mod error;
pub mod factory;
pub mod key_set;

pub use authorizer::{Audience, ClaimSet, TokenAuthorizer};
pub use error::AuthError;
pub use factory::build_authorizer;
pub use key_set::{KeyResolver, KeySetError, KeySetResolver, SigningKey};
