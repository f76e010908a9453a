pub mod credentials;
pub mod jwt;
pub mod provider;
pub mod store;

pub use credentials::{Credentials, OAuthGrant};
pub use provider::TokenProvider;
pub use store::{FileTokenStore, StoredTokens, TokenRefreshHandler, TokenRotation};
