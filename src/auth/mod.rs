//! # Aphreton Auth Module
//!
//! Bearer token issuance and verification, peppered password hashing and
//! the principal store the dispatcher authenticates against.

pub mod crypto;
pub mod errors;
pub mod jwt;
pub mod principal;

pub use crypto::{constant_time_str_eq, hash_token, PepperedHasher};
pub use errors::{AuthError, AuthResult};
pub use jwt::{
    decode_token, encode_token, now_timestamp, AccessClaims, IssuedToken, RefreshClaims,
    TokenConfig, TokenService,
};
pub use principal::{Principal, PrincipalStore, StoragePrincipalStore};
