mod auth;
mod store;

pub use auth::Access;
pub use auth::EXPIRY_MARGIN_SECS;
pub use auth::TokenManager;
pub use auth::TokenState;
pub use auth::TokenStatus;
pub use store::CredentialEdit;
pub use store::CredentialStore;
pub use store::FileStore;
pub use store::MemoryStore;
pub use store::StoreError;
