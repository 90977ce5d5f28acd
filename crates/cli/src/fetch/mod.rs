//! HTTP side of `cardtrail`: the campus card portal and the gist
//! credential store.

mod common;
pub mod credentials;
pub mod portal;

pub use credentials::CredentialFlags;
pub use portal::PortalClient;
