//! Authentication for the SPGCI API.
//!
//! The API issues bearer tokens in exchange for a username and password
//! posted to `{base_url}/auth/api`. [`TokenManager`] performs that exchange
//! lazily, caches the token for the credential triple that produced it and
//! drops it again when the server rejects it.
//!
//! Callers rarely use this module directly: [`SpgciClient`](crate::SpgciClient)
//! owns a token manager and resolves a token before every request. A
//! pre-issued token can be supplied with
//! [`ClientConfig::with_token`](crate::ClientConfig::with_token), which
//! bypasses the exchange entirely.
//!
//! ```no_run
//! use spgci_rs::{ClientConfig, SpgciClient};
//!
//! # async fn example() -> spgci_rs::Result<()> {
//! let client = SpgciClient::new(ClientConfig::new("username", "password"))?;
//! let token = client.token().await?;
//! # Ok(())
//! # }
//! ```

mod token;

pub use token::{TokenManager, AUTH_PATH};
