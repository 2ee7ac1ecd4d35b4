#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod flow;
pub mod gateway;
pub mod identifier;
pub mod secret;
pub mod stream;
pub mod types;

#[cfg(feature = "logger")]
mod logger;
#[cfg(feature = "memory")]
pub mod memory;

// Re-export core public API at crate root.
pub use error::{Collaborator, Error, Result};
pub use flow::{DiscoveryFlow, EmailValidationHandle};
pub use gateway::{Gateway, PhoneTokenResponse};
pub use identifier::{ThreePid, international_format};
pub use secret::generate_client_secret;
pub use stream::Subscription;
pub use types::{DisplayMode, Medium, PendingValidation, ViewAction, ViewState};

#[cfg(feature = "logger")]
pub use logger::init_logger;
#[cfg(feature = "memory")]
pub use memory::{MemoryConfig, MemoryGateway, Operation, OutboxMessage};
