//! Core value types for Conduit.

pub mod email;
pub mod id;
pub mod page;
pub mod slug;
pub mod username;

pub use email::{Email, EmailError};
pub use id::*;
pub use page::Page;
pub use slug::Slug;
pub use username::{Username, UsernameError};
