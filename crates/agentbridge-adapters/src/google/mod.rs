//! Google Workspace adapters: Drive, Docs, Gmail and contacts.
//!
//! All four authenticate with the caller's bearer token and share the
//! request plumbing in [`client`].

pub mod client;
pub mod docs;
pub mod drive;
pub mod gmail;
pub mod people;

pub use client::{GoogleClient, GoogleEndpoints};
pub use docs::DocsAdapter;
pub use drive::DriveAdapter;
pub use gmail::GmailAdapter;
pub use people::{ContactSource, ContactsAdapter};
