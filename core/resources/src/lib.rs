//! Helpdesk resources for deskbridge.
//!
//! Each resource wraps a [`RemoteEntity`](deskbridge_sync::RemoteEntity)
//! configured by a static descriptor, and adds its own verbs:
//! - [`Ticket`]: create, comment, list comments
//! - [`User`]: create, enable and disable
//! - [`Asset`]: create, append to the `Additional` log, custom fields
//! - [`Category`]: read-only lookup by section-qualified name

mod fields;

pub mod asset;
pub mod category;
pub mod client;
pub mod ticket;
pub mod user;

// Re-export main types
pub use asset::{Asset, AssetField, NewAsset, ASSET, ASSET_CUSTOM_FIELDS};
pub use category::Category;
pub use client::Helpdesk;
pub use ticket::{NewTicket, Ticket, TicketField, TICKET};
pub use user::{NewUser, User, UserField, USER};
