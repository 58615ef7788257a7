//! API Module
//!
//! Wire envelope, result objects, and query filters.

pub mod datapoint;
pub mod document;
pub mod filters;
pub mod player;
pub mod server;
pub mod session;

pub use datapoint::{DataPoint, Resolution};
pub use document::{Document, DocumentData, Links, Relationship, Resource, ResourceIdentifier};
pub use filters::{PlayerFilter, ServerFilter, SessionFilter};
pub use player::{Identifier, IdentifierType, Player};
pub use server::Server;
pub use session::Session;
