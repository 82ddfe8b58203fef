mod config;
pub mod directory;
mod error;
pub mod notify;
pub mod permission;
pub mod repos;
pub mod server;
pub mod session;

pub use self::{
    config::{Config, Keys, PeerKeys, ServerKeys},
    error::{ErrorKind, SessionError},
    server::{Context, Server},
    session::{Dispatched, Ingested, Role, Session, State},
};
