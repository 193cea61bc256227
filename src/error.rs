//! Error types for the table.

use crate::entity::EntityId;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors raised by the table and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// Terminal or file IO failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An entity with this id is already registered.
    #[error("entity {0} is already registered")]
    DuplicateEntity(EntityId),

    /// No entity with this id is registered.
    #[error("entity {0} is not registered")]
    EntityNotFound(EntityId),

    /// Device discovery found nothing matching.
    #[error("no device found with VID 0x{vendor:04x} and PID 0x{product:04x}")]
    DeviceNotFound {
        /// Vendor id searched for.
        vendor: u16,
        /// Product id searched for.
        product: u16,
    },

    /// The device bus failed while enumerating.
    #[error("device bus error: {0}")]
    Device(String),

    /// The console server could not bind its listener.
    #[error("console server failed to bind {addr}: {source}")]
    ConsoleBind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying bind failure.
        source: std::io::Error,
    },

    /// Configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The fan-out worker pool could not be built.
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    /// An asset catalog could not be parsed.
    #[error("asset catalog error: {0}")]
    Asset(String),
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, Error>;
