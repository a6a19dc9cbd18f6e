//! Shared substrate for the Skylight overlay system.
//!
//! Three contexts — overlay runtime, panel, background refresher — run as
//! independent task trees that share no state objects. Everything they
//! agree on flows through the [`store::SyncStore`] (durable, change
//! notifications) or the [`bus::ContextBus`] (best-effort latency
//! shortcut).

pub mod bus;
pub mod clock;
pub mod error;
pub mod location;
pub mod settings;
pub mod store;

pub use bus::{AckHandle, ContextBus, Envelope, Payload, TabId};
pub use error::{BusError, StoreError};
pub use location::{
    default_location, resolve_active, ActiveLocation, Coordinates, LocationOrigin, LocationRecord,
};
pub use settings::{Settings, WidgetAnchor, WidgetPosition};
pub use store::{KeyChange, StoreEvent, SyncStore};

use anyhow::Result;

/// Initialize logging for a Skylight process.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Skylight core initialized");
    Ok(())
}
