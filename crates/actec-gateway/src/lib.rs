//! Command routing for AcTEC gateways
//!
//! A [`Gateway`] wraps a [`Session`](actec_client::Session) and turns it into
//! typed units:
//!
//! - [`Device`], [`Scene`] and [`Group`] registries built from the gateway's
//!   floor/room report
//! - a receive loop ([`Gateway::run`]) that routes property pushes to
//!   per-endpoint listeners and replies to the requests waiting for them
//! - outbound set/get/trigger operations that wait for their reply
//! - availability flags that follow the session state
//!
//! ```no_run
//! # async fn demo(config: actec_client::ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
//! use actec_gateway::Gateway;
//! use actec_protocol::AreaNameRule;
//! use std::sync::Arc;
//!
//! let gateway = Arc::new(Gateway::new(config, "aa:bb:cc:dd:ee:ff"));
//! gateway.bootstrap(AreaNameRule::FloorRoom).await?;
//!
//! let receiver = tokio::spawn({
//!     let gateway = Arc::clone(&gateway);
//!     async move { gateway.run().await }
//! });
//! tokio::spawn({
//!     let gateway = Arc::clone(&gateway);
//!     async move { gateway.run_ping_loop().await }
//! });
//!
//! if let Some(device) = gateway.devices().next() {
//!     device.set_on_off(1, true).await?;
//! }
//! gateway.close().await;
//! receiver.await??;
//! # Ok(())
//! # }
//! ```

mod device;
mod error;
mod gateway;
mod group;
mod listeners;
mod pending;
mod router;
mod scene;
mod setup;
mod unit;

pub use device::Device;
pub use error::{GatewayError, GatewayResult, SetupError};
pub use gateway::{Gateway, Topology};
pub use group::Group;
pub use listeners::{ListenerId, ListenerSet, Unsubscribe};
pub use router::CommandRouter;
pub use scene::Scene;
pub use setup::probe;
pub use unit::Availability;
