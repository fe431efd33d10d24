//! # Lockrelay
//!
//! Lockstep relay server for real-time multiplayer games.
//!
//! Lockrelay keeps a simulation deterministic across clients without ever
//! running it: every tick the server collects one input set per seated
//! player, seals them into a frame, and relays the frame to the whole
//! room. Clients that heard the same frames compute the same world.
//!
//! The crate ties the layers together: transport → protocol → session →
//! room. Game-specific behavior plugs in through the
//! [`RoomLogic`](lockrelay_room::RoomLogic) trait;
//! [`LockstepLogic`](lockrelay_room::LockstepLogic) is the stock
//! implementation most servers want.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lockrelay::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), LockrelayError> {
//!     let app = AppBuilder::new()
//!         .bind("0.0.0.0:9000")
//!         .startup::<LockstepLogic>()
//!         .await?;
//!     app.run().await
//! }
//! ```

mod app;
mod dispatch;
mod error;
mod handlers;
mod scheduler;
mod world;

pub use app::{App, AppBuilder, AppConfig, ShutdownHandle};
pub use dispatch::{Dispatcher, HandlerId};
pub use error::LockrelayError;
pub use scheduler::{FixedStep, FixedStepConfig, StepInfo};
pub use world::World;

/// Everything a typical server binary needs, in one import.
pub mod prelude {
    pub use crate::{App, AppBuilder, AppConfig, LockrelayError, ShutdownHandle, World};
    pub use lockrelay_protocol::{
        Frame, InputSet, Message, Opcode, Packet, RoomId, UserId,
    };
    pub use lockrelay_room::{
        LockstepLogic, RoomConfig, RoomCtx, RoomLogic, RoomState, Step,
    };
    pub use lockrelay_session::{SessionConfig, SessionId, UserState};
}
