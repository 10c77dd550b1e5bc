//! alarm-bridge-core - Core library for the alarm bridge
//!
//! This crate contains the alarm models, the snapshot registry and diffing,
//! the flat wire codec, the authorization gate, and the command dispatcher
//! and event emitter that hosts drive.

pub mod auth;
pub mod builder;
pub mod capability;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod emitter;
pub mod error;
pub mod memory;
pub mod models;
pub mod registry;
pub mod util;

pub use capability::AlarmCapability;
pub use config::BridgeConfig;
pub use dispatch::{CommandDispatcher, Reply};
pub use emitter::{EventEmitter, EventSink, SubscriptionHandle};
pub use error::{Error, ErrorPayload, Result};
pub use models::{Alarm, AlarmEvent, AlarmId, AlarmState, AuthorizationState};
