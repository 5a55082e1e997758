//! RFC 8628 device authorization grant engine for OAuth 2.0 / OpenID Connect servers.
//!
//! The engine issues device/user code pairs, records the user's decision, validates every
//! token-endpoint poll in a fixed order, and redeems an approved code at most once. Storage,
//! locking, throttling, and account checks sit behind traits so hosts can plug in their own
//! backends; in-memory implementations ship with the crate.
//!
//! # Feature Flags
//!
//! - `tracing` (default) wraps every flow operation in a span and logs rejections.
//! - `metrics` publishes flow and rejection counters through the `metrics` facade.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod device;
pub mod error;
pub mod flows;
pub mod lock;
pub mod obs;
pub mod profile;
pub mod session;
pub mod store;
pub mod throttle;
pub mod validation;

mod _prelude {
	pub use std::{
		collections::{BTreeSet, HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
