//! Shift Dynamic
//!
//! Opaque, self-describing values and the adapters that read and write them.
//!
//! # Core Concepts
//!
//! - **Value**: canonical ordered tree of maps, lists and leaves
//! - **DynamicOps**: adapter trait over a concrete representation
//! - **Recoverable**: ok / soft miss / error-with-partial result
//!
//! # Example
//!
//! ```rust
//! use shift_dynamic::{DynamicOps, JsonOps, Value, ValueOps};
//!
//! let ops = ValueOps;
//! let player = ops.set(ops.empty(), "name", ops.create_string("Alice"));
//! assert_eq!(player.get("name"), Some(&Value::from("Alice")));
//!
//! let json = JsonOps.from_value(&player);
//! assert_eq!(json, serde_json::json!({"name": "Alice"}));
//! ```

#![warn(unreachable_pub)]

mod error;
mod json;
mod ops;
mod recoverable;
mod value;

pub use error::{DecodeError, EncodeError};
pub use json::JsonOps;
pub use ops::{convert, DynamicOps, ValueOps};
pub use recoverable::Recoverable;
pub use value::{Number, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
