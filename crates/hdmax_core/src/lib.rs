//! HdMax Core - scene-side collaborators of the viewport render delegate.
//!
//! This crate provides:
//!
//! - **Scene access**: the `SceneDelegate` trait and an in-memory implementation
//! - **Change tracking**: `DirtyBits` and the `ChangeTracker` dirty-state oracle
//! - **Values**: runtime-typed primvar arrays (`Value`)
//! - **Names**: `SdfPath`, `Token`, and the instancer primvar token sets
//!
//! # Example
//!
//! ```ignore
//! use hdmax_core::{MemorySceneDelegate, SdfPath};
//!
//! let delegate = MemorySceneDelegate::new();
//! let forest = SdfPath::new("/World/Forest");
//! delegate.add_instancer(&forest, None)?;
//! delegate.set_instance_primvar(&forest, "instanceTranslations", translations)?;
//! ```

pub mod change_tracker;
pub mod delegate;
pub mod memory;
pub mod path;
pub mod tokens;
pub mod value;

// Re-export commonly used types
pub use change_tracker::{ChangeTracker, DirtyBits};
pub use delegate::{Interpolation, PrimvarDescriptor, SceneDelegate};
pub use memory::{DelegateError, DelegateResult, MemorySceneDelegate};
pub use path::{SdfPath, Token};
pub use tokens::{InstancerTokens, PrimvarNaming};
pub use value::{Value, ValueType};
