// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod id;
mod image_ref;
mod preset_name;

pub use id::{InstanceId, OperationId};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use preset_name::{PresetName, PresetNameError};
