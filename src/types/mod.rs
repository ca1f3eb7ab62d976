// ABOUTME: Validated domain types shared by the gateway and the runtime adapter.
// ABOUTME: Container references and image references.

mod container_ref;
mod image_ref;

pub use container_ref::{ContainerRef, ContainerRefError, MAX_REF_LEN};
pub use image_ref::{ImageRef, ParseImageRefError};
