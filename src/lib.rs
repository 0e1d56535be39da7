//! Exposes host objects to a template language: class introspection with a shared cache,
//! overload resolution, argument unwrapping and the model types templates see.

pub mod access_policy;
pub mod consts;
pub mod descriptor;
pub mod error;
pub mod introspector;
pub mod model;
pub mod overload;
pub mod runtime;
pub mod unwrap;
pub mod wrapper;

pub use error::{Error, HostError, HostResult, Result};
pub use wrapper::{ObjectWrapper, ObjectWrapperBuilder};
