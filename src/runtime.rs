pub mod famous_classes;
pub mod inheritance;
mod number;
mod registry;
mod structs;
mod value;

pub use number::*;
pub use registry::*;
pub use structs::*;
pub use value::*;
