//! Response assembly for matched and failed requests.

mod builder;

pub use builder::{ResponseError, ResponseWriter};
