// macOS platform backend

mod ffi;
mod platform;

pub use platform::{CarbonPlatform, TisInputSource};
