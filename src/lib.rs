// omi - programs CRT Micron / AT-778 family transceivers over a serial link

pub mod applets;
pub mod codec;
pub mod formats;
pub mod serial;
pub mod util;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
