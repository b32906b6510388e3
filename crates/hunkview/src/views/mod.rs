//! View rendering modules

mod spans;
mod split;
mod unified;

pub use split::render_split;
pub use unified::render_unified;
