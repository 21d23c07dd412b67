pub mod enums;
pub mod schema;
pub mod state;
pub mod utils;

pub use enums::*;
