mod types;
pub use self::types::*;

mod ethernet;
pub use self::ethernet::*;
