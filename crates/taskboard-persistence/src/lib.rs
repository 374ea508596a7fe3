pub mod store;
pub mod traits;
pub mod watch;

pub use store::*;
pub use traits::*;
pub use watch::*;
