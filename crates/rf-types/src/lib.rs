pub mod errors;
pub mod node;
pub mod params;
pub mod score;

pub use errors::*;
pub use node::*;
pub use params::*;
pub use score::*;
