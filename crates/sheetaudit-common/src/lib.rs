pub mod coord;
pub mod error;
pub mod function;
pub mod value;

pub use coord::*;
pub use error::*;
pub use function::*;
pub use value::*;
