pub mod columns;
pub mod numeric;
pub mod store;
pub mod table;

pub use columns::*;
pub use numeric::*;
pub use store::*;
pub use table::*;
