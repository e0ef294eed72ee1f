// On-disk formats: the .omi image container and row-oriented tables
pub mod omi;
pub mod table;

pub use omi::{OmiError, OmiFile};
pub use table::{Row, TableError, TableFormat};
