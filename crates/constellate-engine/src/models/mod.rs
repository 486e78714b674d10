pub mod backend;
pub mod cell;
pub mod unit;

pub use backend::{Backend, SetupCode};
pub use cell::{Cell, CellType, Output, value_text};
pub use unit::{ContentKind, Unit};
