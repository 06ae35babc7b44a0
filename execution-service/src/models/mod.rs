pub mod dates;
pub mod de;
pub mod line_item;
pub mod material;

pub use line_item::*;
pub use material::*;
