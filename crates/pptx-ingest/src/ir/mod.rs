mod document;
mod elements;
mod style;

pub use document::*;
pub use elements::*;
pub use style::*;
