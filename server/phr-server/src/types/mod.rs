pub mod pagination;

pub use pagination::{Page, SkipLimit};
