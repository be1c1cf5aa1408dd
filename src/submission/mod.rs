pub mod parser;
pub mod validate;

pub use validate::validate;
