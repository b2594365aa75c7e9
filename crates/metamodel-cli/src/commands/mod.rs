pub mod facets;
pub mod members;
pub mod validate;
