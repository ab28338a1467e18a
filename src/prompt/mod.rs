pub mod constructor;
pub mod templates;
