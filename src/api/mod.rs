pub mod form;
pub mod handlers;
pub mod pages;
pub mod routes;

pub use routes::{router, AppState};
