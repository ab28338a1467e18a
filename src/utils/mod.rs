pub mod files;
pub mod imaging;
