pub mod decrypt;
pub use self::decrypt::decrypt;
