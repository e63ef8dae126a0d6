pub mod destination;
pub mod image;
pub mod source;
