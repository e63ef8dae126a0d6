pub mod cover_image;
pub mod transfer;
