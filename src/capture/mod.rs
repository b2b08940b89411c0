mod composite;
mod encode;
mod metadata;
mod photo;
#[cfg(test)]
mod tests;

pub use composite::{composite, mirrored_preview};
pub use encode::{decode_png, encode_png};
pub use metadata::PhotoMetadata;
pub(crate) use metadata::save_metadata;
pub use photo::CapturedImage;
