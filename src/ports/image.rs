use color_eyre::eyre::Result;

/// Port trait for turning an arbitrary picture into what the destination accepts as a cover.
#[cfg_attr(test, mockall::automock)]
pub trait ImageCodec: Send + Sync {
    /// Re-encode `image` as baseline JPEG if needed and return it base64 encoded.
    fn to_base64_jpeg(&self, image: &[u8]) -> Result<String>;
}
