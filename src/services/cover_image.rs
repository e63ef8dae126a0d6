use std::path::Path;
use std::process::Command;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, bail};

use crate::ports::image::ImageCodec;

/// Spotify rejects cover uploads above 256 KB of JPEG data.
const MAX_COVER_BYTES: usize = 256 * 1024;

/// Converts covers to JPEG with the `ffmpeg` binary found in PATH.
pub struct FfmpegImageCodec;

impl ImageCodec for FfmpegImageCodec {
    fn to_base64_jpeg(&self, image: &[u8]) -> Result<String> {
        let jpeg = match infer::get(image) {
            Some(kind) if kind.mime_type() == "image/jpeg" => image.to_vec(),
            Some(kind) if kind.matcher_type() == infer::MatcherType::Image => {
                log::debug!("Converting {} cover to JPEG", kind.mime_type());
                convert_with_ffmpeg(image, kind.extension())?
            }
            Some(kind) => bail!("Cover is not an image: {}", kind.mime_type()),
            None => bail!("Cover has an unrecognized format"),
        };

        if jpeg.len() > MAX_COVER_BYTES {
            log::warn!(
                "Cover is {} bytes, larger than the {} bytes the destination accepts",
                jpeg.len(),
                MAX_COVER_BYTES
            );
        }

        Ok(STANDARD.encode(jpeg))
    }
}

fn convert_with_ffmpeg(image: &[u8], extension: &str) -> Result<Vec<u8>> {
    if which::which("ffmpeg").is_err() {
        bail!("ffmpeg not found in PATH. Please install ffmpeg to convert playlist covers.");
    }

    let workdir = tempfile::tempdir().wrap_err("Failed to create a temporary directory")?;
    let input = workdir.path().join(format!("cover.{}", extension));
    let output = workdir.path().join("cover.jpg");
    std::fs::write(&input, image).wrap_err("Failed to write cover to disk")?;

    run_ffmpeg(&input, &output)?;

    std::fs::read(&output).wrap_err("Failed to read converted cover")
}

fn run_ffmpeg(input: &Path, output: &Path) -> Result<()> {
    let result = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error", "-i"])
        .arg(input)
        .args(["-frames:v", "1", "-q:v", "3"])
        .arg(output)
        .output()
        .wrap_err("Failed to run ffmpeg")?;

    if !result.status.success() {
        bail!(
            "ffmpeg failed to convert cover: {}",
            String::from_utf8_lossy(&result.stderr).trim()
        );
    }
    Ok(())
}
