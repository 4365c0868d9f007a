/// Registers FFmpeg components (format, device, etc.). Call once at startup
/// before opening inputs, including device inputs like lavfi.
pub fn init() -> anyhow::Result<()> {
    ffmpeg_next::init().map_err(|e| anyhow::anyhow!("ffmpeg_next init: {}", e))
}

pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod input;
pub mod metadata;
pub mod output;
pub mod packet;
pub mod qp;
pub mod scaler;
pub mod stream;
