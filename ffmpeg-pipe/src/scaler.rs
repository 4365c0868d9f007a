use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;

/// Converts decoded frames to the encoder's pixel format and dimensions.
/// The context is rebuilt if the source geometry changes mid-stream.
pub struct Scaler {
    context: scaling::Context,
    src: (Pixel, u32, u32),
    dst: (Pixel, u32, u32),
}

impl Scaler {
    pub fn new(
        src_format: Pixel,
        src_width: u32,
        src_height: u32,
        dst_format: Pixel,
        dst_width: u32,
        dst_height: u32,
    ) -> anyhow::Result<Self> {
        let context = scaling::Context::get(
            src_format,
            src_width,
            src_height,
            dst_format,
            dst_width,
            dst_height,
            scaling::flag::Flags::BILINEAR,
        )?;
        Ok(Self {
            context,
            src: (src_format, src_width, src_height),
            dst: (dst_format, dst_width, dst_height),
        })
    }

    pub fn run(
        &mut self,
        frame: &ffmpeg_next::frame::Video,
        dst: &mut ffmpeg_next::frame::Video,
    ) -> anyhow::Result<()> {
        let src = (frame.format(), frame.width(), frame.height());
        if src != self.src {
            self.context = scaling::Context::get(
                src.0,
                src.1,
                src.2,
                self.dst.0,
                self.dst.1,
                self.dst.2,
                scaling::flag::Flags::BILINEAR,
            )?;
            self.src = src;
        }
        self.context.run(frame, dst)?;
        Ok(())
    }
}
