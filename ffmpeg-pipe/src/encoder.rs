use ffmpeg_next::{Dictionary, Rational};

use crate::{frame::RawVideoFrame, packet::RawPacket, qp::QpTable, scaler::Scaler};

#[derive(Debug, Clone)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub keyframe_interval: u32,
    pub codec: String,
    pub pixel_format: ffmpeg_next::format::Pixel,
    /// Required by containers whose muxer expects extradata (mp4/mkv).
    pub global_header: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 25,
            keyframe_interval: 250,
            codec: "libx264".to_string(),
            pixel_format: ffmpeg_next::format::Pixel::YUV420P,
            global_header: false,
        }
    }
}

/// Video encoder with per-frame macroblock QP overrides. Timestamps run in
/// 1/fps units, stamped from an internal frame counter.
pub struct Encoder {
    inner: ffmpeg_next::codec::encoder::Video,
    encoder_time_base: Rational,
    frame_index: i64,
    scaler: Option<Scaler>,
}

impl Encoder {
    pub fn new(settings: Settings, options: Option<Dictionary>) -> anyhow::Result<Self> {
        if settings.fps == 0 {
            anyhow::bail!("frame rate must be non-zero");
        }
        let codec = ffmpeg_next::encoder::find_by_name(&settings.codec)
            .ok_or_else(|| anyhow::anyhow!("codec not found: {}", settings.codec))?;
        let ctx = ffmpeg_next::codec::Context::new_with_codec(codec);
        let mut encoder = ctx.encoder().video()?;
        encoder.set_width(settings.width);
        encoder.set_height(settings.height);
        encoder.set_format(settings.pixel_format);
        encoder.set_frame_rate(Some(Rational(settings.fps as i32, 1)));
        encoder.set_time_base(Rational(1, settings.fps as i32));
        encoder.set_gop(settings.keyframe_interval);
        if settings.global_header {
            encoder.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let need_defaults = options.is_none();
        let mut opts = options.unwrap_or_default();
        if need_defaults {
            opts.set("preset", "medium");
        }
        let encoder = encoder.open_with(opts)?;
        log::info!(
            "encoder opened: {} {}x{} @{}fps",
            settings.codec,
            settings.width,
            settings.height,
            settings.fps
        );

        let encoder_time_base: Rational = unsafe { (*encoder.0.as_ptr()).time_base.into() };

        Ok(Self {
            inner: encoder,
            encoder_time_base,
            frame_index: 0,
            scaler: None,
        })
    }

    /// Codec parameters for the opened encoder, for muxer stream setup.
    pub fn parameters(&self) -> anyhow::Result<ffmpeg_next::codec::Parameters> {
        let mut parameters = ffmpeg_next::codec::Parameters::new();
        unsafe {
            let ret = ffmpeg_next::ffi::avcodec_parameters_from_context(
                parameters.as_mut_ptr(),
                self.inner.0.as_ptr(),
            );
            if ret < 0 {
                anyhow::bail!("avcodec_parameters_from_context failed: {}", ret);
            }
        }
        Ok(parameters)
    }

    /// Encodes one frame with its QP table applied atomically: the table is
    /// attached to this frame and this frame only, then the frame is
    /// submitted. A uniform table attaches nothing and the encoder falls
    /// back to plain rate control.
    pub fn encode_frame(&mut self, mut frame: RawVideoFrame, qp: &QpTable) -> anyhow::Result<()> {
        let converted = {
            let f = frame.get_mut();
            if f.format() != self.inner.format()
                || f.width() != self.inner.width()
                || f.height() != self.inner.height()
            {
                if self.scaler.is_none() {
                    self.scaler = Some(Scaler::new(
                        f.format(),
                        f.width(),
                        f.height(),
                        self.inner.format(),
                        self.inner.width(),
                        self.inner.height(),
                    )?);
                }
                let mut out = ffmpeg_next::frame::Video::empty();
                self.scaler.as_mut().unwrap().run(f, &mut out)?;
                Some(RawVideoFrame::from(out))
            } else {
                None
            }
        };

        let mut sending = match converted {
            Some(c) => c,
            None => frame,
        };
        let f = sending.get_mut();
        f.set_pts(Some(self.frame_index));
        if !qp.is_uniform() {
            Self::attach_overrides(f, qp)?;
        }
        self.inner.send_frame(f)?;
        self.frame_index += 1;
        Ok(())
    }

    /// Switches the encoder into flush mode; poll `receive_packet` until None.
    pub fn send_eof(&mut self) -> anyhow::Result<()> {
        self.inner.send_eof()?;
        Ok(())
    }

    pub fn receive_packet(&mut self) -> anyhow::Result<Option<RawPacket>> {
        let mut packet = ffmpeg_next::codec::packet::Packet::empty();
        match self.inner.receive_packet(&mut packet) {
            Ok(()) => {
                // one frame per packet in encoder time base (1/fps)
                packet.set_duration(1);
                Ok(Some(RawPacket::from((packet, self.encoder_time_base))))
            }
            Err(ffmpeg_next::Error::Other { errno })
                if errno == ffmpeg_next::util::error::EAGAIN =>
            {
                Ok(None)
            }
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn attach_overrides(
        frame: &mut ffmpeg_next::frame::Video,
        qp: &QpTable,
    ) -> anyhow::Result<()> {
        use ffmpeg_next::ffi;

        let regions = qp.regions_of_interest();
        if regions.is_empty() {
            return Ok(());
        }
        let size = regions.len() * std::mem::size_of::<ffi::AVRegionOfInterest>();
        unsafe {
            let side_data = ffi::av_frame_new_side_data(
                frame.as_mut_ptr(),
                ffi::AVFrameSideDataType::AV_FRAME_DATA_REGIONS_OF_INTEREST,
                size,
            );
            if side_data.is_null() {
                anyhow::bail!("failed to allocate region-of-interest side data");
            }
            std::ptr::copy_nonoverlapping(regions.as_ptr() as *const u8, (*side_data).data, size);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yuv_frame(width: u32, height: u32, luma: u8) -> RawVideoFrame {
        let mut frame =
            ffmpeg_next::frame::Video::new(ffmpeg_next::format::Pixel::YUV420P, width, height);
        frame.data_mut(0).fill(luma);
        frame.data_mut(1).fill(128);
        frame.data_mut(2).fill(128);
        RawVideoFrame::from(frame)
    }

    /// Requires libx264; skipped when the linked FFmpeg lacks it.
    #[test]
    fn test_encode_with_overrides_yields_one_packet_per_frame() -> anyhow::Result<()> {
        crate::init()?;
        if ffmpeg_next::encoder::find_by_name("libx264").is_none() {
            eprintln!("skip: libx264 not available");
            return Ok(());
        }

        let settings = Settings {
            width: 64,
            height: 48,
            fps: 5,
            keyframe_interval: 5,
            ..Settings::default()
        };
        let mut encoder = Encoder::new(settings, None)?;

        let mut table = QpTable::for_frame(64, 48, 30.0);
        table.fill_rect(0, 0, 1, 1, 18.0);

        for i in 0u8..3 {
            encoder.encode_frame(yuv_frame(64, 48, 60 + i * 40), &table)?;
        }
        encoder.send_eof()?;

        let mut packets = 0;
        while let Some(packet) = encoder.receive_packet()? {
            assert!(packet.size() > 0);
            packets += 1;
        }
        assert_eq!(packets, 3);
        Ok(())
    }
}
