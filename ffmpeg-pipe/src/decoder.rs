use ffmpeg_next::Rational;

use crate::{frame::RawVideoFrame, packet::RawPacket, stream::AvStream};

/// Outcome of polling the decoder for a frame. `NotReady` means the codec
/// wants more input; `Eof` is the explicit exhaustion signal after a flush
/// and is the only condition that ends draining.
pub enum Decoded {
    Frame(RawVideoFrame),
    NotReady,
    Eof,
}

pub struct Decoder {
    inner: ffmpeg_next::codec::decoder::Video,
    decoder_time_base: Rational,
}

impl Decoder {
    pub fn new(stream: &AvStream) -> anyhow::Result<Self> {
        let mut decoder_ctx = ffmpeg_next::codec::Context::new();
        unsafe {
            (*decoder_ctx.as_mut_ptr()).time_base = stream.time_base().into();
        }
        decoder_ctx.set_parameters(stream.parameters().clone())?;

        let video_decoder = decoder_ctx.decoder().video()?;
        let decoder_time_base = video_decoder.time_base();

        if video_decoder.format() == ffmpeg_next::format::Pixel::None
            || video_decoder.width() == 0
            || video_decoder.height() == 0
        {
            return Err(anyhow::anyhow!("missing codec parameters"));
        }

        Ok(Self {
            inner: video_decoder,
            decoder_time_base,
        })
    }

    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    pub fn send_packet(&mut self, mut packet: RawPacket) -> anyhow::Result<()> {
        let time_base = packet.time_base();
        let packet = packet.get_mut();
        packet.rescale_ts(time_base, self.decoder_time_base);
        self.inner.send_packet(packet)?;
        Ok(())
    }

    /// Switches the decoder into flush mode; poll `receive_frame` until `Eof`.
    pub fn send_eof(&mut self) -> anyhow::Result<()> {
        self.inner.send_eof()?;
        Ok(())
    }

    pub fn receive_frame(&mut self) -> anyhow::Result<Decoded> {
        let mut frame = ffmpeg_next::frame::Video::empty();
        match self.inner.receive_frame(&mut frame) {
            Ok(()) => Ok(Decoded::Frame(RawVideoFrame::from(frame))),
            Err(ffmpeg_next::Error::Eof) => Ok(Decoded::Eof),
            Err(ffmpeg_next::Error::Other { errno })
                if errno == ffmpeg_next::util::error::EAGAIN =>
            {
                Ok(Decoded::NotReady)
            }
            Err(err) => Err(err.into()),
        }
    }
}
