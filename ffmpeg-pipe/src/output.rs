use crate::packet::RawPacket;

/// Muxer handle. The header is written lazily with the first packet and the
/// trailer exactly once in `finish`.
pub struct AvOutput {
    inner: ffmpeg_next::format::context::Output,
    have_written_header: bool,
    have_written_trailer: bool,
}

impl AvOutput {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let output = ffmpeg_next::format::output(url)?;
        Ok(Self {
            inner: output,
            have_written_header: false,
            have_written_trailer: false,
        })
    }

    /// Whether the container wants codec extradata up front (mp4/mkv); the
    /// encoder must then be opened with the global-header flag.
    pub fn needs_global_header(&self) -> bool {
        self.inner
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER)
    }

    /// Adds the muxer stream for the encoded video; returns its index.
    pub fn add_video_stream(
        &mut self,
        parameters: ffmpeg_next::codec::Parameters,
    ) -> anyhow::Result<usize> {
        let mut writer_stream = self
            .inner
            .add_stream(ffmpeg_next::encoder::find(parameters.id()))?;
        writer_stream.set_parameters(parameters);
        Ok(writer_stream.index())
    }

    pub fn write_packet(
        &mut self,
        stream_index: usize,
        mut packet: RawPacket,
    ) -> anyhow::Result<()> {
        if !self.have_written_header {
            self.inner.write_header()?;
            self.have_written_header = true;
        }

        let time_base = packet.time_base();
        let out_time_base = self
            .inner
            .stream(stream_index)
            .ok_or_else(|| anyhow::anyhow!("output stream {} not found", stream_index))?
            .time_base();

        let p = packet.get_mut();
        p.set_stream(stream_index);
        p.set_position(-1);
        p.rescale_ts(time_base, out_time_base);
        p.write(&mut self.inner)?;
        Ok(())
    }

    pub fn finish(&mut self) -> anyhow::Result<()> {
        if self.have_written_header && !self.have_written_trailer {
            self.have_written_trailer = true;
            self.inner.write_trailer()?;
        }
        Ok(())
    }
}
