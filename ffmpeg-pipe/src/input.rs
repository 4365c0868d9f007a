use std::ffi::CString;
use std::path::Path;

use ffmpeg_next::Dictionary;

use crate::{packet::RawPacket, stream::AvStream};

/// Demuxer handle. Packets are pulled one at a time with `read_packet`;
/// `None` means the input is exhausted.
pub struct AvInput {
    inner: ffmpeg_next::format::context::Input,
}

impl AvInput {
    /// Resolve input format by name (e.g. "lavfi", "v4l2") via FFmpeg's av_find_input_format.
    fn find_input_format(name: &str) -> anyhow::Result<ffmpeg_next::format::format::Input> {
        let cname = CString::new(name)
            .map_err(|e| anyhow::anyhow!("invalid format name {:?}: {}", name, e))?;
        let ptr = unsafe { ffmpeg_next::ffi::av_find_input_format(cname.as_ptr()) };
        if ptr.is_null() {
            return Err(anyhow::anyhow!("input format not found: {}", name));
        }
        Ok(unsafe { ffmpeg_next::format::format::Input::wrap(ptr as *mut _) })
    }

    pub fn new(
        url: &str,
        format: Option<&str>,
        options: Option<Dictionary>,
    ) -> anyhow::Result<Self> {
        use ffmpeg_next::format::format::Format;

        let path = Path::new(url);
        let input = match (format, options) {
            (Some(fmt_name), Some(opts)) => {
                let fmt = Self::find_input_format(fmt_name)?;
                let ctx = ffmpeg_next::format::open_with(path, &Format::Input(fmt), opts)?;
                ctx.input()
            }
            (Some(fmt_name), None) => {
                let fmt = Self::find_input_format(fmt_name)?;
                let ctx = ffmpeg_next::format::open_with(
                    path,
                    &Format::Input(fmt),
                    Dictionary::new(),
                )?;
                ctx.input()
            }
            (None, Some(opts)) => ffmpeg_next::format::input_with_dictionary(path, opts)?,
            (None, None) => ffmpeg_next::format::input(path)?,
        };

        Ok(Self { inner: input })
    }

    /// The video stream the pipeline will transcode. Inputs without one are an error.
    pub fn best_video_stream(&self) -> anyhow::Result<AvStream> {
        self.inner
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .map(AvStream::from)
            .ok_or_else(|| anyhow::anyhow!("no video stream in input"))
    }

    pub fn read_packet(&mut self) -> Option<RawPacket> {
        self.inner
            .packets()
            .next()
            .map(|(stream, packet)| (packet, stream.time_base()).into())
    }
}
