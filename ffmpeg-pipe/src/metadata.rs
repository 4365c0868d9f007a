//! Media probing, trimmed to what the transcoder logs at startup and what
//! tests verify about produced containers.

use std::fmt;

use crate::stream::AvStream;

#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub index: usize,
    /// "video" | "audio" | "subtitle" etc.
    pub codec_type: String,
    pub codec_name: String,
    /// Video only.
    pub width: Option<u32>,
    /// Video only.
    pub height: Option<u32>,
    /// Frame rate as "num/den".
    pub rate: String,
}

#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub format_name: String,
    /// None when the container does not report one (e.g. raw h264).
    pub duration_sec: Option<f64>,
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    pub fn video_streams(&self) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(|s| s.codec_type == "video")
    }
}

impl fmt::Display for MediaInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_name)?;
        if let Some(d) = self.duration_sec {
            write!(f, " ({:.3}s)", d)?;
        }
        for s in &self.streams {
            write!(f, ", #{} {} {}", s.index, s.codec_type, s.codec_name)?;
            if let (Some(w), Some(h)) = (s.width, s.height) {
                write!(f, " {}x{} @ {}", w, h, s.rate)?;
            }
        }
        Ok(())
    }
}

/// Opens a file and returns its format and stream layout.
pub fn probe(path: &str) -> anyhow::Result<MediaInfo> {
    let input = ffmpeg_next::format::input(path)?;

    let format_name = input.format().name().to_string();
    // duration is in 1/AV_TIME_BASE (microsecond) units
    let duration_sec = {
        let d = input.duration();
        if d == ffmpeg_next::ffi::AV_NOPTS_VALUE as i64 || d <= 0 {
            None
        } else {
            Some(d as f64 / 1_000_000.0)
        }
    };

    let mut streams = Vec::new();
    for stream in input.streams() {
        let av_stream = AvStream::from(stream);
        let params = av_stream.parameters();
        let codec_type = format!("{:?}", params.medium()).to_lowercase();
        let codec_name = format!("{:?}", params.id()).to_lowercase();
        let rate = av_stream.rate();

        let (width, height) = if av_stream.is_video() {
            (Some(av_stream.width()), Some(av_stream.height()))
        } else {
            (None, None)
        };

        streams.push(StreamInfo {
            index: av_stream.index(),
            codec_type,
            codec_name,
            width,
            height,
            rate: format!("{}/{}", rate.numerator(), rate.denominator()),
        });
    }

    Ok(MediaInfo {
        format_name,
        duration_sec,
        streams,
    })
}
