use std::path::Path;

use ffmpeg_pipe::{
    decoder::{Decoded, Decoder},
    encoder::{Encoder, Settings},
    input::AvInput,
    output::AvOutput,
    qp::QpTable,
};

use crate::{config::Config, qpmap, region};

/// Frame loop: decode, map the current frame's regions onto the macroblock
/// grid, encode with overrides, then drain both codecs once input runs out.
/// Strictly sequential; one frame is fully processed before the next packet
/// is read.
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs to completion; returns the number of frames handed to the encoder.
    pub fn run(&self) -> anyhow::Result<u64> {
        let mut input = AvInput::new(
            &self.config.input,
            self.config.input_format.as_deref(),
            None,
        )?;
        let stream = input.best_video_stream()?;
        let mut decoder = Decoder::new(&stream)?;

        let mut output = AvOutput::new(&self.config.output)?;
        let mut encoder = Encoder::new(
            Settings {
                width: decoder.width(),
                height: decoder.height(),
                fps: self.config.fps,
                codec: self.config.codec.clone(),
                global_header: output.needs_global_header(),
                ..Settings::default()
            },
            None,
        )?;
        let out_index = output.add_video_stream(encoder.parameters()?)?;

        let video_index = stream.index();
        let mut frame_index: u64 = 0;

        while let Some(packet) = input.read_packet() {
            if packet.index() != video_index {
                continue;
            }
            if let Err(e) = decoder.send_packet(packet) {
                log::error!("decode submission failed, draining: {:#}", e);
                break;
            }
            frame_index = self.encode_ready(
                &mut decoder,
                &mut encoder,
                &mut output,
                out_index,
                frame_index,
                false,
            )?;
        }

        // input exhausted (or fatal decode error): flush buffered frames,
        // each with a uniform base-QP map and no side-file lookup
        if let Err(e) = decoder.send_eof() {
            log::error!("decoder flush failed: {:#}", e);
        }
        frame_index = self.encode_ready(
            &mut decoder,
            &mut encoder,
            &mut output,
            out_index,
            frame_index,
            true,
        )?;

        if let Err(e) = encoder.send_eof() {
            log::error!("encoder flush failed: {:#}", e);
        }
        Self::drain_packets(&mut encoder, &mut output, out_index)?;
        output.finish()?;

        log::info!("pipeline finished, {} frames encoded", frame_index);
        Ok(frame_index)
    }

    /// Pulls every frame the decoder has ready and encodes it. Returns the
    /// frame index after the last consumed frame; the index advances once
    /// per decoded frame whether or not its encode succeeded.
    fn encode_ready(
        &self,
        decoder: &mut Decoder,
        encoder: &mut Encoder,
        output: &mut AvOutput,
        out_index: usize,
        mut frame_index: u64,
        draining: bool,
    ) -> anyhow::Result<u64> {
        loop {
            match decoder.receive_frame() {
                Ok(Decoded::Frame(frame)) => {
                    let table = qp_map_for_frame(
                        frame.width(),
                        frame.height(),
                        self.config.base_qp,
                        &self.config.roi_dir,
                        frame_index,
                        draining,
                    );
                    if let Err(e) = encoder.encode_frame(frame, &table) {
                        log::warn!("encode failed at frame {}: {:#}", frame_index, e);
                    }
                    frame_index += 1;
                    Self::drain_packets(encoder, output, out_index)?;
                }
                Ok(Decoded::NotReady) | Ok(Decoded::Eof) => break,
                Err(e) => {
                    log::error!("receive frame error: {:#}", e);
                    break;
                }
            }
        }
        Ok(frame_index)
    }

    fn drain_packets(
        encoder: &mut Encoder,
        output: &mut AvOutput,
        out_index: usize,
    ) -> anyhow::Result<()> {
        while let Some(packet) = encoder.receive_packet()? {
            log::trace!(
                "encoded packet pts {:?} dts {:?} size {}",
                packet.pts(),
                packet.dts(),
                packet.size()
            );
            output.write_packet(out_index, packet)?;
        }
        Ok(())
    }
}

/// QP map for one frame index. Normal frames look up their side file by
/// index; draining frames never consult the region directory.
fn qp_map_for_frame(
    width: u32,
    height: u32,
    base_qp: f32,
    roi_dir: &Path,
    frame_index: u64,
    draining: bool,
) -> QpTable {
    if draining {
        return QpTable::for_frame(width, height, base_qp);
    }
    let regions = region::load_regions(&region::region_file_path(roi_dir, frame_index));
    if !regions.is_empty() {
        log::debug!("frame {}: {} region overrides", frame_index, regions.len());
    }
    qpmap::map_regions(width, height, &regions, base_qp)
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
