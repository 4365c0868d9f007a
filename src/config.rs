use std::path::PathBuf;

use clap::Parser;

/// Frame-accurate transcoder with per-region macroblock QP overrides.
#[derive(Parser, Debug, Clone)]
#[command(name = "qpblock", version)]
pub struct Config {
    /// Input media path (or device spec when --input-format is given).
    #[arg(short, long)]
    pub input: String,

    /// Named input format (e.g. "lavfi"); autodetected when omitted.
    #[arg(long)]
    pub input_format: Option<String>,

    /// Output media path; the container is inferred from the extension.
    #[arg(short, long)]
    pub output: String,

    /// Output frame rate.
    #[arg(long, default_value_t = 25)]
    pub fps: u32,

    /// Directory holding per-frame region files (frame_NNNN_multi.txt).
    #[arg(long, default_value = "roi")]
    pub roi_dir: PathBuf,

    /// QP assigned to macroblocks no region covers.
    #[arg(long, default_value_t = 26.0)]
    pub base_qp: f32,

    /// Encoder for the output stream.
    #[arg(long, default_value = "libx264")]
    pub codec: String,
}
