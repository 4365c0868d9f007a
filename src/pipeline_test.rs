use std::fs;
use std::path::PathBuf;

use super::qp_map_for_frame;
use crate::config::Config;
use crate::pipeline::Pipeline;

fn temp_roi_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("qpblock_roi_{}_{}", std::process::id(), name));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_per_frame_side_file_association() {
    let dir = temp_roi_dir("assoc");
    // files for frames 0 and 2, nothing for frame 1
    fs::write(dir.join("frame_0000_multi.txt"), "16,16,63,63:18\n").unwrap();
    fs::write(dir.join("frame_0002_multi.txt"), "0,0,31,31:40\n").unwrap();

    let map0 = qp_map_for_frame(128, 96, 30.0, &dir, 0, false);
    let map1 = qp_map_for_frame(128, 96, 30.0, &dir, 1, false);
    let map2 = qp_map_for_frame(128, 96, 30.0, &dir, 2, false);

    assert!(!map0.is_uniform());
    assert_eq!(map0.get(1, 1), Some(18.0));
    assert_eq!(map0.get(0, 0), Some(30.0));

    assert!(map1.is_uniform());

    assert!(!map2.is_uniform());
    assert_eq!(map2.get(0, 0), Some(40.0));
    assert_ne!(map0, map2);

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_draining_never_consults_side_files() {
    let dir = temp_roi_dir("drain");
    // a matching side file exists on disk, but draining must ignore it
    fs::write(dir.join("frame_0000_multi.txt"), "0,0,127,95:5\n").unwrap();

    let map = qp_map_for_frame(128, 96, 30.0, &dir, 0, true);
    assert!(map.is_uniform());
    assert_eq!(map.base_qp(), 30.0);

    fs::remove_dir_all(dir).unwrap();
}

/// Counts packets belonging to the first video stream of a finished file.
fn video_packet_count(path: &str) -> anyhow::Result<u32> {
    let mut input = ffmpeg_next::format::input(path)?;
    let video_index = input
        .streams()
        .best(ffmpeg_next::media::Type::Video)
        .map(|s| s.index())
        .ok_or_else(|| anyhow::anyhow!("no video stream in {}", path))?;
    let mut count = 0;
    for (stream, _packet) in input.packets() {
        if stream.index() == video_index {
            count += 1;
        }
    }
    Ok(count)
}

/// Requires the lavfi device and libx264; skipped when the linked FFmpeg
/// lacks either.
#[test]
fn test_transcode_lavfi_end_to_end() -> anyhow::Result<()> {
    ffmpeg_pipe::init()?;
    if ffmpeg_next::encoder::find_by_name("libx264").is_none() {
        eprintln!("skip: libx264 not available");
        return Ok(());
    }
    let probe_input = ffmpeg_pipe::input::AvInput::new(
        "testsrc=duration=1:size=128x96:rate=5",
        Some("lavfi"),
        None,
    );
    if let Err(e) = probe_input {
        eprintln!("skip: lavfi unavailable: {:#}", e);
        return Ok(());
    }

    let dir = temp_roi_dir("e2e");
    fs::write(dir.join("frame_0000_multi.txt"), "16,16,63,63:18\n").unwrap();
    fs::write(dir.join("frame_0002_multi.txt"), "0,0,31,31:40\n").unwrap();
    let out_path = std::env::temp_dir().join(format!("qpblock_e2e_{}.mp4", std::process::id()));
    let _ = fs::remove_file(&out_path);

    let config = Config {
        input: "testsrc=duration=1:size=128x96:rate=5".to_string(),
        input_format: Some("lavfi".to_string()),
        output: out_path.to_string_lossy().into_owned(),
        fps: 5,
        roi_dir: dir.clone(),
        base_qp: 30.0,
        codec: "libx264".to_string(),
    };

    let frames = Pipeline::new(config).run()?;
    assert_eq!(frames, 5, "1s @ 5fps should decode to 5 frames");

    let info = ffmpeg_pipe::metadata::probe(out_path.to_str().unwrap())?;
    let video = info
        .video_streams()
        .next()
        .expect("output should have a video stream");
    assert_eq!((video.width, video.height), (Some(128), Some(96)));
    assert_eq!(video_packet_count(out_path.to_str().unwrap())?, 5);

    fs::remove_dir_all(dir).unwrap();
    fs::remove_file(out_path).unwrap();
    Ok(())
}
