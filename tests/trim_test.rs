//! End-to-end trims against generated fixtures.
//!
//! The fixture is a PCM WAV written by hand, which exercises the transcode
//! path; the M4A it produces is then used to exercise the direct-copy path.

use std::path::Path;
use tempfile::TempDir;

/// Write a 16-bit 44.1 kHz PCM WAV containing a 440 Hz sine tone on every
/// channel.
fn write_wav(path: &Path, seconds: f64, channels: u16) {
    let sample_rate = 44_100u32;
    let frames = (seconds * sample_rate as f64) as usize;
    let block_align = channels * 2;
    let data_len = (frames * block_align as usize) as u32;

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());

    for i in 0..frames {
        let t = i as f64 / sample_rate as f64;
        let v = (t * 440.0 * std::f64::consts::TAU).sin();
        let sample = ((v * 12_000.0) as i16).to_le_bytes();
        for _ in 0..channels {
            bytes.extend_from_slice(&sample);
        }
    }

    std::fs::write(path, bytes).unwrap();
}

fn probed_seconds(path: &Path) -> f64 {
    audiotrim::probe(path)
        .unwrap()
        .duration
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Timestamp of the first timed packet in seconds. Trimmed output must
/// start at (or within codec priming distance of) zero.
fn first_packet_seconds(path: &Path) -> f64 {
    audiotrim::probe(path).unwrap();

    let mut ictx = ffmpeg_the_third::format::input(path).unwrap();
    for result in ictx.packets() {
        let (stream, packet) = result.unwrap();
        let Some(ts) = packet.pts().or(packet.dts()) else {
            continue;
        };
        let tb = stream.time_base();
        return ts as f64 * tb.numerator() as f64 / tb.denominator() as f64;
    }

    panic!("no timed packets in {:?}", path);
}

#[test]
fn test_transcode_trims_wav_and_rewrites_extension() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    write_wav(&input, 10.0, 1);

    let requested = dir.path().join("clip.mp3");
    let written = audiotrim::trim(&input, &requested, 2.5, 7.5).unwrap();

    assert_eq!(written, dir.path().join("clip.m4a"));
    assert!(!requested.exists());
    assert!(written.is_file());

    let track = audiotrim::probe(&written).unwrap();
    assert_eq!(track.codec, audiotrim::AudioCodec::Aac);
    assert_eq!(track.sample_rate, 44_100);
    assert_eq!(track.channels, 1);

    // Window edges land on decoded frame boundaries, so allow some slack.
    let seconds = probed_seconds(&written);
    assert!(
        (4.25..=5.75).contains(&seconds),
        "expected roughly 5s of audio, got {}s",
        seconds
    );

    // Timestamps are rebased: the output starts at zero, not at 2.5s.
    let start = first_packet_seconds(&written);
    assert!(
        start.abs() < 0.1,
        "expected output to start at zero, got {}s",
        start
    );
}

#[test]
fn test_direct_copy_trims_aac_without_renaming() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    write_wav(&input, 10.0, 1);

    // First build an AAC source via the transcode path.
    let full = audiotrim::trim(&input, dir.path().join("full.m4a"), 0.0, 10.0).unwrap();
    assert_eq!(
        audiotrim::probe(&full).unwrap().codec,
        audiotrim::AudioCodec::Aac
    );

    let requested = dir.path().join("cut.m4a");
    let written = audiotrim::trim(&full, &requested, 1.0, 4.0).unwrap();
    assert_eq!(written, requested);

    let seconds = probed_seconds(&written);
    assert!(
        (2.25..=3.75).contains(&seconds),
        "expected roughly 3s of audio, got {}s",
        seconds
    );

    let start = first_packet_seconds(&written);
    assert!(
        (0.0..0.1).contains(&start),
        "expected rebased samples starting at zero, got {}s",
        start
    );
}

#[test]
fn test_quad_channel_source_keeps_its_channel_count() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("quad.wav");
    write_wav(&input, 4.0, 4);

    assert_eq!(audiotrim::probe(&input).unwrap().channels, 4);

    let written = audiotrim::trim(&input, dir.path().join("quad.m4a"), 0.5, 2.5).unwrap();
    let track = audiotrim::probe(&written).unwrap();
    assert_eq!(track.codec, audiotrim::AudioCodec::Aac);
    assert_eq!(track.channels, 4);

    let seconds = probed_seconds(&written);
    assert!(
        (1.5..=2.5).contains(&seconds),
        "expected roughly 2s of audio, got {}s",
        seconds
    );
}

#[test]
fn test_window_past_end_of_input_yields_valid_empty_file() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    write_wav(&input, 2.0, 1);

    let written = audiotrim::trim(&input, dir.path().join("late.m4a"), 100.0, 110.0).unwrap();
    assert!(written.is_file());

    // Structurally valid but empty: it probes cleanly with no meaningful
    // duration.
    let track = audiotrim::probe(&written).unwrap();
    assert_eq!(track.codec, audiotrim::AudioCodec::Aac);
    assert!(probed_seconds(&written) < 0.5);
}

#[test]
fn test_degenerate_window_is_rejected() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    write_wav(&input, 2.0, 1);

    let err = audiotrim::trim(&input, dir.path().join("out.m4a"), 1.0, 1.0).unwrap_err();
    assert_eq!(err.kind(), "INVALID_ARGUMENTS");
    assert!(!dir.path().join("out.m4a").exists());
}

#[test]
fn test_missing_input_is_reported_before_any_output() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.m4a");

    let err = audiotrim::trim(dir.path().join("nope.mp3"), &output, 0.0, 1.0).unwrap_err();
    assert_eq!(err.kind(), "INPUT_NOT_FOUND");
    assert!(!output.exists());
}

#[test]
fn test_unreadable_input_leaves_no_output_behind() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("garbage.mp3");
    std::fs::write(&input, vec![0xAB; 64 * 1024]).unwrap();

    let output = dir.path().join("out.m4a");
    assert!(audiotrim::trim(&input, &output, 0.0, 1.0).is_err());
    assert!(!output.exists());
}

#[test]
fn test_repeated_trim_overwrites_and_is_stable() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    write_wav(&input, 6.0, 1);

    let output = dir.path().join("clip.m4a");
    audiotrim::trim(&input, &output, 1.0, 3.0).unwrap();
    let first = probed_seconds(&output);

    audiotrim::trim(&input, &output, 1.0, 3.0).unwrap();
    let second = probed_seconds(&output);

    assert!((first - second).abs() < 0.25);
    assert!(!dir.path().join("clip.m4a.bak").exists());
}

#[test]
fn test_probe_reports_source_track() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("tone.wav");
    write_wav(&input, 3.0, 1);

    let track = audiotrim::probe(&input).unwrap();
    assert_eq!(track.codec, audiotrim::AudioCodec::Pcm);
    assert_eq!(track.sample_rate, 44_100);
    assert_eq!(track.channels, 1);

    let seconds = track.duration.map(|d| d.as_secs_f64()).unwrap_or(0.0);
    assert!((2.9..=3.1).contains(&seconds));
}
