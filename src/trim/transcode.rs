//! Transcode trimmer.
//!
//! Decodes compressed samples to raw audio and re-encodes them to AAC for
//! codecs the MP4 muxer cannot store directly. Four cooperating stages are
//! pumped in one loop: demuxer, decoder, a lazy resampler plus sample
//! chunker that re-blocks raw audio into encoder-sized frames, and the
//! encoder feeding the muxer. Samples ahead of the window still pass through
//! the decoder to prime its state; their frames are dropped before the
//! encoder. The loop terminates only after the decoder and then the encoder
//! have both been drained through their end-of-stream markers.

use crate::probe::AudioTrackInfo;
use crate::route::EncoderTarget;
use crate::trim::window::{TrimWindow, WindowPosition};
use crate::trim::TrimOptions;
use crate::{Error, Result};
use ffmpeg_the_third as ffmpeg;

use ffmpeg::{frame, Rational, Rescale};
use std::path::Path;

/// Whether an FFmpeg error is the transient "feed me / drain me" signal.
fn is_again(err: &ffmpeg::Error) -> bool {
    matches!(err, ffmpeg::Error::Other { errno } if *errno == libc::EAGAIN)
}

/// Re-blocks decoded planar f32 audio into frames of the encoder's size.
///
/// Decoder output frame sizes rarely match the encoder's required size
/// (e.g. 1152-sample MP3 frames into a 1024-sample AAC encoder), so samples
/// are buffered per channel and cut to measure.
struct FrameChunker {
    planes: Vec<Vec<f32>>,
    frame_size: usize,
}

impl FrameChunker {
    fn new(frame_size: usize, channels: usize) -> Self {
        Self {
            planes: vec![Vec::new(); channels.max(1)],
            frame_size,
        }
    }

    fn push(&mut self, frame: &frame::Audio) {
        let samples = frame.samples();
        for (ch, buf) in self.planes.iter_mut().enumerate() {
            let plane = frame.plane::<f32>(ch);
            buf.extend_from_slice(&plane[..samples.min(plane.len())]);
        }
    }

    fn buffered(&self) -> usize {
        self.planes.first().map(|p| p.len()).unwrap_or(0)
    }

    /// Take one frame's worth of samples per channel. With `force`, a final
    /// short frame is returned once less than a full frame remains.
    fn pop(&mut self, force: bool) -> Option<Vec<Vec<f32>>> {
        let available = self.buffered();
        let take = if available >= self.frame_size {
            self.frame_size
        } else if force && available > 0 {
            available
        } else {
            return None;
        };

        Some(
            self.planes
                .iter_mut()
                .map(|plane| plane.drain(..take).collect())
                .collect(),
        )
    }
}

pub(crate) fn run(
    input: &Path,
    track: &AudioTrackInfo,
    target: &EncoderTarget,
    window: &TrimWindow,
    staged: &Path,
    options: &TrimOptions,
) -> Result<()> {
    let mut ictx = ffmpeg::format::input(input)?;

    let stream = ictx
        .stream(track.index)
        .ok_or_else(|| Error::no_audio_track(input))?;
    let in_tb = stream.time_base();

    let decoder_ctx = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
        .map_err(|e| Error::codec_init(format!("failed to read source codec parameters: {}", e)))?;
    let mut decoder = decoder_ctx
        .decoder()
        .audio()
        .map_err(|e| Error::codec_init(format!("failed to open audio decoder: {}", e)))?;

    let encoder_codec = ffmpeg::encoder::find(target.codec_id()).ok_or_else(|| {
        Error::codec_init(format!("no encoder available for {:?}", target.codec_id()))
    })?;

    // The chunker and the frame construction below assume planar f32, which
    // every resampler output and the AAC encoder support.
    let target_format = ffmpeg::format::Sample::F32(ffmpeg::format::sample::Type::Planar);
    if let Some(audio) = encoder_codec.audio() {
        if let Some(formats) = audio.formats() {
            let supported: Vec<_> = formats.collect();
            if !supported.is_empty() && !supported.contains(&target_format) {
                return Err(Error::codec_init(format!(
                    "encoder does not accept planar f32 input (supported: {:?})",
                    supported
                )));
            }
        }
    }

    // One layout decides the channel shape of every stage downstream of the
    // decoder: resampler output, chunker planes, raw frames and the encoder.
    let make_layout = || match target.channels {
        1 => ffmpeg::channel_layout::ChannelLayout::MONO,
        2 => ffmpeg::channel_layout::ChannelLayout::STEREO,
        6 => ffmpeg::channel_layout::ChannelLayout::_5POINT1,
        8 => ffmpeg::channel_layout::ChannelLayout::_7POINT1,
        n => ffmpeg::channel_layout::ChannelLayout::default_for_channels(n),
    };
    let target_channels = make_layout().channels();

    let mut octx = ffmpeg::format::output_as(staged, crate::route::OUTPUT_MUXER)?;
    let mut ost = octx.add_stream(encoder_codec)?;

    let encoder_ctx = ffmpeg::codec::context::Context::new_with_codec(encoder_codec);
    let mut audio_encoder = encoder_ctx
        .encoder()
        .audio()
        .map_err(|e| Error::codec_init(format!("failed to create audio encoder: {}", e)))?;
    audio_encoder.set_ch_layout(make_layout());
    audio_encoder.set_rate(target.sample_rate as i32);
    audio_encoder.set_format(target_format);
    audio_encoder.set_bit_rate(target.bit_rate);
    audio_encoder.set_time_base(Rational::new(1, target.sample_rate as i32));

    let mut enc = audio_encoder
        .open()
        .map_err(|e| Error::codec_init(format!("failed to open encoder: {}", e)))?;

    // The output track is declared from the opened encoder's negotiated
    // parameters, not the nominal configuration; nothing is written to the
    // sink before this point.
    unsafe {
        let stream_params = (*ost.as_mut_ptr()).codecpar;
        let ret = ffmpeg::ffi::avcodec_parameters_from_context(stream_params, enc.as_ptr());
        if ret < 0 {
            return Err(Error::codec_init(
                "failed to copy encoder parameters to the output stream".to_string(),
            ));
        }
    }

    octx.write_header()?;
    let enc_tb = Rational::new(1, target.sample_rate as i32);
    let out_tb = octx.stream(0).map(|s| s.time_base()).unwrap_or(enc_tb);

    super::seek_to_window_start(&mut ictx, window);

    let frame_size = match enc.frame_size() {
        0 => 1024,
        n => n as usize,
    };
    let mut chunker = FrameChunker::new(frame_size, target_channels as usize);
    let mut resampler: Option<ffmpeg::software::resampling::Context> = None;
    let mut decoded = frame::Audio::empty();
    let mut next_pts: i64 = 0;
    let mut emitted = 0usize;

    let mut packets = ictx.packets();
    let mut pending: Option<ffmpeg::Packet> = None;
    let mut end_reached = false;
    let mut eof_sent = false;
    let mut send_retries = 0u32;

    loop {
        if pending.is_none() && !end_reached {
            match packets.next() {
                Some(result) => {
                    let (stream, packet) = result?;
                    if stream.index() == track.index {
                        let past_end = packet
                            .pts()
                            .or(packet.dts())
                            .map(|ts| {
                                let ts_us = ts.rescale(in_tb, (1, 1_000_000));
                                window.classify(ts_us) == WindowPosition::After
                            })
                            .unwrap_or(false);
                        if past_end {
                            end_reached = true;
                        } else {
                            pending = Some(packet);
                        }
                    }
                }
                None => end_reached = true,
            }
        }

        if let Some(packet) = pending.take() {
            match decoder.send_packet(&packet) {
                Ok(()) => send_retries = 0,
                Err(e) if is_again(&e) => {
                    send_retries += 1;
                    if send_retries > options.stall_limit {
                        return Err(Error::StalledPipeline {
                            stage: "decoder",
                            retries: send_retries,
                        });
                    }
                    pending = Some(packet);
                }
                Err(e) => return Err(e.into()),
            }
        } else if end_reached && !eof_sent {
            match decoder.send_eof() {
                Ok(()) | Err(ffmpeg::Error::Eof) => {}
                Err(e) => return Err(e.into()),
            }
            eof_sent = true;
        }

        while decoder.receive_frame(&mut decoded).is_ok() {
            let frame_us = decoded
                .pts()
                .map(|p| p.rescale(in_tb, (1, 1_000_000)))
                .unwrap_or(window.start_us);
            if window.classify(frame_us) != WindowPosition::Inside {
                continue;
            }

            if decoder.format() != target_format
                || decoder.rate() != target.sample_rate
                || decoder.ch_layout().channels() != target_channels
            {
                if resampler.is_none() {
                    resampler = Some(
                        ffmpeg::software::resampling::Context::get2(
                            decoder.format(),
                            decoder.ch_layout(),
                            decoder.rate(),
                            target_format,
                            make_layout(),
                            target.sample_rate,
                        )
                        .map_err(|e| {
                            Error::codec_init(format!("failed to create resampler: {}", e))
                        })?,
                    );
                }

                let mut resampled = frame::Audio::empty();
                resampler.as_mut().unwrap().run(&decoded, &mut resampled)?;
                chunker.push(&resampled);
            } else {
                chunker.push(&decoded);
            }
        }

        if eof_sent {
            // Samples can still sit inside the resampler after the decoder
            // runs dry; pull them out before the final chunk flush.
            if let Some(rc) = resampler.as_mut() {
                loop {
                    let mut resampled = frame::Audio::new(
                        target_format,
                        frame_size,
                        make_layout().mask().unwrap(),
                    );
                    resampled.set_rate(target.sample_rate);
                    rc.flush(&mut resampled)?;
                    if resampled.samples() == 0 {
                        break;
                    }
                    chunker.push(&resampled);
                }
            }
        }

        while let Some(chunk) = chunker.pop(eof_sent) {
            let samples = chunk[0].len();
            let mut raw = frame::Audio::new(target_format, samples, make_layout().mask().unwrap());
            raw.set_rate(target.sample_rate);
            for (ch, data) in chunk.iter().enumerate() {
                raw.plane_mut::<f32>(ch)[..samples].copy_from_slice(data);
            }
            raw.set_pts(Some(next_pts));
            next_pts += samples as i64;

            let mut encode_retries = 0u32;
            loop {
                // Drain before sending so a full encoder always has room.
                let mut progressed = false;
                let mut encoded = ffmpeg::Packet::empty();
                while enc.receive_packet(&mut encoded).is_ok() {
                    encoded.set_stream(0);
                    encoded.set_position(-1);
                    encoded.rescale_ts(enc_tb, out_tb);
                    encoded.write_interleaved(&mut octx)?;
                    emitted += 1;
                    progressed = true;
                }

                match enc.send_frame(&raw) {
                    Ok(()) => break,
                    Err(e) if is_again(&e) => {
                        if !progressed {
                            encode_retries += 1;
                            if encode_retries > options.stall_limit {
                                return Err(Error::StalledPipeline {
                                    stage: "encoder",
                                    retries: encode_retries,
                                });
                            }
                        }
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        if eof_sent {
            break;
        }
    }

    match enc.send_eof() {
        Ok(()) | Err(ffmpeg::Error::Eof) => {}
        Err(e) => return Err(e.into()),
    }

    let mut encoded = ffmpeg::Packet::empty();
    while enc.receive_packet(&mut encoded).is_ok() {
        encoded.set_stream(0);
        encoded.set_position(-1);
        encoded.rescale_ts(enc_tb, out_tb);
        encoded.write_interleaved(&mut octx)?;
        emitted += 1;
    }

    octx.write_trailer()?;

    #[cfg(feature = "tracing")]
    tracing::info!("Transcode complete: {} encoded samples emitted", emitted);
    let _ = emitted;

    Ok(())
}
