use std::cell::Cell;
use std::path::PathBuf;

use super::*;
use crate::assets::speech::SynthesizedSpeech;
use crate::render::raster::Raster;
use crate::scene::element::Element;
use crate::scene::node::Scene;

const RATE: u32 = 100;

/// Audio files named `<seconds>s.wav` decode to a constant tone of that length.
struct ToneDecoder {
    file_decodes: Cell<usize>,
}

impl ToneDecoder {
    fn new() -> Self {
        Self {
            file_decodes: Cell::new(0),
        }
    }
}

fn tone(secs: f64, level: f32) -> AudioSegment {
    let frames = (secs * f64::from(RATE)) as usize;
    AudioSegment::new(RATE, 1, vec![level; frames]).unwrap()
}

impl MediaDecoder for ToneDecoder {
    /// Movies are named `<picture secs>s-<sound secs>s.mp4` and run at 10 fps.
    fn probe_video(&self, path: &Path) -> ThalaResult<crate::assets::media::VideoInfo> {
        let (picture, _) = movie_secs(path)?;
        Ok(crate::assets::media::VideoInfo {
            source_path: path.to_path_buf(),
            width: 4,
            height: 4,
            frame_count: (picture * 10.0).round() as u64 + 1,
            fps: 10.0,
        })
    }

    fn decode_video_frame(
        &self,
        _info: &crate::assets::media::VideoInfo,
        _t: f64,
    ) -> ThalaResult<Option<Raster>> {
        Err(ThalaError::upstream("no video in tests"))
    }

    fn decode_audio_file(&self, path: &Path, sample_rate: u32) -> ThalaResult<AudioSegment> {
        assert_eq!(sample_rate, RATE);
        self.file_decodes.set(self.file_decodes.get() + 1);
        if path.extension().is_some_and(|e| e == "mp4") {
            let (_, sound) = movie_secs(path)?;
            return Ok(tone(sound, 0.25));
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ThalaError::upstream("bad name"))?;
        let secs: f64 = stem
            .trim_end_matches('s')
            .parse()
            .map_err(|_| ThalaError::upstream(format!("unknown file {stem}")))?;
        Ok(tone(secs, 0.25))
    }

    fn decode_audio_bytes(
        &self,
        bytes: &[u8],
        format: &str,
        _sample_rate: u32,
    ) -> ThalaResult<AudioSegment> {
        assert_eq!(format, "chars");
        // Each character lasts a tenth of a second.
        Ok(tone(bytes.len() as f64 * 0.1, 0.5))
    }

    fn decode_image(&self, _path: &Path) -> ThalaResult<Raster> {
        Err(ThalaError::upstream("no images in tests"))
    }
}

fn movie_secs(path: &Path) -> ThalaResult<(f64, f64)> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ThalaError::upstream("bad name"))?;
    let (picture, sound) = stem
        .split_once('-')
        .ok_or_else(|| ThalaError::upstream(format!("unknown movie {stem}")))?;
    let secs = |part: &str| {
        part.trim_end_matches('s')
            .parse::<f64>()
            .map_err(|_| ThalaError::upstream(format!("unknown movie {stem}")))
    };
    Ok((secs(picture)?, secs(sound)?))
}

#[derive(Default)]
struct CountingSpeech {
    requests: Vec<String>,
}

impl SpeechSynthesizer for CountingSpeech {
    fn synthesize(&mut self, text: &str) -> ThalaResult<SynthesizedSpeech> {
        self.requests.push(text.to_owned());
        Ok(SynthesizedSpeech {
            bytes: text.as_bytes().to_vec(),
            format: "chars".to_owned(),
        })
    }
}

fn run(el: Element) -> ThalaResult<AudioSegment> {
    let scene = Scene::parse(&el)?;
    let decoder = ToneDecoder::new();
    let mut speech = CountingSpeech::default();
    let mut sources = AudioSources {
        decoder: &decoder,
        speech: &mut speech,
        assets_root: Path::new("assets"),
        sample_rate: RATE,
    };
    build_audio(scene.root(), &mut sources, &mut LeafAudioCache::new())
}

fn audio(secs: &str) -> Element {
    Element::new("audio").attr("src", format!("{secs}.wav"))
}

fn assert_secs(a: &AudioSegment, secs: f64) {
    assert!(
        (a.duration_secs() - secs).abs() < 1e-9,
        "expected {secs}s, got {}s",
        a.duration_secs()
    );
}

#[test]
fn leaves_are_decoded_once_per_cache() {
    let scene = Scene::parse(
        &Element::new("seq")
            .child(Element::new("speak").text("abcd"))
            .child(audio("1s")),
    )
    .unwrap();
    let decoder = ToneDecoder::new();
    let mut speech = CountingSpeech::default();
    let mut cache = LeafAudioCache::new();
    for _ in 0..2 {
        let mut sources = AudioSources {
            decoder: &decoder,
            speech: &mut speech,
            assets_root: Path::new("assets"),
            sample_rate: RATE,
        };
        let out = build_audio(scene.root(), &mut sources, &mut cache).unwrap();
        assert_secs(&out, 1.4);
    }
    assert_eq!(speech.requests, vec!["abcd".to_owned()]);
    assert_eq!(decoder.file_decodes.get(), 1);
    assert_eq!(cache.len(), 2);
    assert!((cache.duration_secs(NodeId(1)).unwrap() - 0.4).abs() < 1e-9);
    assert!(matches!(
        cache.duration_secs(NodeId(0)),
        Err(ThalaError::Config(_))
    ));
}

#[test]
fn speak_synthesizes_alias_text() {
    let scene = Scene::parse(
        &Element::new("speak")
            .text("A")
            .child(Element::new("sub").attr("alias", "BBB").text("X").tail("Y")),
    )
    .unwrap();
    let decoder = ToneDecoder::new();
    let mut speech = CountingSpeech::default();
    let mut sources = AudioSources {
        decoder: &decoder,
        speech: &mut speech,
        assets_root: Path::new("."),
        sample_rate: RATE,
    };
    let out = build_audio(scene.root(), &mut sources, &mut LeafAudioCache::new()).unwrap();
    assert_eq!(speech.requests, vec!["ABBBY".to_owned()]);
    assert_secs(&out, 0.5);
}

#[test]
fn image_leaf_is_silence_of_its_duration() {
    let out = run(Element::new("image").attr("src", "a.png").attr("duration", "1500ms")).unwrap();
    assert_secs(&out, 1.5);
    assert!(out.samples().iter().all(|s| *s == 0.0));
}

#[test]
fn media_speeds_up_or_pads_to_duration() {
    let shorter = run(Element::new("media").attr("duration", "1s").child(audio("2s"))).unwrap();
    assert_secs(&shorter, 1.0);
    assert_eq!(shorter.sample_rate(), 2 * RATE);

    let longer = run(Element::new("media").attr("duration", "3s").child(audio("2s"))).unwrap();
    assert_secs(&longer, 3.0);
    assert_eq!(longer.samples()[199], 0.25);
    assert_eq!(longer.samples()[200], 0.0);

    let untouched = run(Element::new("media").attr("width", "10").child(audio("2s"))).unwrap();
    assert_eq!(untouched, tone(2.0, 0.25));
}

#[test]
fn crop_slices_seconds() {
    let out = run(Element::new("crop")
        .attr("t0", "500ms")
        .attr("t1", "1.5")
        .child(audio("2s")))
    .unwrap();
    assert_secs(&out, 1.0);

    let clamped = run(Element::new("crop").attr("t1", "10s").child(audio("2s"))).unwrap();
    assert_secs(&clamped, 2.0);

    let err = run(Element::new("crop")
        .attr("t0", "2s")
        .attr("t1", "1s")
        .child(audio("2s")))
    .unwrap_err();
    assert!(matches!(err, ThalaError::ParameterRange(_)), "{err}");
}

#[test]
fn margin_surrounds_with_silence() {
    let out = run(Element::new("margin")
        .attr("before", "1s")
        .attr("after", "0.5s")
        .attr("left", "30")
        .child(audio("1s")))
    .unwrap();
    assert_secs(&out, 2.5);
    assert_eq!(out.samples()[99], 0.0);
    assert_eq!(out.samples()[100], 0.25);
    assert_eq!(out.samples()[199], 0.25);
    assert_eq!(out.samples()[200], 0.0);
}

#[test]
fn scale_applies_gain_then_time_factor() {
    let out = run(Element::new("scale")
        .attr("soundLevel", "-20dB")
        .attr("duration", "4s")
        .child(audio("2s")))
    .unwrap();
    assert_secs(&out, 4.0);
    assert!((out.samples()[0] - 0.025).abs() < 1e-6);

    let by_ft = run(Element::new("scale").attr("ft", "0.5").child(audio("2s"))).unwrap();
    assert_secs(&by_ft, 1.0);

    let err = run(Element::new("scale")
        .attr("duration", "1s")
        .child(Element::new("image").attr("src", "a.png")))
    .unwrap_err();
    assert!(matches!(err, ThalaError::ParameterRange(_)), "{err}");
}

#[test]
fn par_overlays_shorter_onto_longer_regardless_of_order() {
    let ab = run(Element::new("par").child(audio("5s")).child(audio("2s"))).unwrap();
    let ba = run(Element::new("par").child(audio("2s")).child(audio("5s"))).unwrap();
    assert_eq!(ab, ba);
    assert_secs(&ab, 5.0);
    assert_eq!(ab.samples()[0], 0.5);
    assert_eq!(ab.samples()[300], 0.25);
}

#[test]
fn seq_concatenates_in_order() {
    let out = run(Element::new("seq")
        .child(audio("1s"))
        .child(Element::new("image").attr("src", "a.png").attr("duration", "1s"))
        .child(audio("0.5s")))
    .unwrap();
    assert_secs(&out, 2.5);
    assert_eq!(out.samples()[50], 0.25);
    assert_eq!(out.samples()[150], 0.0);
    assert_eq!(out.samples()[220], 0.25);
}

#[test]
fn decoder_failures_abort_the_pass() {
    let err = run(Element::new("seq").child(audio("1s")).child(
        Element::new("audio").attr("src", PathBuf::from("missing.wav").display().to_string()),
    ))
    .unwrap_err();
    assert!(matches!(err, ThalaError::UpstreamService(_)), "{err}");
}

#[test]
fn movie_audio_is_fitted_to_the_picture() {
    let movie = |name: &str| Element::new("movie").attr("src", name);

    // No soundtrack at all: silence for the whole picture.
    let silent = run(movie("3s-0s.mp4")).unwrap();
    assert_secs(&silent, 3.0);
    assert!(silent.samples().iter().all(|s| *s == 0.0));

    // Soundtrack longer than the picture is trimmed.
    assert_secs(&run(movie("2s-5s.mp4")).unwrap(), 2.0);

    // Narration after a silent movie starts when the picture ends.
    let seq = run(
        Element::new("seq")
            .child(movie("3s-0s.mp4"))
            .child(Element::new("speak").text("hello")),
    )
    .unwrap();
    assert_secs(&seq, 3.5);
    let first_voiced = seq.samples().iter().position(|s| *s != 0.0).unwrap();
    assert_eq!(first_voiced, 3 * RATE as usize);
}
