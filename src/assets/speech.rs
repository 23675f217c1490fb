use std::io::Write as _;
use std::process::{Command, Stdio};

use crate::foundation::config::TtsBackend;
use crate::foundation::error::{ThalaError, ThalaResult};

/// Encoded audio returned by a [`SpeechSynthesizer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesizedSpeech {
    pub bytes: Vec<u8>,
    /// Container name understood by the media decoder (e.g. `wav`, `mp3`).
    pub format: String,
}

/// Text-to-speech collaborator used by `speak` leaves.
pub trait SpeechSynthesizer {
    fn synthesize(&mut self, text: &str) -> ThalaResult<SynthesizedSpeech>;
}

/// Build the synthesizer selected by the engine config.
pub fn synthesizer_for(backend: &TtsBackend) -> Box<dyn SpeechSynthesizer> {
    match backend {
        TtsBackend::Disabled => Box::new(DisabledSynthesizer),
        TtsBackend::Command {
            program,
            args,
            format,
        } => Box::new(CommandSynthesizer {
            program: program.clone(),
            args: args.clone(),
            format: format.clone(),
        }),
    }
}

/// Fails every request.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledSynthesizer;

impl SpeechSynthesizer for DisabledSynthesizer {
    fn synthesize(&mut self, _text: &str) -> ThalaResult<SynthesizedSpeech> {
        Err(ThalaError::config(
            "speech synthesis is disabled; configure a `tts` backend",
        ))
    }
}

/// Runs an external program per request.
///
/// The text is written to the program's stdin and substituted for any literal `{text}`
/// argument; stdout must carry the encoded audio.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSynthesizer {
    pub program: String,
    pub args: Vec<String>,
    pub format: String,
}

impl SpeechSynthesizer for CommandSynthesizer {
    #[tracing::instrument(skip(self), fields(program = %self.program))]
    fn synthesize(&mut self, text: &str) -> ThalaResult<SynthesizedSpeech> {
        let args = self.args.iter().map(|a| a.replace("{text}", text));
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ThalaError::upstream(format!("failed to run speech program '{}': {e}", self.program))
            })?;

        let writer = child.stdin.take().map(|mut stdin| {
            let bytes = text.as_bytes().to_vec();
            std::thread::spawn(move || stdin.write_all(&bytes))
        });
        let out = child
            .wait_with_output()
            .map_err(|e| ThalaError::upstream(format!("failed to wait for speech program: {e}")))?;
        if let Some(handle) = writer {
            // The program may ignore stdin and exit early; a broken pipe is not an error then.
            let _ = handle
                .join()
                .map_err(|_| ThalaError::upstream("speech stdin writer thread panicked"))?;
        }

        if !out.status.success() {
            return Err(ThalaError::upstream(format!(
                "speech program '{}' exited with {}: {}",
                self.program,
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }
        if out.stdout.is_empty() {
            return Err(ThalaError::upstream(format!(
                "speech program '{}' produced no audio",
                self.program
            )));
        }
        tracing::debug!(bytes = out.stdout.len(), "synthesized speech");
        Ok(SynthesizedSpeech {
            bytes: out.stdout,
            format: self.format.clone(),
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/speech.rs"]
mod tests;
