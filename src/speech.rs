//! Reading questions and answers aloud.

use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

/// Speaking rate and pitch, 1.0 being the engine's normal voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voice {
    pub rate: f32,
    pub pitch: f32,
}

impl Voice {
    /// Slower and a little higher for young listeners.
    pub const CHILDREN: Voice = Voice { rate: 0.85, pitch: 1.1 };
    pub const ADULT: Voice = Voice { rate: 1.1, pitch: 1.0 };

    /// espeak words-per-minute (its default is 175).
    fn words_per_minute(self) -> u32 {
        (175.0 * self.rate).round() as u32
    }

    /// espeak pitch on its 0-99 scale (its default is 50).
    fn espeak_pitch(self) -> u32 {
        ((50.0 * self.pitch).round() as u32).min(99)
    }
}

/// The one speech capability the trainers need.
pub trait Speaker {
    /// Start reading `text`, cutting off anything still being read.
    fn speak(&mut self, text: &str);
    /// Silence any utterance in progress.
    fn stop(&mut self);
}

/// Silent speaker for `--mute`.
#[derive(Debug, Default)]
pub struct NoopSpeaker;

impl Speaker for NoopSpeaker {
    fn speak(&mut self, _text: &str) {}
    fn stop(&mut self) {}
}

/// Runs an espeak-compatible program for every utterance.
#[derive(Debug)]
pub struct CommandSpeaker {
    program: String,
    voice: Voice,
    child: Option<Child>,
    unavailable: bool,
}

impl CommandSpeaker {
    pub fn new(program: impl Into<String>, voice: Voice) -> Self {
        Self {
            program: program.into(),
            voice,
            child: None,
            unavailable: false,
        }
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&mut self, text: &str) {
        self.stop();
        if self.unavailable || text.trim().is_empty() {
            return;
        }
        let spawned = Command::new(&self.program)
            .arg("-s")
            .arg(self.voice.words_per_minute().to_string())
            .arg("-p")
            .arg(self.voice.espeak_pitch().to_string())
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            Ok(child) => {
                debug!(program = %self.program, chars = text.len(), "speaking");
                self.child = Some(child);
            }
            Err(err) => {
                // Only warn once; the trainers keep working without audio.
                warn!(program = %self.program, %err, "speech unavailable");
                self.unavailable = true;
            }
        }
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CommandSpeaker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::Speaker;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Spoken {
        Said(String),
        Stopped,
    }

    /// Records every call so tests can assert on speech side effects.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingSpeaker {
        log: Arc<Mutex<Vec<Spoken>>>,
    }

    impl RecordingSpeaker {
        pub fn log(&self) -> Vec<Spoken> {
            self.log.lock().unwrap().clone()
        }

        pub fn said(&self) -> Vec<String> {
            self.log()
                .into_iter()
                .filter_map(|event| match event {
                    Spoken::Said(text) => Some(text),
                    Spoken::Stopped => None,
                })
                .collect()
        }

        pub fn clear(&self) {
            self.log.lock().unwrap().clear();
        }
    }

    impl Speaker for RecordingSpeaker {
        fn speak(&mut self, text: &str) {
            self.log.lock().unwrap().push(Spoken::Said(text.to_string()));
        }

        fn stop(&mut self) {
            self.log.lock().unwrap().push(Spoken::Stopped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_maps_to_espeak_arguments() {
        assert_eq!(Voice::CHILDREN.words_per_minute(), 149);
        assert_eq!(Voice::CHILDREN.espeak_pitch(), 55);
        assert_eq!(Voice::ADULT.words_per_minute(), 193);
        assert_eq!(Voice::ADULT.espeak_pitch(), 50);
    }

    #[test]
    fn missing_program_disables_speech_quietly() {
        let mut speaker = CommandSpeaker::new("definitely-not-a-tts-binary", Voice::ADULT);
        speaker.speak("Who made you?");
        assert!(speaker.unavailable);
        assert!(speaker.child.is_none());
        speaker.speak("God.");
        speaker.stop();
    }
}
