use std::io::Cursor;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use super::{MediaBackend, PlayError};
use crate::constants::{PLAYER_POLL_INTERVAL_MILLIS, PREVIEW_LOAD_TIMEOUT_SECS, USER_AGENT};
use crate::error::{ClientError, Result};
use crate::utils::safe_lock;

enum AudioCommand {
    Load {
        url: String,
        reply: Sender<Result<()>>,
    },
    Play {
        reply: Sender<std::result::Result<(), PlayError>>,
    },
    Pause,
    Unload,
    SetVolume(f32),
    SetMuted(bool),
}

/// rodio output on a dedicated audio thread.
///
/// `OutputStream` is not `Send`, so the stream and its sink live on the
/// thread and are driven through a command channel. Preview bytes are
/// downloaded in full with a blocking client before decoding.
pub struct RodioBackend {
    command_tx: Sender<AudioCommand>,
    is_finished: Arc<Mutex<bool>>,
}

impl RodioBackend {
    pub fn new() -> Self {
        let (command_tx, command_rx) = channel();
        let is_finished = Arc::new(Mutex::new(false));
        let is_finished_clone = Arc::clone(&is_finished);

        std::thread::spawn(move || audio_thread(command_rx, is_finished_clone));

        Self {
            command_tx,
            is_finished,
        }
    }

    fn send(&self, command: AudioCommand) {
        if self.command_tx.send(command).is_err() {
            log::error!("[AudioThread] Audio thread is gone");
        }
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for RodioBackend {
    fn load(&mut self, url: &str) -> Result<()> {
        let (reply, rx) = channel();
        self.send(AudioCommand::Load {
            url: url.to_string(),
            reply,
        });
        rx.recv()
            .map_err(|_| ClientError::Playback("Audio output is unavailable".to_string()))?
    }

    fn play(&mut self) -> std::result::Result<(), PlayError> {
        let (reply, rx) = channel();
        self.send(AudioCommand::Play { reply });
        rx.recv()
            .map_err(|_| PlayError::Failed("audio thread is gone".to_string()))?
    }

    fn pause(&mut self) {
        self.send(AudioCommand::Pause);
    }

    fn unload(&mut self) {
        self.send(AudioCommand::Unload);
    }

    fn set_volume(&mut self, volume: f32) {
        self.send(AudioCommand::SetVolume(volume));
    }

    fn set_muted(&mut self, muted: bool) {
        self.send(AudioCommand::SetMuted(muted));
    }

    fn is_finished(&self) -> bool {
        *safe_lock(&self.is_finished, "AudioThread")
    }
}

struct AudioThread {
    handle: Option<OutputStreamHandle>,
    sink: Option<Sink>,
    http: Option<reqwest::blocking::Client>,
    volume: f32,
    muted: bool,
}

fn audio_thread(command_rx: Receiver<AudioCommand>, is_finished: Arc<Mutex<bool>>) {
    // Keep the stream alive for the thread's lifetime
    let (_stream, handle) = match OutputStream::try_default() {
        Ok((stream, handle)) => (Some(stream), Some(handle)),
        Err(e) => {
            log::error!("[AudioThread] No audio output device: {}", e);
            (None, None)
        }
    };
    let http = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(PREVIEW_LOAD_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| log::error!("[AudioThread] Failed to build HTTP client: {}", e))
        .ok();

    let mut state = AudioThread {
        handle,
        sink: None,
        http,
        volume: 1.0,
        muted: false,
    };

    loop {
        match command_rx.recv_timeout(Duration::from_millis(PLAYER_POLL_INTERVAL_MILLIS)) {
            Ok(command) => state.handle_command(command, &is_finished),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::debug!("[AudioThread] Backend dropped, shutting down");
                state.unload();
                return;
            }
        }

        if let Some(sink) = state.sink.as_ref() {
            if !sink.is_paused() && sink.empty() {
                *safe_lock(&is_finished, "AudioThread") = true;
            }
        }
    }
}

impl AudioThread {
    fn handle_command(&mut self, command: AudioCommand, is_finished: &Mutex<bool>) {
        match command {
            AudioCommand::Load { url, reply } => {
                // Reset finished flag BEFORE loading new track
                *safe_lock(is_finished, "AudioThread") = false;
                self.unload();
                let _ = reply.send(self.load(&url));
            }
            AudioCommand::Play { reply } => {
                let result = match self.sink.as_ref() {
                    Some(sink) => {
                        sink.play();
                        Ok(())
                    }
                    None => Err(PlayError::Failed("nothing loaded".to_string())),
                };
                let _ = reply.send(result);
            }
            AudioCommand::Pause => {
                if let Some(sink) = self.sink.as_ref() {
                    sink.pause();
                }
            }
            AudioCommand::Unload => {
                self.unload();
                *safe_lock(is_finished, "AudioThread") = false;
            }
            AudioCommand::SetVolume(volume) => {
                self.volume = volume;
                self.apply_volume();
            }
            AudioCommand::SetMuted(muted) => {
                self.muted = muted;
                self.apply_volume();
            }
        }
    }

    fn load(&mut self, url: &str) -> Result<()> {
        let handle = self
            .handle
            .as_ref()
            .ok_or_else(|| ClientError::Playback("No audio output device".to_string()))?;
        let http = self
            .http
            .as_ref()
            .ok_or_else(|| ClientError::Playback("Audio downloader unavailable".to_string()))?;

        log::debug!("[AudioThread] Downloading {}", url);
        let bytes = http.get(url).send()?.error_for_status()?.bytes()?;
        log::info!("[AudioThread] Downloaded {} KB", bytes.len() / 1024);

        let source = Decoder::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| ClientError::Playback(format!("Unsupported audio: {}", e)))?;
        let sink = Sink::try_new(handle)
            .map_err(|e| ClientError::Playback(format!("Audio output failed: {}", e)))?;
        sink.pause();
        sink.append(source);
        self.sink = Some(sink);
        self.apply_volume();
        Ok(())
    }

    fn unload(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn apply_volume(&self) {
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(if self.muted { 0.0 } else { self.volume });
        }
    }
}
