//! Preview playback
//!
//! One exclusive audio resource. Switching tracks always tears the old one
//! down before the new one is built, so two previews never overlap.

pub mod rodio_backend;

pub use rodio_backend::RodioBackend;

use crate::constants::{DEFAULT_VOLUME, DEFAULT_VOLUME_BEFORE_MUTE};
use crate::error::{ClientError, Result};
use crate::models::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Loading,
    Ready,
    Playing,
    Paused,
    Error,
}

/// Why a backend refused to start playback
#[derive(Debug, Clone, PartialEq)]
pub enum PlayError {
    /// The platform only allows muted autoplay
    AutoplayBlocked,
    Failed(String),
}

/// Output device abstraction
pub trait MediaBackend: Send {
    /// Fetch and decode `url`; playback stays paused until `play`
    fn load(&mut self, url: &str) -> Result<()>;
    fn play(&mut self) -> std::result::Result<(), PlayError>;
    fn pause(&mut self);
    /// Stop output and release everything held for the current source
    fn unload(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn set_muted(&mut self, muted: bool);
    /// True once a loaded source has played to the end
    fn is_finished(&self) -> bool;
}

type TrackEndCallback = Box<dyn FnMut(&Track) + Send>;

pub struct AudioPlayer<B: MediaBackend> {
    backend: B,
    state: PlaybackState,
    current: Option<Track>,
    volume: f32,
    volume_before_mute: f32,
    muted: bool,
    error: Option<String>,
    on_track_end: Option<TrackEndCallback>,
}

impl<B: MediaBackend> AudioPlayer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: PlaybackState::Idle,
            current: None,
            volume: DEFAULT_VOLUME,
            volume_before_mute: DEFAULT_VOLUME_BEFORE_MUTE,
            muted: false,
            error: None,
            on_track_end: None,
        }
    }

    /// Called with the finished track whenever a preview plays to the end
    pub fn on_track_end(&mut self, callback: impl FnMut(&Track) + Send + 'static) {
        self.on_track_end = Some(Box::new(callback));
    }

    /// Replace whatever is loaded with `track` and start it.
    ///
    /// When the backend blocks autoplay, playback is retried once muted.
    pub fn play_track(&mut self, track: &Track) -> Result<()> {
        self.release();
        self.error = None;

        let url = match track.preview_url.as_deref() {
            Some(url) if !url.trim().is_empty() => url.to_string(),
            _ => {
                return self.fail(format!("No preview available for '{}'", track.title));
            }
        };

        log::info!("[Player] Loading preview for '{}' ({})", track.title, track.id);
        self.state = PlaybackState::Loading;
        self.current = Some(track.clone());

        if let Err(e) = self.backend.load(&url) {
            log::error!("[Player] Failed to load {}: {}", url, e);
            self.backend.unload();
            self.current = None;
            return self.fail(e.user_message());
        }
        self.state = PlaybackState::Ready;
        self.backend.set_volume(self.volume);
        self.backend.set_muted(self.muted);

        match self.backend.play() {
            Ok(()) => {}
            Err(PlayError::AutoplayBlocked) => {
                log::warn!("[Player] Autoplay blocked - retrying muted");
                self.mute();
                if let Err(e) = self.backend.play() {
                    log::error!("[Player] Muted retry failed: {:?}", e);
                    self.state = PlaybackState::Error;
                    let message = "Playback was blocked. Press play to start the preview.".to_string();
                    self.error = Some(message.clone());
                    return Err(ClientError::Playback(message));
                }
            }
            Err(PlayError::Failed(reason)) => {
                log::error!("[Player] Playback failed: {}", reason);
                return self.fail(format!("Could not play '{}'", track.title));
            }
        }

        self.state = PlaybackState::Playing;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.backend.pause();
            self.state = PlaybackState::Paused;
            log::debug!("[Player] Paused");
        }
    }

    /// Resume after a pause, or start a track left in `Ready`/`Error` by a blocked autoplay
    pub fn resume(&mut self) -> Result<()> {
        if self.current.is_none() || self.state == PlaybackState::Playing {
            return Ok(());
        }
        match self.backend.play() {
            Ok(()) => {
                self.state = PlaybackState::Playing;
                self.error = None;
                log::debug!("[Player] Resumed");
                Ok(())
            }
            Err(e) => {
                log::error!("[Player] Resume failed: {:?}", e);
                self.fail("Playback could not be resumed.".to_string())
            }
        }
    }

    /// Stop and release the current track
    pub fn stop(&mut self) {
        if self.current.is_some() {
            log::debug!("[Player] Stopped");
        }
        self.release();
    }

    pub fn toggle_mute(&mut self) {
        if self.current.is_none() {
            return;
        }
        if self.muted {
            self.unmute();
        } else {
            self.mute();
        }
    }

    /// Clamped to `[0, 1]`; a non-zero volume also unmutes
    pub fn set_volume(&mut self, volume: f32) {
        if self.current.is_none() {
            return;
        }
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.volume = volume;
        self.backend.set_volume(volume);
        if self.muted && volume > 0.0 {
            self.muted = false;
            self.backend.set_muted(false);
        }
    }

    /// Detect the natural end of the current preview.
    ///
    /// Returns the finished track after releasing it and notifying the
    /// `on_track_end` callback.
    pub fn poll(&mut self) -> Option<Track> {
        if self.state != PlaybackState::Playing || !self.backend.is_finished() {
            return None;
        }
        let track = self.current.take()?;
        log::info!("[Player] Finished '{}'", track.title);
        self.backend.unload();
        self.state = PlaybackState::Idle;
        if let Some(callback) = self.on_track_end.as_mut() {
            callback(&track);
        }
        Some(track)
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn mute(&mut self) {
        if self.volume > 0.0 {
            self.volume_before_mute = self.volume;
        }
        self.muted = true;
        self.backend.set_muted(true);
    }

    fn unmute(&mut self) {
        if self.volume <= 0.0 {
            self.volume = self.volume_before_mute;
            self.backend.set_volume(self.volume);
        }
        self.muted = false;
        self.backend.set_muted(false);
    }

    fn release(&mut self) {
        if self.current.take().is_some() {
            self.backend.unload();
        }
        self.state = PlaybackState::Idle;
    }

    fn fail(&mut self, message: String) -> Result<()> {
        self.state = PlaybackState::Error;
        self.error = Some(message.clone());
        Err(ClientError::Playback(message))
    }
}

impl<B: MediaBackend> Drop for AudioPlayer<B> {
    fn drop(&mut self) {
        self.release();
    }
}
