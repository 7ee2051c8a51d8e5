//! Desktop notifications with a console fallback, plus the audible alert.

use std::{
    path::Path,
    process::{Command, Stdio},
};

use notify_rust::Notification;
#[cfg(all(unix, not(target_os = "macos")))]
use notify_rust::Urgency;
use tracing::{debug, warn};

const APP_NAME: &str = "pomo";

const SOUND_CANDIDATES: &[(&str, &str)] = &[
    ("paplay", "/usr/share/sounds/freedesktop/stereo/complete.oga"),
    ("aplay", "/usr/share/sounds/sound-icons/guitar-11.wav"),
    ("aplay", "/usr/share/sounds/generic.wav"),
    ("afplay", "/System/Library/Sounds/Glass.aiff"),
];

pub trait Notifier: Send {
    /// Shows a notification. Never fails; backends fall back to the console.
    fn notify(&self, title: &str, message: &str, sound: bool);
}

/// Plays a system sound through whichever player was found at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundPlayer {
    command: String,
    file: String,
}

impl SoundPlayer {
    pub fn probe() -> Option<Self> {
        let found = SOUND_CANDIDATES
            .iter()
            .find(|(_, file)| Path::new(file).exists())
            .map(|(command, file)| Self {
                command: (*command).into(),
                file: (*file).into(),
            });
        debug!(player = ?found, "sound probe");
        found
    }

    pub fn play(&self) {
        let (command, file) = (self.command.clone(), self.file.clone());
        std::thread::spawn(move || {
            if let Err(err) = Command::new(&command)
                .arg(&file)
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()
            {
                debug!(%command, %err, "sound player failed; skipping alert");
            }
        });
    }
}

/// Framed banner printed when no desktop notification can be shown.
pub fn banner(title: &str, message: &str) -> String {
    let rule = "*".repeat(50);
    format!("\n\n{rule}\n{title}\n{message}\n{rule}\n\n")
}

pub struct ConsoleNotifier {
    sound: Option<SoundPlayer>,
}

impl ConsoleNotifier {
    pub fn new(sound: Option<SoundPlayer>) -> Self {
        Self { sound }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, title: &str, message: &str, sound: bool) {
        println!("{}", banner(title, message));
        if sound {
            if let Some(player) = &self.sound {
                player.play();
            }
        }
    }
}

pub struct DesktopNotifier {
    fallback: ConsoleNotifier,
    sound: Option<SoundPlayer>,
}

impl DesktopNotifier {
    pub fn new(sound: Option<SoundPlayer>) -> Self {
        Self {
            fallback: ConsoleNotifier::new(None),
            sound,
        }
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, message: &str, sound: bool) {
        let mut notification = Notification::new();
        notification
            .summary(title)
            .body(message)
            .appname(APP_NAME)
            .icon("alarm-clock");
        #[cfg(all(unix, not(target_os = "macos")))]
        notification.urgency(Urgency::Critical);

        if let Err(err) = notification.show() {
            warn!(%err, "desktop notification failed; printing to console");
            self.fallback.notify(title, message, false);
        }

        if sound {
            if let Some(player) = &self.sound {
                player.play();
            }
        }
    }
}
