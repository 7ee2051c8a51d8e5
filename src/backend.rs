//! Startup capability probing and backend selection.

use std::{io::IsTerminal, sync::mpsc::SyncSender};

use tracing::info;

use crate::{
    config::Config,
    display::{Display, HeadlessDisplay, TerminalDisplay},
    notify::{ConsoleNotifier, DesktopNotifier, Notifier, SoundPlayer},
    session::ControlSignal,
};

/// What this machine can do, probed once before the session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub desktop_notifications: bool,
    pub sound: Option<SoundPlayer>,
    pub interactive_terminal: bool,
}

impl Capabilities {
    pub fn probe(config: &Config) -> Self {
        let caps = Self {
            desktop_notifications: config.desktop_notifications && desktop_session_available(),
            sound: if config.sound_enabled { SoundPlayer::probe() } else { None },
            interactive_terminal: config.interactive_display
                && std::io::stdin().is_terminal()
                && std::io::stdout().is_terminal(),
        };
        info!(?caps, "probed capabilities");
        caps
    }

    /// Nothing interactive, nothing audible.
    pub fn headless() -> Self {
        Self {
            desktop_notifications: false,
            sound: None,
            interactive_terminal: false,
        }
    }

    pub fn notifier(&self) -> Box<dyn Notifier> {
        if self.desktop_notifications {
            Box::new(DesktopNotifier::new(self.sound.clone()))
        } else {
            Box::new(ConsoleNotifier::new(self.sound.clone()))
        }
    }

    /// The terminal display itself falls back to headless if it cannot take
    /// over the terminal when the session begins.
    pub fn display(&self, task: &str, control: SyncSender<ControlSignal>) -> Box<dyn Display> {
        if self.interactive_terminal {
            Box::new(TerminalDisplay::new(task, control))
        } else {
            Box::new(HeadlessDisplay)
        }
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn desktop_session_available() -> bool {
    std::env::var_os("DBUS_SESSION_BUS_ADDRESS").is_some()
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn desktop_session_available() -> bool {
    true
}
