//! Countdown displays. The controller pushes remaining-time strings in; user
//! input flows back out as [`ControlSignal`]s.

use std::{
    io,
    sync::mpsc::{self, Receiver, SyncSender, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{prelude::*, widgets::*};
use tracing::{debug, warn};

use crate::{error::Result, session::ControlSignal};

const POLL_RATE: Duration = Duration::from_millis(50);
const ACCENT: Color = Color::Rgb(255, 100, 0);
const WORK: Color = Color::Rgb(100, 181, 246);
const BORDER: Color = Color::Rgb(0, 200, 255);

pub trait Display: Send {
    /// Takes over the output device. Called after the start notification so
    /// console output printed before it stays on the normal screen.
    fn begin(&mut self) {}
    /// Non-blocking; an update the display has not consumed yet may be dropped.
    fn set_remaining(&mut self, remaining: &str);
    /// Gives the output device back. Never fails; a display that could not
    /// begin is a no-op here.
    fn shutdown(&mut self);
}

/// Used when no interactive display is available.
pub struct HeadlessDisplay;

impl Display for HeadlessDisplay {
    fn set_remaining(&mut self, _remaining: &str) {}

    fn shutdown(&mut self) {}
}

// ============================================================================
// Terminal display
// ============================================================================

enum DisplayMessage {
    Remaining(String),
    /// End of session; the display loop exits on receipt.
    Finished,
}

/// Full-screen countdown drawn on its own thread once [`Display::begin`] runs.
/// If the terminal cannot be taken over it stays inactive and the session
/// runs headless.
pub struct TerminalDisplay {
    task: String,
    control: Option<SyncSender<ControlSignal>>,
    active: Option<ActiveTerminal>,
}

struct ActiveTerminal {
    updates: SyncSender<DisplayMessage>,
    handle: JoinHandle<io::Result<()>>,
}

impl TerminalDisplay {
    pub fn new(task: &str, control: SyncSender<ControlSignal>) -> Self {
        Self {
            task: task.into(),
            control: Some(control),
            active: None,
        }
    }

    fn spawn(task: &str, control: SyncSender<ControlSignal>) -> Result<ActiveTerminal> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err.into());
        }
        let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => terminal,
            Err(err) => {
                restore_terminal();
                return Err(err.into());
            }
        };

        let (updates, rx) = mpsc::sync_channel(1);
        let view = CountdownView::new(task);
        let handle = thread::Builder::new()
            .name("pomo-display".into())
            .spawn(move || run_display(terminal, rx, control, view));

        match handle {
            Ok(handle) => Ok(ActiveTerminal { updates, handle }),
            Err(err) => {
                restore_terminal();
                Err(err.into())
            }
        }
    }
}

impl Display for TerminalDisplay {
    fn begin(&mut self) {
        let Some(control) = self.control.take() else {
            return;
        };
        match Self::spawn(&self.task, control) {
            Ok(active) => self.active = Some(active),
            Err(err) => warn!(%err, "terminal display unavailable; running headless"),
        }
    }

    fn set_remaining(&mut self, remaining: &str) {
        let Some(active) = &self.active else {
            return;
        };
        if let Err(mpsc::TrySendError::Full(_)) =
            active.updates.try_send(DisplayMessage::Remaining(remaining.into()))
        {
            debug!("display busy; dropping tick");
        }
    }

    fn shutdown(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let _ = active.updates.send(DisplayMessage::Finished);
        match active.handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(%err, "terminal display stopped with an error"),
            Err(_) => warn!("terminal display thread panicked"),
        }
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}

fn run_display(
    mut terminal: Terminal<CrosstermBackend<io::Stdout>>,
    rx: Receiver<DisplayMessage>,
    control: SyncSender<ControlSignal>,
    mut view: CountdownView,
) -> io::Result<()> {
    let result = display_loop(&mut terminal, &rx, &control, &mut view);
    restore_terminal();
    let _ = terminal.show_cursor();
    result
}

fn display_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    rx: &Receiver<DisplayMessage>,
    control: &SyncSender<ControlSignal>,
    view: &mut CountdownView,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| render_countdown(f, view))?;

        if event::poll(POLL_RATE)? {
            if let Event::Key(key) = event::read()? {
                if let Some(signal) = handle_key(key, view) {
                    // The controller drains this every tick; a full slot
                    // means a signal is already pending.
                    if control.try_send(signal).is_err() {
                        debug!(?signal, "control signal dropped");
                    }
                }
            }
        }

        match rx.try_recv() {
            Ok(DisplayMessage::Remaining(text)) => {
                if !view.paused {
                    view.remaining = text;
                }
            }
            Ok(DisplayMessage::Finished) | Err(TryRecvError::Disconnected) => return Ok(()),
            Err(TryRecvError::Empty) => {}
        }
    }
}

// ============================================================================
// View state & input
// ============================================================================

struct CountdownView {
    task: String,
    remaining: String,
    paused: bool,
    stopping: bool,
}

impl CountdownView {
    fn new(task: &str) -> Self {
        Self {
            task: task.into(),
            remaining: "--:--".into(),
            paused: false,
            stopping: false,
        }
    }
}

fn handle_key(key: KeyEvent, view: &mut CountdownView) -> Option<ControlSignal> {
    if key.kind != KeyEventKind::Press || view.stopping {
        return None;
    }

    if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
    {
        view.stopping = true;
        return Some(ControlSignal::Abort);
    }

    match key.code {
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            view.paused = !view.paused;
            Some(if view.paused {
                ControlSignal::Pause
            } else {
                ControlSignal::Resume
            })
        }
        _ => None,
    }
}

fn render_countdown(f: &mut Frame, view: &CountdownView) {
    let area = centered_rect(40, 40, f.size());
    let (status, status_color) = if view.stopping {
        ("■ STOPPING", Color::Red)
    } else if view.paused {
        ("⏸ PAUSED", Color::Yellow)
    } else {
        ("▶ RUNNING", Color::Green)
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            view.task.as_str(),
            Style::default().fg(WORK).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            view.remaining.as_str(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(status, Style::default().fg(status_color))),
        Line::from(""),
        Line::from(Span::styled(
            "Space pause  •  Q abort",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
    ];

    let widget = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .title(" 🍅 POMO ")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(BORDER)),
    );

    f.render_widget(widget, area);
}

fn centered_rect(w: u16, h: u16, r: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h) / 2),
            Constraint::Percentage(h),
            Constraint::Percentage((100 - h) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w) / 2),
            Constraint::Percentage(w),
            Constraint::Percentage((100 - w) / 2),
        ])
        .split(v[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn space_toggles_pause_and_resume() {
        let mut view = CountdownView::new("Writing");
        assert_eq!(handle_key(press(KeyCode::Char(' ')), &mut view), Some(ControlSignal::Pause));
        assert!(view.paused);
        assert_eq!(handle_key(press(KeyCode::Char('p')), &mut view), Some(ControlSignal::Resume));
        assert!(!view.paused);
    }

    #[test]
    fn quit_keys_abort_once() {
        let mut view = CountdownView::new("Writing");
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key(ctrl_c, &mut view), Some(ControlSignal::Abort));
        assert_eq!(handle_key(press(KeyCode::Char('q')), &mut view), None);
        assert_eq!(handle_key(press(KeyCode::Char(' ')), &mut view), None);
    }

    #[test]
    fn other_keys_are_ignored() {
        let mut view = CountdownView::new("Writing");
        assert_eq!(handle_key(press(KeyCode::Char('x')), &mut view), None);
        assert_eq!(handle_key(press(KeyCode::Enter), &mut view), None);
        assert!(!view.paused);
    }

    #[test]
    fn countdown_shows_task_and_time() {
        let mut view = CountdownView::new("Writing");
        view.remaining = "0:24:59".into();
        let mut terminal = Terminal::new(TestBackend::new(80, 40)).unwrap();
        terminal.draw(|f| render_countdown(f, &view)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content.iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("Writing"));
        assert!(text.contains("0:24:59"));
        assert!(text.contains("RUNNING"));
    }

    #[test]
    fn terminal_display_is_inert_until_begin() {
        let (tx, _rx) = mpsc::sync_channel(1);
        let mut display = TerminalDisplay::new("Writing", tx);
        display.set_remaining("0:25:00");
        display.shutdown();
        assert!(display.active.is_none());
        assert!(display.control.is_some());
    }

    #[test]
    fn headless_display_accepts_updates() {
        let mut display = HeadlessDisplay;
        display.set_remaining("0:25:00");
        display.shutdown();
    }
}
