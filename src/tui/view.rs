use std::{
    fs::File,
    io::Write,
    sync::{Arc, Mutex, MutexGuard},
};

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
};
use strum::{EnumIter, IntoEnumIterator};

use crate::{
    session::{SessionSnapshot, SessionStatus},
    stream::MotorImagery,
    util::DateTimeExt,
};

use super::{
    SessionUiMessage,
    error::{Result, TuiError},
};

const HELP_TEXT: &str =
    " [v] verify  [s] start/stop  [tab] switch pane  [arrows] scroll  [t] top  [b] bottom  [q] quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub(super) enum SessionTuiPane {
    StatusPane,
    SignalPane,
    HistoryPane,
    LogPane,
}

impl SessionTuiPane {
    fn title(&self) -> &'static str {
        match self {
            SessionTuiPane::StatusPane => "Session",
            SessionTuiPane::SignalPane => "Signal",
            SessionTuiPane::HistoryPane => "History",
            SessionTuiPane::LogPane => "Log",
        }
    }

    fn next(self) -> Self {
        Self::iter()
            .cycle()
            .skip_while(|pane| *pane != self)
            .nth(1)
            .unwrap_or(self)
    }
}

#[derive(Default)]
struct PaneState {
    lines: Vec<String>,
    max_line_width: usize,
    rect: Rect,
    v_scroll: usize,
    h_scroll: usize,
}

impl PaneState {
    fn with_placeholder(text: &str) -> Self {
        let mut pane = Self::default();
        pane.set_lines(vec![text.to_string()]);
        pane
    }

    fn set_lines(&mut self, lines: Vec<String>) {
        self.max_line_width = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        self.lines = lines;
        self.v_scroll = self.v_scroll.min(self.max_v_scroll());
        self.h_scroll = self.h_scroll.min(self.max_h_scroll());
    }

    fn max_v_scroll(&self) -> usize {
        let visible = self.rect.height.saturating_sub(2) as usize;
        self.lines.len().saturating_sub(visible)
    }

    fn max_h_scroll(&self) -> usize {
        let visible = self.rect.width.saturating_sub(2) as usize;
        self.max_line_width.saturating_sub(visible)
    }
}

pub(super) struct SessionTuiViewState {
    log_file: Option<File>,
    active_pane: SessionTuiPane,
    status: PaneState,
    signal: PaneState,
    history: PaneState,
    log: PaneState,
}

impl SessionTuiViewState {
    fn pane(&self, pane: SessionTuiPane) -> &PaneState {
        match pane {
            SessionTuiPane::StatusPane => &self.status,
            SessionTuiPane::SignalPane => &self.signal,
            SessionTuiPane::HistoryPane => &self.history,
            SessionTuiPane::LogPane => &self.log,
        }
    }

    fn pane_mut(&mut self, pane: SessionTuiPane) -> &mut PaneState {
        match pane {
            SessionTuiPane::StatusPane => &mut self.status,
            SessionTuiPane::SignalPane => &mut self.signal,
            SessionTuiPane::HistoryPane => &mut self.history,
            SessionTuiPane::LogPane => &mut self.log,
        }
    }

    fn active_mut(&mut self) -> &mut PaneState {
        self.pane_mut(self.active_pane)
    }
}

pub(super) struct SessionTuiView {
    max_tui_log_len: usize,
    state: Mutex<SessionTuiViewState>,
}

impl SessionTuiView {
    pub fn new(max_tui_log_len: usize, log_file: Option<File>) -> Arc<Self> {
        Arc::new(Self {
            max_tui_log_len,
            state: Mutex::new(SessionTuiViewState {
                log_file,
                active_pane: SessionTuiPane::LogPane,
                status: PaneState::with_placeholder("Initializing..."),
                signal: PaneState::with_placeholder("No active session"),
                history: PaneState::with_placeholder("No signals"),
                log: PaneState::default(),
            }),
        })
    }

    fn get_state(&self) -> MutexGuard<'_, SessionTuiViewState> {
        self.state
            .lock()
            .expect("`SessionTuiView` mutex can't be poisoned")
    }

    /// Adds an entry to the top of the log pane, and appends it to the log file if one is set.
    pub fn add_log_entry(&self, entry: String) -> Result<()> {
        let mut state_guard = self.get_state();

        if let Some(log_file) = state_guard.log_file.as_mut() {
            writeln!(log_file, "{entry}").map_err(TuiError::LogFileWrite)?;
            log_file.flush().map_err(TuiError::LogFileWrite)?;
        }

        let log = &mut state_guard.log;
        log.max_line_width = log.max_line_width.max(entry.chars().count());
        log.lines.insert(0, entry);
        log.lines.truncate(self.max_tui_log_len);

        // Keep the viewed entries in place while scrolled down
        if log.v_scroll > 0 {
            log.v_scroll = (log.v_scroll + 1).min(log.max_v_scroll());
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn log_entries(&self) -> Vec<String> {
        self.get_state().log.lines.clone()
    }

    #[cfg(test)]
    pub fn pane_lines(&self, pane: SessionTuiPane) -> Vec<String> {
        self.get_state().pane(pane).lines.clone()
    }

    fn update_snapshot(&self, snapshot: &SessionSnapshot) {
        let mut state_guard = self.get_state();

        state_guard.status.set_lines(status_lines(snapshot));
        state_guard.signal.set_lines(signal_lines(snapshot));
        state_guard.history.set_lines(history_lines(snapshot));
    }

    /// Applies a UI message. Returns `true` once shutdown has completed.
    pub fn handle_ui_message(&self, message: SessionUiMessage) -> Result<bool> {
        match message {
            SessionUiMessage::Snapshot(snapshot) => {
                self.update_snapshot(&snapshot);
                Ok(false)
            }
            SessionUiMessage::LogEntry(entry) => {
                self.add_log_entry(entry)?;
                Ok(false)
            }
            SessionUiMessage::ShutdownCompleted => Ok(true),
        }
    }

    pub fn scroll_up(&self) {
        let mut state_guard = self.get_state();
        let pane = state_guard.active_mut();
        pane.v_scroll = pane.v_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&self) {
        let mut state_guard = self.get_state();
        let pane = state_guard.active_mut();
        pane.v_scroll = (pane.v_scroll + 1).min(pane.max_v_scroll());
    }

    pub fn scroll_left(&self) {
        let mut state_guard = self.get_state();
        let pane = state_guard.active_mut();
        pane.h_scroll = pane.h_scroll.saturating_sub(1);
    }

    pub fn scroll_right(&self) {
        let mut state_guard = self.get_state();
        let pane = state_guard.active_mut();
        pane.h_scroll = (pane.h_scroll + 1).min(pane.max_h_scroll());
    }

    pub fn reset_scroll(&self) {
        let mut state_guard = self.get_state();
        let pane = state_guard.active_mut();
        pane.v_scroll = 0;
        pane.h_scroll = 0;
    }

    pub fn scroll_to_bottom(&self) {
        let mut state_guard = self.get_state();
        let pane = state_guard.active_mut();
        pane.v_scroll = pane.max_v_scroll();
    }

    pub fn switch_pane(&self) {
        let mut state_guard = self.get_state();
        state_guard.active_pane = state_guard.active_pane.next();
    }

    pub fn render(&self, f: &mut Frame) {
        let [body, footer] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .areas(f.area());

        let [top, bottom] = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(10), Constraint::Min(0)])
            .areas(body);

        let [status_rect, signal_rect] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .areas(top);

        let [history_rect, log_rect] = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(52), Constraint::Min(0)])
            .areas(bottom);

        let mut state_guard = self.get_state();

        state_guard.status.rect = status_rect;
        state_guard.signal.rect = signal_rect;
        state_guard.history.rect = history_rect;
        state_guard.log.rect = log_rect;

        for pane in SessionTuiPane::iter() {
            let pane_state = state_guard.pane(pane);
            let is_active = state_guard.active_pane == pane;

            let border_style = if is_active {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default()
            };

            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(pane.title());

            let lines = pane_state
                .lines
                .iter()
                .map(|line| Line::from(line.as_str()))
                .collect::<Vec<_>>();

            let paragraph = Paragraph::new(lines)
                .block(block)
                .scroll((pane_state.v_scroll as u16, pane_state.h_scroll as u16));

            f.render_widget(paragraph, pane_state.rect);
        }

        f.render_widget(
            Paragraph::new(HELP_TEXT).style(Style::default().add_modifier(Modifier::DIM)),
            footer,
        );
    }
}

fn status_lines(snapshot: &SessionSnapshot) -> Vec<String> {
    let mut lines = vec![format!("Session:  {}", snapshot.status())];

    if let Some(session_id) = snapshot.session_id() {
        lines.push(format!("ID:       {session_id}"));
    }

    let connected = if snapshot.stream_connected() {
        "connected"
    } else {
        "not connected"
    };
    lines.push(format!(
        "Stream:   {}, {connected}",
        snapshot.stream_phase()
    ));
    lines.push(format!("Signals:  {}", snapshot.total_signals()));
    lines.push(String::new());

    for channel in snapshot.channels() {
        let peer = channel.peer().unwrap_or("");
        lines.push(
            format!("{:<10} {:<12} {peer}", channel.id().as_str(), channel.state().to_string())
                .trim_end()
                .to_string(),
        );
    }

    lines
}

fn signal_lines(snapshot: &SessionSnapshot) -> Vec<String> {
    let Some(signal) = snapshot.current_signal() else {
        let text = match snapshot.status() {
            SessionStatus::Active => "Waiting for signals...",
            SessionStatus::Starting => "Starting session...",
            SessionStatus::Inactive => "No active session",
        };
        return vec![text.to_string()];
    };

    let direction = match signal.motor_imagery() {
        MotorImagery::Left => "<<<  LEFT",
        MotorImagery::Right => "RIGHT  >>>",
        MotorImagery::Other => "-",
    };

    vec![
        format!("Signal:     {}", signal.label()),
        format!("Direction:  {direction}"),
        format!("Timestamp:  {}", signal.timestamp()),
        format!(
            "Received:   {}",
            signal.received_at().format_local_millis()
        ),
    ]
}

fn history_lines(snapshot: &SessionSnapshot) -> Vec<String> {
    if snapshot.signal_history().is_empty() {
        return vec!["No signals".to_string()];
    }

    snapshot
        .signal_history()
        .iter()
        .rev()
        .map(|signal| {
            format!(
                "{}  {:<10} {}",
                signal.received_at().format_local_time_millis(),
                signal.label(),
                signal.timestamp()
            )
        })
        .collect()
}
