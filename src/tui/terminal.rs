use std::{
    io::{self, Stdout},
    sync::{Arc, Mutex, MutexGuard},
};

use ratatui::{
    Terminal,
    backend::{Backend, CrosstermBackend},
    crossterm::{
        event::{DisableMouseCapture, EnableMouseCapture},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
};

use super::{
    error::{Result, TuiError},
    view::SessionTuiView,
};

struct TerminalState<B: Backend> {
    terminal: Terminal<B>,
    // `false` for backends that never entered raw mode
    raw_mode: bool,
    restored: bool,
}

/// Terminal shared by the UI task and the TUI handle. Raw mode and the alternate screen are left
/// exactly once, on [`restore`](Self::restore) or on drop.
pub(super) struct TuiTerminal<B: Backend = CrosstermBackend<Stdout>>(Mutex<TerminalState<B>>);

impl TuiTerminal {
    pub fn new() -> Result<Arc<Self>> {
        enable_raw_mode().map_err(TuiError::TerminalSetup)?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .map_err(TuiError::TerminalSetup)?;
        let terminal =
            Terminal::new(CrosstermBackend::new(stdout)).map_err(TuiError::TerminalSetup)?;

        Ok(Arc::new(Self(Mutex::new(TerminalState {
            terminal,
            raw_mode: true,
            restored: false,
        }))))
    }
}

impl<B: Backend> TuiTerminal<B> {
    #[cfg(test)]
    pub fn with_backend(backend: B) -> Result<Arc<Self>> {
        let terminal = Terminal::new(backend).map_err(TuiError::TerminalSetup)?;

        Ok(Arc::new(Self(Mutex::new(TerminalState {
            terminal,
            raw_mode: false,
            restored: false,
        }))))
    }

    fn get_state(&self) -> MutexGuard<'_, TerminalState<B>> {
        self.0
            .lock()
            .expect("`TuiTerminal` mutex can't be poisoned")
    }

    pub fn draw(&self, tui_view: &SessionTuiView) -> Result<()> {
        let mut state = self.get_state();
        if state.restored {
            return Err(TuiError::DrawTerminalAlreadyRestored);
        }

        state
            .terminal
            .draw(|f| tui_view.render(f))
            .map_err(TuiError::DrawFailed)?;

        Ok(())
    }

    pub fn restore(&self) -> Result<()> {
        let mut state = self.get_state();
        if state.restored {
            return Ok(());
        }

        if state.raw_mode {
            disable_raw_mode().map_err(TuiError::TerminalRestore)?;
            execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)
                .map_err(TuiError::TerminalRestore)?;
        }

        state
            .terminal
            .show_cursor()
            .map_err(TuiError::TerminalRestore)?;

        state.restored = true;

        Ok(())
    }
}

#[cfg(test)]
impl TuiTerminal<ratatui::backend::TestBackend> {
    /// Returns the last drawn frame, one line per row.
    pub fn rendered(&self) -> String {
        let state = self.get_state();
        let buffer = state.terminal.backend().buffer();
        let area = buffer.area;

        (area.top()..area.bottom())
            .map(|y| {
                (area.left()..area.right())
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<B: Backend> Drop for TuiTerminal<B> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            eprintln!("Failed to restore `TuiTerminal` on Drop: {e:?}");
        }
    }
}
