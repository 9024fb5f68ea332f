use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event as TerminalEvent, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use jlens_client::rest::HttpPanelService;
use jlens_client::service::PanelService;
use jlens_core::Config;
use jlens_tui::app::{AfterCommand, App, AppCommand, BootOutcome, KeyInput};

const IDLE_TIMEOUT: Duration = Duration::from_millis(250);

fn main() {
    if let Err(err) = run() {
        eprintln!("jlens: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        return Err("jlens needs an interactive terminal".to_string());
    }

    let config = Config::load().map_err(|err| format!("load configuration: {err}"))?;
    let transport = jlens_client::http::Transport::new(
        &config.server.base_url,
        config.session_cookie(),
        config.request_timeout(),
    )
    .map_err(|err| format!("build http transport: {err}"))?;
    let service = HttpPanelService::new(transport);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("start async runtime: {err}"))?;

    let mut app = App::new(config.announce_delay(), config.tui.status_lines);
    match runtime.block_on(app.boot(&service)) {
        BootOutcome::Ready => {}
        BootOutcome::LoginRequired => {
            println!(
                "Not logged in. Open {}/login in a browser, then run jlens again.",
                config.server.base_url.trim_end_matches('/')
            );
            return Ok(());
        }
        BootOutcome::Halted(err) => return Err(format!("initialization failed: {err}")),
    }

    let login_required = event_loop(&runtime, &mut app, &service)?;
    if login_required {
        println!(
            "Session expired. Open {}/login in a browser, then run jlens again.",
            config.server.base_url.trim_end_matches('/')
        );
    }
    Ok(())
}

/// Runs the interactive loop until quit, interrupt, or an expired session.
/// Returns true when the session expired and the user must log in again.
fn event_loop(
    runtime: &tokio::runtime::Runtime,
    app: &mut App,
    service: &dyn PanelService,
) -> Result<bool, String> {
    let mut session =
        TerminalSession::enter().map_err(|err| format!("enter terminal mode: {err}"))?;
    let mut renderer = IncrementalRenderEngine::default();
    let mut dirty = true;

    loop {
        if dirty {
            let lines = app.render();
            renderer
                .repaint(&mut session.stdout, &lines)
                .map_err(|err| format!("repaint: {err}"))?;
            let _ = app.finish_render();
            dirty = false;
        }

        let now = Instant::now();
        let timeout = app
            .next_announce_due()
            .map(|due| due.saturating_duration_since(now))
            .unwrap_or(IDLE_TIMEOUT);

        let has_event = event::poll(timeout).map_err(|err| format!("poll event: {err}"))?;
        if !has_event {
            dirty |= app.tick(Instant::now());
            continue;
        }

        let terminal_event = event::read().map_err(|err| format!("read event: {err}"))?;
        if is_interrupt(&terminal_event) {
            return Ok(false);
        }
        let Some(key) = map_terminal_event(terminal_event) else {
            continue;
        };

        let command = app.update(key);
        dirty = true;
        if command == AppCommand::Quit {
            return Ok(false);
        }
        if command == AppCommand::None {
            continue;
        }

        // Progress lines stream below the last frame while a command runs;
        // the next full repaint reconciles the screen.
        let progress_row = renderer.line_count() + 1;
        let mut progress_out = io::stdout();
        let mut row = progress_row;
        let mut on_progress = move |line: &str| {
            let _ = write!(progress_out, "\x1b[{row};1H\x1b[2K{line}");
            let _ = progress_out.flush();
            row += 1;
        };

        let after = runtime.block_on(app.run_command(command, service, &mut on_progress));
        renderer.invalidate();
        if after == AfterCommand::LoginRequired {
            return Ok(true);
        }
    }
}

fn is_interrupt(event: &TerminalEvent) -> bool {
    matches!(
        event,
        TerminalEvent::Key(key)
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
    )
}

fn map_terminal_event(event: TerminalEvent) -> Option<KeyInput> {
    let TerminalEvent::Key(key) = event else {
        return None;
    };
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char(ch) => Some(KeyInput::Char(ch)),
        KeyCode::Enter => Some(KeyInput::Enter),
        KeyCode::Esc => Some(KeyInput::Esc),
        KeyCode::Backspace => Some(KeyInput::Backspace),
        KeyCode::Left => Some(KeyInput::Left),
        KeyCode::Right => Some(KeyInput::Right),
        _ => None,
    }
}

struct TerminalSession {
    stdout: io::Stdout,
}

impl TerminalSession {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            Hide,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        Ok(Self { stdout })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = execute!(self.stdout, LeaveAlternateScreen, Show, MoveTo(0, 0));
        let _ = terminal::disable_raw_mode();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RenderDiffPlan {
    changed_rows: Vec<usize>,
    clear_start_row: Option<usize>,
    clear_end_row: usize,
}

impl RenderDiffPlan {
    fn is_noop(&self) -> bool {
        self.changed_rows.is_empty() && self.clear_start_row.is_none()
    }
}

fn plan_render_diff(previous: &[String], next: &[String]) -> RenderDiffPlan {
    let shared = previous.len().min(next.len());
    let mut changed_rows = Vec::new();

    for idx in 0..shared {
        if previous[idx] != next[idx] {
            changed_rows.push(idx + 1);
        }
    }
    if next.len() > shared {
        changed_rows.extend((shared + 1)..=next.len());
    }

    let clear_start_row = (next.len() < previous.len()).then_some(next.len() + 1);

    RenderDiffPlan {
        changed_rows,
        clear_start_row,
        clear_end_row: previous.len(),
    }
}

/// Repaints only rows that changed since the previous frame.
#[derive(Debug, Default)]
struct IncrementalRenderEngine {
    previous_lines: Vec<String>,
}

impl IncrementalRenderEngine {
    fn repaint<W: Write>(&mut self, mut out: W, next_lines: &[String]) -> io::Result<()> {
        let plan = plan_render_diff(&self.previous_lines, next_lines);
        if plan.is_noop() {
            return Ok(());
        }

        for row in plan.changed_rows {
            let line = next_lines.get(row - 1).map_or("", String::as_str);
            write!(out, "\x1b[{row};1H\x1b[2K{line}")?;
        }

        if let Some(start_row) = plan.clear_start_row {
            for row in start_row..=plan.clear_end_row {
                write!(out, "\x1b[{row};1H\x1b[2K")?;
            }
        }

        write!(out, "\x1b[{};1H", next_lines.len().saturating_add(1))?;
        out.flush()?;
        self.previous_lines = next_lines.to_vec();
        Ok(())
    }

    fn line_count(&self) -> usize {
        self.previous_lines.len()
    }

    /// Forces a full repaint on the next frame, after out-of-band writes.
    fn invalidate(&mut self) {
        self.previous_lines.clear();
    }
}
