//! Watch command implementation - Interactive TUI with keyboard control.

use super::output::{input_label, is_notable};
use super::{resolve_seed, CliError, SessionArgs};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ledagogo::game::{Cell, Direction as Heading, GameEvent, PlayerId, PowerUpState, MAX_PLAYERS};
use ledagogo::session::SerialOpener;
use ledagogo::{Session, SimulationClock};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use std::collections::VecDeque;
use std::io::stdout;
use std::time::Duration;
use tracing::info;

/// Events kept in the log panel.
const LOG_LINES: usize = 12;

/// Execute the watch command.
///
/// # Errors
///
/// Returns an error if the config is invalid or the TUI fails.
pub(crate) fn execute(args: &SessionArgs, player: u8) -> Result<(), CliError> {
    if player == 0 || usize::from(player) > MAX_PLAYERS {
        return Err(CliError::new(format!("player must be between 1 and {MAX_PLAYERS}")));
    }
    let config = args.load_config()?;
    let seed = resolve_seed(&config);
    info!(seed, player, "starting watch session");

    let mut session = Session::from_config(&config, seed);
    session.state_mut().set_keyboard(player);
    session.start_connector(SerialOpener::new(&config.sensor), &config.sensor)?;
    let clock = SimulationClock::start(config.timing.tick_interval());

    let result = run_tui(App::new(session, clock, player, seed));
    if let Ok(app) = &result {
        info!(winner = ?app.session.state().winner(), "watch session closed");
    }
    result.map(|app| drop(app.session.shutdown()))
}

/// App state for the TUI.
struct App {
    session: Session,
    clock: SimulationClock,
    player: PlayerId,
    seed: u64,
    log: VecDeque<String>,
    quit: bool,
}

impl App {
    fn new(session: Session, clock: SimulationClock, player: PlayerId, seed: u64) -> Self {
        Self {
            session,
            clock,
            player,
            seed,
            log: VecDeque::with_capacity(LOG_LINES),
            quit: false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Release && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
            self.quit = true;
            return;
        }
        let player = self.player;
        let state = self.session.state_mut();
        let Some(keyboard) = state.keyboard_mut(player) else {
            return;
        };
        let heading = match key.code {
            KeyCode::Up | KeyCode::Char('w') => Some(Heading::Up),
            KeyCode::Right | KeyCode::Char('d') => Some(Heading::Right),
            KeyCode::Down | KeyCode::Char('s') => Some(Heading::Down),
            KeyCode::Left | KeyCode::Char('a') => Some(Heading::Left),
            _ => None,
        };

        // Most terminals never report releases, so a press keeps the token
        // moving until another key or the stop key.
        match (key.kind, heading, key.code) {
            (KeyEventKind::Release, Some(_), _) => keyboard.release(),
            (KeyEventKind::Release, None, _) => {}
            (_, Some(heading), _) => keyboard.press(heading),
            (_, None, KeyCode::Char(' ' | 'x')) => keyboard.release(),
            (_, None, KeyCode::Enter | KeyCode::Char('b')) => keyboard.request_boost(),
            _ => {}
        }
    }

    fn tick(&mut self) {
        let elapsed = self.clock.wait_tick();
        let events = self.session.advance(elapsed);
        self.record(elapsed, &events);
    }

    fn record(&mut self, elapsed: u32, events: &[GameEvent]) {
        for event in events.iter().filter(|e| is_notable(e)) {
            if self.log.len() == LOG_LINES {
                self.log.pop_front();
            }
            self.log.push_back(format!("{elapsed:>3}s {event}"));
        }
    }
}

fn run_tui(mut app: App) -> Result<App, CliError> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(|e| CliError::new(e.to_string()))?;

    let outcome = event_loop(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    outcome.map(|()| app)
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    app: &mut App,
) -> Result<(), CliError> {
    while !app.quit {
        terminal.draw(|f| ui(f, app)).map_err(|e| CliError::new(e.to_string()))?;

        // Drain pending keys without blocking the tick; once the session is
        // over, just wait for the quit key.
        let wait = if app.session.state().is_over() {
            Duration::from_millis(50)
        } else {
            Duration::ZERO
        };
        while event::poll(wait).map_err(|e| CliError::new(e.to_string()))? {
            if let Event::Key(key) = event::read().map_err(|e| CliError::new(e.to_string()))? {
                app.handle_key(key);
            }
            if app.quit || wait > Duration::ZERO {
                break;
            }
        }

        if !app.session.state().is_over() {
            app.tick();
        }
    }

    if !app.session.state().is_over()
        && let Some(event) = app.session.stop()
    {
        let elapsed = app.session.state().elapsed();
        app.record(elapsed, &[event]);
    }
    Ok(())
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Main content
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    render_header(f, chunks[0], app);

    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(chunks[1]);
    let side_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(main_chunks[1]);

    render_board(f, main_chunks[0], app);
    render_players(f, side_chunks[0], app);
    render_log(f, side_chunks[1], app);
    render_footer(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let state = app.session.state();
    let status = match state.end_reason() {
        Some(reason) => format!("OVER ({reason})"),
        None => "RUNNING".to_string(),
    };

    let title = format!(
        " LED-A-Gogo | {}s left | {} | You: P{} | Seed: {} ",
        state.remaining_secs(),
        status,
        app.player,
        app.seed
    );

    let header = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(header, area);
}

fn render_board(f: &mut Frame, area: Rect, app: &App) {
    let state = app.session.state();
    let board = state.board();

    let tokens: Vec<(Cell, PlayerId)> = state
        .players()
        .iter()
        .filter_map(|p| board.tile_under(&p.hitbox()).map(|cell| (cell, p.id)))
        .collect();

    // Two terminal columns per cell keeps the grid roughly square.
    let visible_cols = (area.width.saturating_sub(2) / 2).min(board.cols());
    let visible_rows = area.height.saturating_sub(2).min(board.rows());

    let mut lines: Vec<Line> = Vec::with_capacity(usize::from(visible_rows));
    for y in 0..visible_rows {
        let mut spans = Vec::with_capacity(usize::from(visible_cols));
        for x in 0..visible_cols {
            let cell = Cell::new(x, y);
            let owner = state.owner_of(cell);
            let token = tokens.iter().find(|(c, _)| *c == cell).map(|(_, id)| *id);
            let pickup = state.pool().iter().any(|p| p.cell == cell);

            let (text, style) = if board.is_border(cell) {
                ("██".to_string(), Style::default().fg(Color::DarkGray))
            } else if !board.is_playable(cell) {
                ("  ".to_string(), Style::default())
            } else if let Some(id) = token {
                (
                    format!("P{id}"),
                    Style::default()
                        .fg(Color::Black)
                        .bg(player_color(id))
                        .add_modifier(Modifier::BOLD),
                )
            } else if pickup {
                ("<>".to_string(), Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
            } else if let Some(id) = owner {
                ("▓▓".to_string(), Style::default().fg(player_color(id)))
            } else {
                ("· ".to_string(), Style::default().fg(Color::DarkGray))
            };
            spans.push(Span::styled(text, style));
        }
        lines.push(Line::from(spans));
    }

    let board_widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Board "));

    f.render_widget(board_widget, area);
}

fn render_players(f: &mut Frame, area: Rect, app: &App) {
    let state = app.session.state();
    let now = state.elapsed();
    let power = state.power_up_config();
    let mut lines = Vec::new();

    for player in state.players() {
        let color = player_color(player.id);
        let leds: String = (0..8u8)
            .map(|i| if i < player.active_leds { '●' } else { '○' })
            .collect();
        let remaining = player
            .power_remaining(now, power.held_validity_secs, power.boost_duration_secs)
            .unwrap_or(0);
        let power_text = match player.power {
            PowerUpState::Idle => String::new(),
            PowerUpState::Held { .. } => format!("  held {remaining}s"),
            PowerUpState::Active { .. } => format!("  BOOST {remaining}s"),
        };

        lines.push(Line::from(vec![
            Span::styled(
                format!("Player {} ", player.id),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("({})", input_label(&player.input))),
        ]));
        lines.push(Line::from(vec![
            Span::raw(format!("  {:>3} pts ", player.score)),
            Span::styled(leds, Style::default().fg(color)),
            Span::styled(power_text, Style::default().fg(Color::Magenta)),
        ]));
    }

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Players "))
        .wrap(Wrap { trim: false });

    f.render_widget(widget, area);
}

fn render_log(f: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = app.log.iter().map(|l| Line::from(l.as_str())).collect();
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Events "))
        .wrap(Wrap { trim: true });

    f.render_widget(widget, area);
}

fn player_color(id: PlayerId) -> Color {
    match id {
        1 => Color::Red,
        2 => Color::Blue,
        3 => Color::Green,
        4 => Color::Yellow,
        _ => Color::White,
    }
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let controls = if app.session.state().is_over() {
        " [q] Quit "
    } else {
        " [q] Quit  [←↑→↓/wasd] Steer  [Space] Stop  [Enter/b] Boost "
    };

    let footer = Paragraph::new(controls)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(footer, area);
}
