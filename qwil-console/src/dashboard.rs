//! Terminal dashboard for the console host

use crate::commands::{Command, Console};
use crate::metrics::{LogLevel, Metrics};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use qwil_core::host::SurfaceMode;
use qwil_core::session::{BridgeTable, SessionState};
use qwil_core::widget::EventKind;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
    Frame, Terminal,
};
use std::io::stdout;
use std::time::Duration;

/// Dashboard state for scrolling etc.
struct DashboardState {
    /// Log scroll position (0 = most recent at bottom)
    log_scroll: usize,
    /// Whether auto-scroll is enabled (follows new logs)
    auto_scroll: bool,
    /// Log length at the previous tick
    seen_logs: usize,
}

/// Log lines moved by PgUp/PgDn
const PAGE: usize = 10;

impl DashboardState {
    /// Move towards older entries, pausing auto-scroll
    fn older(&mut self, lines: usize, log_count: usize) {
        if log_count == 0 {
            return;
        }
        self.log_scroll = (self.log_scroll + lines).min(log_count - 1);
        self.auto_scroll = false;
    }

    /// Move towards newer entries; reaching the newest resumes auto-scroll
    fn newer(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
        if self.log_scroll == 0 {
            self.auto_scroll = true;
        }
    }

    fn follow(&mut self) {
        self.log_scroll = 0;
        self.auto_scroll = true;
    }
}

/// Run the dashboard
pub async fn run(console: Console) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    console.execute(Command::Activate);

    let mut state = DashboardState {
        log_scroll: 0,
        auto_scroll: true,
        seen_logs: 0,
    };

    let tick_rate = Duration::from_millis(100);
    let mut should_quit = false;

    while !should_quit {
        console.refresh();

        let log_count = console.metrics.read().logs.len();
        if log_count != state.seen_logs {
            state.seen_logs = log_count;
            if state.auto_scroll {
                state.log_scroll = 0;
            }
        }

        terminal.draw(|f| draw(f, &console, &state))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => should_quit = true,
                        KeyCode::Char('c') if key.modifiers.contains(event::KeyModifiers::CONTROL) => {
                            should_quit = true
                        }
                        KeyCode::Up => state.older(1, log_count),
                        KeyCode::Down => state.newer(1),
                        KeyCode::PageUp => state.older(PAGE, log_count),
                        KeyCode::PageDown => state.newer(PAGE),
                        KeyCode::Home => state.older(log_count, log_count),
                        KeyCode::End => state.follow(),
                        KeyCode::Char('a') => {
                            if state.auto_scroll {
                                state.auto_scroll = false;
                            } else {
                                state.follow();
                            }
                        }
                        KeyCode::Char(c) => {
                            if let Some(command) = Command::from_key(c) {
                                console.execute(command);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    console.session.deactivate();

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

/// Draw the dashboard
fn draw(f: &mut Frame, console: &Console, state: &DashboardState) {
    let m = console.metrics.read();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Length(9),  // Stats
            Constraint::Min(10),    // Logs
            Constraint::Length(2),  // Footer
        ])
        .split(f.area());

    draw_header(f, chunks[0], &m);
    draw_stats(f, chunks[1], &m, console.session.bridges());
    draw_logs(f, chunks[2], &m, state);
    draw_footer(f, chunks[3], state);
}

fn draw_header(f: &mut Frame, area: Rect, m: &Metrics) {
    let (status_text, status_style) = match &m.state {
        SessionState::Idle => ("IDLE".to_string(), Style::default().fg(Color::DarkGray)),
        SessionState::Loading => ("LOADING".to_string(), Style::default().fg(Color::Yellow)),
        SessionState::Active => ("ACTIVE".to_string(), Style::default().fg(Color::Green)),
        SessionState::Error(message) => (
            format!("ERROR: {}", message),
            Style::default().fg(Color::Red),
        ),
    };

    let title = vec![Line::from(vec![
        Span::styled("Qwil Console", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  │  Session: "),
        Span::styled(status_text, status_style),
        Span::raw("  │  Uptime: "),
        Span::styled(m.uptime(), Style::default().fg(Color::Cyan)),
    ])];

    let header = Paragraph::new(title)
        .block(Block::default().borders(Borders::ALL).title(" Dashboard "));

    f.render_widget(header, area);
}

fn draw_stats(f: &mut Frame, area: Rect, m: &Metrics, bridges: &BridgeTable) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(area);

    // Session
    let endpoint = m.endpoint.clone().unwrap_or_else(|| "-".to_string());
    let surface = match m.surface_mode {
        SurfaceMode::FullPage => "full page",
        SurfaceMode::Inline => "inline",
    };

    let session_info = vec![
        Line::from(vec![
            Span::raw("Auth: "),
            Span::styled(&m.auth_url, Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::raw("Endpoint: "),
            Span::styled(endpoint, Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![
            Span::raw("Form factor: "),
            Span::styled(&m.form_factor, Style::default().fg(Color::White)),
            Span::raw("  Surface: "),
            Span::styled(surface, Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::raw("Constructions: "),
            Span::styled(m.constructions.to_string(), Style::default().fg(Color::Magenta)),
        ]),
    ];

    let session_block = Paragraph::new(session_info)
        .block(Block::default().borders(Borders::ALL).title(" Session "));
    f.render_widget(session_block, chunks[0]);

    // Bridges
    let bridge_info: Vec<Line> = EventKind::ALL
        .iter()
        .map(|kind| match bridges.bridge_for(*kind) {
            Some(bridge) => Line::from(vec![
                Span::styled(format!("{:<17}", kind.as_str()), Style::default().fg(Color::Green)),
                Span::raw(format!("{:?}", bridge)),
            ]),
            None => Line::from(Span::styled(
                format!("{:<17}off", kind.as_str()),
                Style::default().fg(Color::DarkGray),
            )),
        })
        .collect();

    let bridge_block = Paragraph::new(bridge_info)
        .block(Block::default().borders(Borders::ALL).title(" Bridges "));
    f.render_widget(bridge_block, chunks[1]);

    // Reauthentication and host activity
    let failures_style = if m.reauth.consecutive_failures > 0 {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Green)
    };

    let mut reauth_info = vec![
        Line::from(vec![
            Span::raw("Reauth: "),
            Span::styled(
                format!("{} / {}", m.reauth.successes, m.reauth.attempts),
                Style::default().fg(Color::Yellow),
            ),
            Span::raw("  Coalesced: "),
            Span::styled(m.reauth.coalesced.to_string(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::raw("Failing: "),
            Span::styled(m.reauth.consecutive_failures.to_string(), failures_style),
        ]),
        Line::from(vec![
            Span::raw("Toasts: "),
            Span::styled(m.toasts.to_string(), Style::default().fg(Color::Magenta)),
            Span::raw("  Anchors: "),
            Span::styled(
                format!("{} ({} attached)", m.anchors_clicked, m.attached_elements),
                Style::default().fg(Color::Cyan),
            ),
        ]),
    ];
    if let Some(error) = &m.reauth.last_error {
        reauth_info.push(Line::from(vec![
            Span::raw("Last error: "),
            Span::styled(error, Style::default().fg(Color::Red)),
        ]));
    }

    let reauth_block = Paragraph::new(reauth_info)
        .block(Block::default().borders(Borders::ALL).title(" Reauth "));
    f.render_widget(reauth_block, chunks[2]);
}

fn draw_logs(f: &mut Frame, area: Rect, m: &Metrics, state: &DashboardState) {
    let visible_height = area.height.saturating_sub(2) as usize;
    let total_logs = m.logs.len();

    let log_items: Vec<ListItem> = m.logs
        .iter()
        .rev()
        .skip(state.log_scroll)
        .take(visible_height)
        .map(|entry| {
            let level_style = match entry.level {
                LogLevel::Info => Style::default().fg(Color::Blue),
                LogLevel::Warning => Style::default().fg(Color::Yellow),
                LogLevel::Error => Style::default().fg(Color::Red),
                LogLevel::Session => Style::default().fg(Color::Green),
                LogLevel::Bridge => Style::default().fg(Color::Magenta),
            };

            let time = entry.timestamp.format("%H:%M:%S").to_string();

            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", time), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("[{}] ", entry.level.as_str()), level_style),
                Span::raw(&entry.message),
            ]))
        })
        .collect();

    // Title with scroll indicator
    let scroll_indicator = if state.auto_scroll {
        " [AUTO] ".to_string()
    } else if total_logs > 0 {
        format!(" [{}/{}] ", total_logs - state.log_scroll, total_logs)
    } else {
        String::new()
    };

    let logs = List::new(log_items)
        .block(Block::default().borders(Borders::ALL).title(format!(" Activity Log{}", scroll_indicator)));

    f.render_widget(logs, area);

    if total_logs > visible_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));

        let mut scrollbar_state = ScrollbarState::new(total_logs)
            .position(total_logs.saturating_sub(state.log_scroll + visible_height));

        f.render_stateful_widget(
            scrollbar,
            area.inner(ratatui::layout::Margin { vertical: 1, horizontal: 0 }),
            &mut scrollbar_state,
        );
    }
}

fn key(label: &str) -> Span<'_> {
    Span::styled(format!(" {} ", label), Style::default().fg(Color::Black).bg(Color::White))
}

fn draw_footer(f: &mut Frame, area: Rect, state: &DashboardState) {
    let auto_text = if state.auto_scroll { "ON " } else { "OFF" };
    let auto_color = if state.auto_scroll { Color::Green } else { Color::Yellow };

    let session_keys = Line::from(vec![
        key("S"),
        Span::raw(" Activate  "),
        key("D"),
        Span::raw(" Deactivate  "),
        key("K"),
        Span::raw(" Kill widget  │ Emit: "),
        key("E"),
        Span::raw(" expired "),
        key("C"),
        Span::raw(" contact "),
        key("X"),
        Span::raw(" error "),
        key("F"),
        Span::raw(" download "),
        key("M"),
        Span::raw(" meeting "),
        key("B"),
        Span::raw(" back"),
    ]);

    let view_keys = Line::from(vec![
        key("Q"),
        Span::raw(" Quit  "),
        key("↑↓"),
        Span::raw(" Scroll  "),
        key("PgUp/Dn"),
        Span::raw(" Page  "),
        key("A"),
        Span::raw(" Auto-scroll: "),
        Span::styled(auto_text, Style::default().fg(auto_color)),
    ]);

    f.render_widget(Paragraph::new(vec![session_keys, view_keys]), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> DashboardState {
        DashboardState {
            log_scroll: 0,
            auto_scroll: true,
            seen_logs: 0,
        }
    }

    #[test]
    fn test_scrolling_pauses_and_resumes_follow() {
        let mut s = state();
        s.older(PAGE, 25);
        assert_eq!(s.log_scroll, 10);
        assert!(!s.auto_scroll);

        s.older(100, 25);
        assert_eq!(s.log_scroll, 24);

        s.newer(20);
        assert_eq!(s.log_scroll, 4);
        assert!(!s.auto_scroll);
        s.newer(PAGE);
        assert_eq!(s.log_scroll, 0);
        assert!(s.auto_scroll);
    }

    #[test]
    fn test_empty_log_does_not_scroll() {
        let mut s = state();
        s.older(1, 0);
        assert_eq!(s.log_scroll, 0);
        assert!(s.auto_scroll);
    }
}
