use anyhow::Result;
use bingo_registry::{
    Board, PendingSubmission, RegistryBreakdown, Tile, TeamId,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Board,
    Pending,
    Signups,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Board => Page::Pending,
            Page::Pending => Page::Signups,
            Page::Signups => Page::Board,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Board => Page::Signups,
            Page::Pending => Page::Board,
            Page::Signups => Page::Pending,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Board => "Board",
            Page::Pending => "Pending Submissions",
            Page::Signups => "Signups",
        }
    }
}

pub struct TeamBoard {
    pub team: TeamId,
    pub display_name: String,
    pub board: Board,
}

pub struct App {
    pub boards: Vec<TeamBoard>,
    pub pending: Vec<PendingSubmission>,
    pub breakdown: RegistryBreakdown,
    pub team_index: usize,
    pub current_page: Page,
    pub state: TableState,
    pub show_detail: bool,
}

impl App {
    pub fn new(boards: Vec<TeamBoard>, pending: Vec<PendingSubmission>, breakdown: RegistryBreakdown) -> Self {
        let mut state = TableState::default();
        state.select(Some(0));

        Self {
            boards,
            pending,
            breakdown,
            team_index: 0,
            current_page: Page::Board,
            state,
            show_detail: false,
        }
    }

    pub fn current_board(&self) -> Option<&TeamBoard> {
        self.boards.get(self.team_index)
    }

    /// Tiles of the current team, in coordinate order
    pub fn tiles(&self) -> Vec<&Tile> {
        self.current_board()
            .map(|b| b.board.tiles.values().collect())
            .unwrap_or_default()
    }

    pub fn selected_tile(&self) -> Option<&Tile> {
        self.state.selected().and_then(|i| self.tiles().get(i).copied())
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_team(&mut self) {
        if !self.boards.is_empty() {
            self.team_index = (self.team_index + 1) % self.boards.len();
            self.state.select(Some(0));
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.state.select(Some(0));
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
        self.state.select(Some(0));
    }

    fn row_count(&self) -> usize {
        match self.current_page {
            Page::Board => self.tiles().len(),
            Page::Pending => self.pending.len(),
            Page::Signups => self.breakdown.teams.len(),
        }
    }

    pub fn next(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "board viewer failed");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('t') => app.next_team(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Home => app.state.select(Some(0)),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Board {
        let content = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_board(f, content[0], app);
        render_tile_detail(f, content[1], app);
    } else {
        match app.current_page {
            Page::Board => render_board(f, chunks[1], app),
            Page::Pending => render_pending(f, chunks[1], app),
            Page::Signups => render_signups(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![];
    for (i, page) in [Page::Board, Page::Pending, Page::Signups].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title().to_string(), style));
    }

    if let Some(current) = app.current_board() {
        let summary = current.board.summary();
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            format!("Team {}", current.display_name),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{} pts", summary.total_points),
            Style::default().fg(Color::Green),
        ));
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("{}% complete", summary.percent_complete()),
            Style::default().fg(Color::White),
        ));
    }

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));
    f.render_widget(header, area);
}

fn header_row(labels: &[&'static str]) -> Row<'static> {
    let cells = labels.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_board(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .tiles()
        .into_iter()
        .map(|tile| {
            let progress = tile.progress();
            let color = if tile.completed {
                Color::Green
            } else if tile.obtained_items.is_empty() {
                Color::White
            } else {
                Color::Yellow
            };
            let pending = tile.pending_submissions().count();

            Row::new(vec![
                Cell::from(tile.coordinate.clone()),
                Cell::from(tile.points.to_string()),
                Cell::from(truncate(&tile.describe(), 40)),
                Cell::from(progress.description).style(Style::default().fg(color)),
                Cell::from(if pending > 0 { pending.to_string() } else { String::new() }),
            ])
        })
        .collect();

    let title = app
        .current_board()
        .map(|b| format!(" {} board ", b.display_name))
        .unwrap_or_else(|| " No board installed ".to_string());

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(42),
            Constraint::Length(10),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["Tile", "Pts", "Requirement", "Progress", "Pending"]))
    .block(Block::default().borders(Borders::ALL).title(title))
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_tile_detail(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = vec![];

    match app.selected_tile() {
        Some(tile) => {
            let label = Style::default().fg(Color::Yellow);
            lines.push(Line::from(vec![
                Span::styled("Tile: ", label),
                Span::raw(format!("{} ({} pts)", tile.coordinate, tile.points)),
            ]));
            lines.push(Line::from(vec![
                Span::styled("Rule: ", label),
                Span::raw(format!("{} × {}", tile.requirement_type, tile.required_count)),
            ]));
            lines.push(Line::from(vec![
                Span::styled("Progress: ", label),
                Span::raw(tile.progress().description),
            ]));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Required items", label)));
            for item in &tile.required_items {
                let mark = if tile.has_obtained(item) { "✓" } else { "·" };
                lines.push(Line::from(format!(" {} {}", mark, item)));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Submissions", label)));
            for sub in &tile.submissions {
                let state = if sub.approved { "approved" } else { "pending" };
                lines.push(Line::from(format!(
                    " {} {} by {} ({:.0}%)",
                    state,
                    sub.item_name,
                    sub.submitter_rsn,
                    sub.similarity * 100.0
                )));
            }
        }
        None => lines.push(Line::from("No tile selected")),
    }

    let detail = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Tile "));
    f.render_widget(detail, area);
}

fn render_pending(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .pending
        .iter()
        .map(|p| {
            let similarity = p.submission.similarity;
            let color = if similarity >= 1.0 {
                Color::Green
            } else if similarity >= 0.9 {
                Color::White
            } else {
                Color::Yellow
            };

            Row::new(vec![
                Cell::from(p.team.to_string()),
                Cell::from(p.coordinate.clone()),
                Cell::from(truncate(&p.submission.item_name, 28)),
                Cell::from(truncate(&p.submission.original_input, 28)),
                Cell::from(format!("{:.0}%", similarity * 100.0)).style(Style::default().fg(color)),
                Cell::from(truncate(&p.submission.submitter_rsn, 16)),
                Cell::from(p.submission.id.clone()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Length(30),
            Constraint::Length(30),
            Constraint::Length(6),
            Constraint::Length(18),
            Constraint::Min(20),
        ],
    )
    .header(header_row(&["Team", "Tile", "Item", "Input", "Match", "By", "Id"]))
    .block(Block::default().borders(Borders::ALL).title(" Awaiting approval "))
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_signups(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .breakdown
        .teams
        .iter()
        .map(|t| {
            Row::new(vec![
                Cell::from(t.team.title()),
                Cell::from(t.approved.len().to_string()).style(Style::default().fg(Color::Green)),
                Cell::from(t.pending.len().to_string()).style(Style::default().fg(Color::Yellow)),
                Cell::from(t.unprocessed.len().to_string()),
                Cell::from(truncate(&t.pending.join(", "), 60)),
            ])
        })
        .collect();

    let title = format!(
        " Signups: {} approved, {} pending, {} unprocessed ",
        app.breakdown.total_approved, app.breakdown.total_pending, app.breakdown.total_unprocessed
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Min(20),
        ],
    )
    .header(header_row(&["Team", "Approved", "Pending", "Unprocessed", "Awaiting review"]))
    .block(Block::default().borders(Borders::ALL).title(title))
    .highlight_style(Style::default().bg(Color::DarkGray))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let key = Style::default().fg(Color::Yellow);
    let spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, app.row_count()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Enter", key),
        Span::raw(" Tile | "),
        Span::styled("Tab", key),
        Span::raw(" Page | "),
        Span::styled("t", key),
        Span::raw(" Team | "),
        Span::styled("↑/↓", key),
        Span::raw(" Nav | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::White)));
    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bingo_registry::RequirementType;

    fn app() -> App {
        let mut board = Board::default();
        for (coord, item) in [("a1", "Twisted bow"), ("a2", "Elder maul"), ("b1", "Dragon Bone")] {
            board.tiles.insert(
                coord.into(),
                Tile::new(coord, 5, RequirementType::Single, vec![item.into()], 1),
            );
        }
        let boards = vec![
            TeamBoard {
                team: TeamId::new("melon"),
                display_name: "Melon".into(),
                board: board.clone(),
            },
            TeamBoard {
                team: TeamId::new("weenor"),
                display_name: "Weenor".into(),
                board: Board::default(),
            },
        ];
        App::new(boards, Vec::new(), RegistryBreakdown::default())
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();
        app.previous();
        assert_eq!(app.selected_tile().unwrap().coordinate, "b1");
        app.next();
        assert_eq!(app.selected_tile().unwrap().coordinate, "a1");
    }

    #[test]
    fn test_team_switch_resets_selection() {
        let mut app = app();
        app.next();
        app.next_team();
        assert_eq!(app.current_board().unwrap().display_name, "Weenor");
        assert!(app.selected_tile().is_none());
        app.next();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_pages_cycle() {
        assert_eq!(Page::Board.next().next().next(), Page::Board);
        assert_eq!(Page::Board.previous(), Page::Signups);
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Ancestral robe top", 10), "Ancestr...");
        assert_eq!(truncate("ÅÅÅÅÅÅÅÅ", 5), "ÅÅ...");
    }
}
