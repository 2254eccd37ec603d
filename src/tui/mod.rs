use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::io;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::config::{ColorConfig, Config};
use crate::highlight::Highlighter;
use crate::parser::{self, DiffLine, LineNumberMode};
use crate::stats::{self, StatsByFile};
use crate::tree::{self, TreeItem};
use crate::vcs::{self, Vcs};
use crate::FileStat;

const TREE_WIDTH_PERCENT: u16 = 20;
const TREE_MIN_WIDTH: u16 = 20;
const HELP_HEIGHT: u16 = 4;
const GUIDE: &str = "? Help ";
const STATUS_TTL: Duration = Duration::from_secs(3);

const DEFAULT_BORDER: Color = Color::Rgb(0xd9, 0xdc, 0xcf);
const DEFAULT_FOCUS: Color = Color::Rgb(0x6e, 0x77, 0x81);
const DEFAULT_LINE_NUMBER: Color = Color::Rgb(0x80, 0x80, 0x80);
const DEFAULT_SELECTION_BG: Color = Color::Rgb(0x2c, 0x32, 0x3c);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Tree,
    Diff,
}

/// Colours resolved from the `[colors]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Palette {
    border: Color,
    focus: Color,
    line_number: Color,
    selection_bg: Color,
}

impl Palette {
    fn from_config(colors: &ColorConfig) -> Self {
        Self {
            border: color_or(&colors.border, DEFAULT_BORDER),
            focus: color_or(&colors.focus, DEFAULT_FOCUS),
            line_number: color_or(&colors.line_number, DEFAULT_LINE_NUMBER),
            selection_bg: color_or(&colors.diff_selection_bg, DEFAULT_SELECTION_BG),
        }
    }
}

fn color_or(value: &str, fallback: Color) -> Color {
    let value = value.trim();
    if value.is_empty() {
        return fallback;
    }
    value.parse().unwrap_or_else(|_| {
        warn!("unrecognised colour {value:?}, using default");
        fallback
    })
}

/// File and line the user asked to edit; handled by the event loop, which
/// owns the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EditorRequest {
    path: String,
    line: usize,
}

pub struct App {
    vcs: Box<dyn Vcs>,
    target: String,
    /// Diff read from stdin; replaces live fetches when present.
    piped_diff: Option<String>,
    line_numbers: LineNumberMode,
    show_guide: bool,
    palette: Palette,
    highlighter: Highlighter,
    repo_name: String,
    branch: String,
    items: Vec<TreeItem>,
    stats: StatsByFile,
    tree_state: ListState,
    selected_path: Option<String>,
    diff_content: String,
    diff_lines: Vec<DiffLine>,
    diff_cursor: usize,
    diff_offset: usize,
    /// Rows available to diff text, measured at the last draw.
    diff_height: usize,
    count: String,
    focus: Focus,
    show_help: bool,
    should_quit: bool,
    editor_request: Option<EditorRequest>,
    status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(vcs: Box<dyn Vcs>, config: Config, target: String, piped_diff: Option<String>) -> Self {
        let mut status_message = None;
        let changes = match vcs::collect_changes(vcs.as_ref(), &target, piped_diff.as_deref()) {
            Ok(changes) => changes,
            Err(e) => {
                warn!("cannot list changes against {target}: {e}");
                status_message = Some((format!("Error: {e}"), Instant::now()));
                vcs::ChangeSet::default()
            }
        };

        let (repo_name, branch) = if piped_diff.is_some() {
            ("stdin".to_string(), "-".to_string())
        } else {
            (vcs.repo_name(), vcs.current_branch())
        };

        let items = tree::build(&changes.files);
        let mut tree_state = ListState::default();
        tree_state.select(
            items
                .iter()
                .position(|item| !item.is_dir)
                .or((!items.is_empty()).then_some(0)),
        );

        let mut app = Self {
            vcs,
            target,
            piped_diff,
            line_numbers: config.ui.line_numbers,
            show_guide: config.ui.show_guide,
            palette: Palette::from_config(&config.colors),
            highlighter: Highlighter::new(),
            repo_name,
            branch,
            items,
            stats: changes.stats,
            tree_state,
            selected_path: None,
            diff_content: String::new(),
            diff_lines: Vec::new(),
            diff_cursor: 0,
            diff_offset: 0,
            diff_height: 0,
            count: String::new(),
            focus: Focus::Tree,
            show_help: false,
            should_quit: false,
            editor_request: None,
            status_message,
        };
        app.sync_selection();
        app
    }

    fn selected_item(&self) -> Option<&TreeItem> {
        self.tree_state.selected().and_then(|i| self.items.get(i))
    }

    /// Load the diff of the file under the tree cursor if it changed.
    /// Directories keep the previous diff on screen.
    fn sync_selection(&mut self) {
        let Some(file) = self.selected_item().map(TreeItem::as_changed_file) else {
            return;
        };
        if file.is_dir || self.selected_path.as_deref() == Some(file.path.as_str()) {
            return;
        }

        self.selected_path = Some(file.path);
        self.diff_cursor = 0;
        self.diff_offset = 0;
        self.reload_diff();
    }

    fn reload_diff(&mut self) {
        let Some(path) = &self.selected_path else {
            return;
        };
        let content = match &self.piped_diff {
            Some(blob) => self.vcs.extract_file_diff(blob, path),
            None => self.vcs.diff_text(&self.target, path),
        };

        self.diff_lines = parser::parse_lines(&content);
        self.diff_content = content;
        self.diff_cursor = self.diff_cursor.min(self.diff_lines.len().saturating_sub(1));
        self.scroll_to_cursor();
    }

    /// Count typed before a motion, at least 1.
    fn take_count(&mut self) -> usize {
        let count = self.count.parse::<usize>().unwrap_or(1).max(1);
        self.count.clear();
        count
    }

    fn move_down(&mut self, count: usize) {
        match self.focus {
            Focus::Tree => {
                if self.items.is_empty() {
                    return;
                }
                let current = self.tree_state.selected().unwrap_or(0);
                let next = current.saturating_add(count).min(self.items.len() - 1);
                self.tree_state.select(Some(next));
                self.sync_selection();
            }
            Focus::Diff => {
                let last = self.diff_lines.len().saturating_sub(1);
                self.diff_cursor = self.diff_cursor.saturating_add(count).min(last);
                self.scroll_to_cursor();
            }
        }
    }

    fn move_up(&mut self, count: usize) {
        match self.focus {
            Focus::Tree => {
                if self.items.is_empty() {
                    return;
                }
                let current = self.tree_state.selected().unwrap_or(0);
                self.tree_state.select(Some(current.saturating_sub(count)));
                self.sync_selection();
            }
            Focus::Diff => {
                self.diff_cursor = self.diff_cursor.saturating_sub(count);
                self.scroll_to_cursor();
            }
        }
    }

    fn scroll_to_cursor(&mut self) {
        if self.diff_height == 0 {
            return;
        }
        if self.diff_cursor < self.diff_offset {
            self.diff_offset = self.diff_cursor;
        } else if self.diff_cursor >= self.diff_offset + self.diff_height {
            self.diff_offset = self.diff_cursor + 1 - self.diff_height;
        }
    }

    /// Ask the event loop to open the selected file at the real line under
    /// the diff cursor, or at the first hunk from the tree.
    fn request_editor(&mut self) {
        let Some(path) = self.selected_path.clone() else {
            return;
        };
        let index = match self.focus {
            Focus::Diff => self.diff_cursor,
            Focus::Tree => 0,
        };
        let line = self.vcs.calculate_file_line(&self.diff_content, index);
        self.editor_request = Some(EditorRequest { path, line });
    }

    /// Run the editor for a pending request. The terminal must already be
    /// restored; the diff is refetched afterwards.
    fn open_editor(&mut self, request: EditorRequest) {
        if let Err(e) = self
            .vcs
            .open_editor(&request.path, request.line, &self.target)
        {
            warn!("editor failed for {}: {e}", request.path);
            self.status_message = Some((format!("Editor: {e}"), Instant::now()));
        }
        self.reload_diff();
    }

    fn handle_input(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => self.should_quit = true,
                KeyCode::Char('l') => self.focus = Focus::Diff,
                KeyCode::Char('h') => self.focus = Focus::Tree,
                _ => {}
            }
            self.count.clear();
            return;
        }

        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                self.count.push(c);
                return;
            }
            KeyCode::Char('?') => {
                self.show_help = !self.show_help;
                return;
            }
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Tree => Focus::Diff,
                    Focus::Diff => Focus::Tree,
                };
            }
            KeyCode::Char('l') | KeyCode::Char(']') | KeyCode::Right => self.focus = Focus::Diff,
            KeyCode::Char('h') | KeyCode::Char('[') | KeyCode::Left => self.focus = Focus::Tree,
            KeyCode::Char('e') | KeyCode::Enter => self.request_editor(),
            KeyCode::Char('j') | KeyCode::Down => {
                let count = self.take_count();
                self.move_down(count);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                let count = self.take_count();
                self.move_up(count);
            }
            _ => {}
        }
        self.count.clear();
    }

    fn render(&mut self, frame: &mut Frame) {
        let expired = self
            .status_message
            .as_ref()
            .map(|(_, time)| time.elapsed() >= STATUS_TTL)
            .unwrap_or(false);
        if expired {
            self.status_message = None;
        }

        let help_height = if self.show_help { HELP_HEIGHT } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(help_height),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let main = chunks[0];
        let tree_width = (main.width * TREE_WIDTH_PERCENT / 100)
            .max(TREE_MIN_WIDTH)
            .min(main.width);
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(tree_width), Constraint::Min(0)])
            .split(main);

        self.render_tree(frame, panes[0]);
        self.render_diff(frame, panes[1]);
        if self.show_help {
            self.render_help(frame, chunks[1]);
        }
        self.render_status_bar(frame, chunks[2]);
    }

    fn pane_block(&self, title: String, focused: bool) -> Block<'static> {
        let color = if focused {
            self.palette.focus
        } else {
            self.palette.border
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(title)
    }

    fn stat_for(&self, item: &TreeItem) -> FileStat {
        if item.is_dir {
            stats::aggregate_under(&self.stats, &item.full_path)
        } else {
            self.stats.get(&item.full_path).copied().unwrap_or_default()
        }
    }

    fn render_tree(&mut self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .items
            .iter()
            .map(|item| {
                let stat = self.stat_for(item);
                let name_style = if item.is_dir {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                let mut spans = vec![Span::styled(item.title(), name_style)];
                if !stat.is_empty() {
                    spans.push(Span::styled(
                        format!(" +{}", stat.added),
                        Style::default().fg(Color::Green),
                    ));
                    spans.push(Span::styled(
                        format!(" -{}", stat.deleted),
                        Style::default().fg(Color::Red),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let focused = self.focus == Focus::Tree;
        let highlight = if focused {
            Style::default()
                .bg(self.palette.selection_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };

        let title = if self.items.is_empty() {
            " No changes ".to_string()
        } else {
            " Files ".to_string()
        };
        let list = List::new(items)
            .block(self.pane_block(title, focused))
            .highlight_style(highlight);

        frame.render_stateful_widget(list, area, &mut self.tree_state);
    }

    fn render_diff(&mut self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Diff;
        let title = match &self.selected_path {
            Some(path) => format!(" {path} "),
            None => " Diff ".to_string(),
        };
        let block = self.pane_block(title, focused);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        self.diff_height = inner.height as usize;
        self.scroll_to_cursor();

        if self.selected_path.is_none() {
            let hint = if self.items.is_empty() {
                format!("No changes against {}", self.target)
            } else {
                "Select a file to view its diff".to_string()
            };
            frame.render_widget(
                Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
                inner,
            );
            return;
        }

        let gutter_width = self.diff_lines.len().to_string().len().max(3);
        let mut fh = self
            .highlighter
            .for_path(self.selected_path.as_deref().unwrap_or_default());
        let end = (self.diff_offset + self.diff_height).min(self.diff_lines.len());

        let mut lines = Vec::with_capacity(end.saturating_sub(self.diff_offset));
        for index in self.diff_offset..end {
            let mut spans = Vec::new();
            if let Some(label) =
                parser::line_label(&self.diff_content, self.line_numbers, index, self.diff_cursor)
            {
                spans.push(Span::styled(
                    format!("{label:>gutter_width$} "),
                    Style::default().fg(self.palette.line_number),
                ));
            }
            spans.extend(fh.highlight(&self.diff_lines[index]));

            let mut line = Line::from(spans);
            if focused && index == self.diff_cursor {
                line = line.style(Style::default().bg(self.palette.selection_bg));
            }
            lines.push(line);
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(self.palette.border));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(inner);

        let entries: [[&str; 2]; 4] = [
            ["↑/k   Move Up", "↓/j   Move Down"],
            ["←/h   Left Panel", "→/l   Right Panel"],
            ["Tab   Switch Panel", "Num   Motion Count"],
            ["e     Edit File", "?     Close Help"],
        ];
        let style = Style::default().fg(Color::Gray);
        for (column, pair) in columns.iter().zip(entries) {
            let text: Vec<Line> = pair.iter().map(|s| Line::styled(*s, style)).collect();
            frame.render_widget(Paragraph::new(text), *column);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled(
                format!(" {} ", self.repo_name),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("│ "),
            Span::raw(format!("{} ↔ {}", self.branch, self.target)),
        ];
        if !self.count.is_empty() {
            spans.push(Span::styled(
                format!("  [{}]", self.count),
                Style::default().fg(Color::Yellow),
            ));
        }
        if let Some((message, _)) = &self.status_message {
            spans.push(Span::styled(
                format!("  {message}"),
                Style::default().fg(Color::Red),
            ));
        }
        let guide_width = if self.show_guide { GUIDE.len() as u16 } else { 0 };
        let parts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(guide_width)])
            .split(area);

        frame.render_widget(Paragraph::new(Line::from(spans)), parts[0]);
        if self.show_guide {
            let guide = Paragraph::new(GUIDE)
                .alignment(Alignment::Right)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(guide, parts[1]);
        }
    }
}

/// Setup the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("Failed to create terminal")
}

/// Restore the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Hand the terminal to the editor and take it back once it exits.
fn run_editor(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    request: EditorRequest,
) -> Result<()> {
    restore_terminal(terminal)?;
    app.open_editor(request);

    enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(terminal.backend_mut(), EnterAlternateScreen)
        .context("Failed to enter alternate screen")?;
    terminal.clear().context("Failed to clear terminal")?;
    Ok(())
}

/// Launch the interactive reviewer.
pub fn run_tui(mut app: App) -> Result<()> {
    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;

    let result = (|| -> Result<()> {
        loop {
            terminal
                .draw(|f| app.render(f))
                .context("Failed to draw frame")?;

            if app.should_quit {
                break;
            }

            if let Some(request) = app.editor_request.take() {
                run_editor(&mut terminal, &mut app, request)?;
                continue;
            }

            if event::poll(Duration::from_millis(200)).context("Failed to poll events")?
                && let Event::Key(key) = event::read().context("Failed to read event")?
                && key.kind == event::KeyEventKind::Press
            {
                app.handle_input(key);
            }
        }
        Ok(())
    })();

    // Restore terminal in all cases
    restore_terminal(&mut terminal)?;

    result
}
