use std::path::Path;

use ratatui::{
    style::{Color, Modifier, Style},
    text::Span,
};
use syntect::{
    easy::HighlightLines,
    highlighting::{Color as SyntectColor, Theme, ThemeSet},
    parsing::SyntaxSet,
};

use crate::parser::{DiffLine, LineKind};

/// Lines longer than this are coloured by kind only.
const MAX_LINE_LENGTH: usize = 10_000;

const THEME: &str = "base16-ocean.dark";

/// Base style for each kind of diff line.
pub fn kind_style(kind: LineKind) -> Style {
    match kind {
        LineKind::Addition => Style::default().fg(Color::Green),
        LineKind::Deletion => Style::default().fg(Color::Red),
        LineKind::HunkHeader => Style::default().fg(Color::Cyan),
        LineKind::FileMeta => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        LineKind::Context => Style::default(),
        LineKind::Other => Style::default().fg(Color::DarkGray),
    }
}

/// Syntax highlighter for diff content.
///
/// Holds the loaded syntax and theme sets; use [`Highlighter::for_path`]
/// to start a stateful session for one file.
pub struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    /// Loads all bundled syntaxes and themes, which takes ~250ms.
    pub fn new() -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        let theme = theme_set
            .themes
            .get(THEME)
            .or_else(|| theme_set.themes.values().next())
            .cloned()
            .unwrap_or_default();

        Self { syntax_set, theme }
    }

    /// Session for the file at `path`, chosen by extension.
    ///
    /// Lines must be fed in order so multi-line strings and comments keep
    /// their state.
    pub fn for_path(&self, path: &str) -> FileHighlighter<'_> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        FileHighlighter::new(&self.syntax_set, &self.theme, ext)
    }

    fn syntect_to_ratatui(color: SyntectColor) -> Color {
        Color::Rgb(color.r, color.g, color.b)
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse state for one file's diff.
pub struct FileHighlighter<'a> {
    highlighter: Option<HighlightLines<'a>>,
    syntax_set: &'a SyntaxSet,
}

impl<'a> FileHighlighter<'a> {
    fn new(syntax_set: &'a SyntaxSet, theme: &'a Theme, file_ext: &str) -> Self {
        let syntax = if file_ext.is_empty() {
            None
        } else {
            syntax_set
                .find_syntax_by_extension(file_ext)
                .or_else(|| syntax_set.find_syntax_by_name(file_ext))
        };

        Self {
            highlighter: syntax.map(|s| HighlightLines::new(s, theme)),
            syntax_set,
        }
    }

    /// Spans for one diff line, ANSI codes already removed.
    ///
    /// Hunk headers and file metadata are coloured by kind. Code lines keep
    /// the kind colour on their `+`/`-`/space marker and get syntax colours
    /// for the rest, falling back to the kind colour for unknown file types.
    pub fn highlight(&mut self, line: &DiffLine) -> Vec<Span<'static>> {
        let text = line.clean();
        let style = kind_style(line.kind);

        let is_code = matches!(
            line.kind,
            LineKind::Addition | LineKind::Deletion | LineKind::Context
        );
        if !is_code || text.is_empty() || text.len() > MAX_LINE_LENGTH {
            return vec![Span::styled(text.to_string(), style)];
        }

        // The marker is a single ASCII byte.
        let (marker, content) = text.split_at(1);

        let Some(ref mut highlighter) = self.highlighter else {
            return vec![Span::styled(text.to_string(), style)];
        };

        match highlighter.highlight_line(content, self.syntax_set) {
            Ok(regions) => {
                let mut spans = Vec::with_capacity(regions.len() + 1);
                spans.push(Span::styled(marker.to_string(), style));
                for (syntax_style, piece) in regions {
                    let fg = Highlighter::syntect_to_ratatui(syntax_style.foreground);
                    spans.push(Span::styled(piece.to_string(), Style::default().fg(fg)));
                }
                spans
            }
            Err(_) => vec![Span::styled(text.to_string(), style)],
        }
    }
}
