use ratatui::layout::{Constraint, Flex, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Wrap};
use ratatui::Frame;
use runpad_core::api::{highlight_line, RunState, TokenKind};

use super::app::{InputMode, RunStatus, TuiApp};

const BACKGROUND: Color = Color::Rgb(0x28, 0x2c, 0x34);
const FOREGROUND: Color = Color::Rgb(0xab, 0xb2, 0xbf);
const ERROR: Color = Color::Rgb(0xe0, 0x6c, 0x75);

fn token_style(kind: TokenKind) -> Style {
    let fg = match kind {
        TokenKind::Keyword => Color::Rgb(0xc6, 0x78, 0xdd),
        TokenKind::Builtin => Color::Rgb(0x56, 0xb6, 0xc2),
        TokenKind::Comment => Color::Rgb(0x5c, 0x63, 0x70),
        TokenKind::String => Color::Rgb(0x98, 0xc3, 0x79),
        TokenKind::Definition => Color::Rgb(0x61, 0xaf, 0xef),
        TokenKind::Class => ERROR,
    };
    let style = Style::default().fg(fg);
    if kind == TokenKind::Comment {
        style.add_modifier(Modifier::ITALIC)
    } else {
        style
    }
}

fn highlighted(line: &str) -> Line<'_> {
    let mut out = Vec::new();
    let mut pos = 0;
    for span in highlight_line(line) {
        if span.start > pos {
            out.push(Span::raw(&line[pos..span.start]));
        }
        out.push(Span::styled(&line[span.start..span.end], token_style(span.kind)));
        pos = span.end;
    }
    if pos < line.len() {
        out.push(Span::raw(&line[pos..]));
    }
    Line::from(out)
}

pub fn draw(f: &mut Frame, app: &mut TuiApp) {
    let [code_area, output_area, status_area] = Layout::vertical([
        Constraint::Percentage(60),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(f.area());

    draw_code(f, app, code_area);
    draw_output(f, app, output_area);
    draw_status(f, app, status_area);

    match &app.mode {
        InputMode::Normal => {}
        InputMode::Prompt { prompt, input, .. } => {
            draw_popup(f, "input requested (Esc declines)", prompt, input)
        }
        InputMode::OpenPath { input } => draw_popup(f, "open file", "path: ", input),
        InputMode::SavePath { input } => draw_popup(f, "save as", "path: ", input),
    }
}

fn draw_code(f: &mut Frame, app: &mut TuiApp, area: Rect) {
    let block = Block::bordered()
        .title(app.title())
        .style(Style::default().bg(BACKGROUND).fg(FOREGROUND));
    let inner = block.inner(area);
    app.ensure_cursor_visible(inner.height as usize, inner.width as usize);

    let lines: Vec<Line> = app
        .buffer
        .lines()
        .iter()
        .skip(app.scroll)
        .take(inner.height as usize)
        .map(|l| highlighted(l))
        .collect();
    let hscroll = u16::try_from(app.hscroll).unwrap_or(u16::MAX);
    f.render_widget(
        Paragraph::new(lines).block(block).scroll((0, hscroll)),
        area,
    );

    if app.mode.is_normal() && inner.width > 0 {
        let cursor = app.buffer.cursor();
        let x = (cursor.col.saturating_sub(app.hscroll) as u16).min(inner.width - 1);
        let y = cursor.row.saturating_sub(app.scroll) as u16;
        f.set_cursor_position(Position::new(inner.x + x, inner.y + y));
    }
}

fn draw_output(f: &mut Frame, app: &TuiApp, area: Rect) {
    let title = match app.run_status {
        RunStatus::Idle => "output".to_string(),
        RunStatus::Running => "output (running)".to_string(),
        RunStatus::Finished(state) => format!("output ({state})"),
    };
    let fg = if app.output.is_error { ERROR } else { FOREGROUND };
    let block = Block::bordered()
        .title(title)
        .style(Style::default().bg(BACKGROUND).fg(fg));
    let inner_height = block.inner(area).height as usize;

    let skip = app.output.lines.len().saturating_sub(inner_height);
    let lines: Vec<Line> = app.output.lines[skip..]
        .iter()
        .map(|l| Line::raw(l.as_str()))
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_status(f: &mut Frame, app: &TuiApp, area: Rect) {
    let style = match app.run_status {
        RunStatus::Running => Style::default().fg(Color::Black).bg(Color::Yellow),
        RunStatus::Finished(RunState::Failed) => Style::default().fg(Color::Black).bg(ERROR),
        _ => Style::default().fg(Color::Black).bg(Color::Gray),
    };
    let cursor = app.buffer.cursor();
    let text = format!(" {}  [{}:{}]", app.status, cursor.row + 1, cursor.col + 1);
    f.render_widget(Paragraph::new(text).style(style), area);
}

fn draw_popup(f: &mut Frame, title: &str, label: &str, input: &str) {
    let area = centered(f.area(), 60, 5);
    let block = Block::bordered()
        .title(title.to_string())
        .style(Style::default().bg(BACKGROUND).fg(FOREGROUND));
    let inner = block.inner(area);
    let text = Line::from(vec![
        Span::styled(label, Style::default().fg(Color::Rgb(0x61, 0xaf, 0xef))),
        Span::raw(input),
    ]);
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        area,
    );

    if inner.width > 0 && inner.height > 0 {
        let col = (label.chars().count() + input.chars().count()) as u16;
        let x = col % inner.width;
        let y = (col / inner.width).min(inner.height - 1);
        f.set_cursor_position(Position::new(inner.x + x, inner.y + y));
    }
}

fn centered(area: Rect, percent_x: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(row);
    cell
}
