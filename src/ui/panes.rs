//! Rendering logic for each TUI pane

use crate::interpreter::VariableInfo;
use crate::parser::ast::NodeInfo;
use crate::ui::theme::DEFAULT_THEME;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

/// Simple syntax highlighting for C++ source
fn highlight_source_code(line: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut current_word = String::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '/' && chars.get(i + 1) == Some(&'/') {
            flush_word(&mut spans, &mut current_word, false);
            let rest: String = chars[i..].iter().collect();
            spans.push(Span::styled(rest, Style::default().fg(DEFAULT_THEME.comment)));
            break;
        }

        if c == '"' || c == '\'' {
            flush_word(&mut spans, &mut current_word, false);
            let mut end = i + 1;
            while end < chars.len() && chars[end] != c {
                end += if chars[end] == '\\' { 2 } else { 1 };
            }
            let end = (end + 1).min(chars.len());
            let literal: String = chars[i..end].iter().collect();
            spans.push(Span::styled(literal, Style::default().fg(DEFAULT_THEME.string)));
            i = end;
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            flush_word(&mut spans, &mut current_word, c == '(');
            let style = match c {
                '{' | '}' | '(' | ')' | '[' | ']' => Style::default().fg(DEFAULT_THEME.primary),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        current_word.push(c);
        i += 1;
    }
    flush_word(&mut spans, &mut current_word, false);

    Line::from(spans)
}

fn flush_word(spans: &mut Vec<Span<'static>>, word: &mut String, is_function: bool) {
    if !word.is_empty() {
        let style = get_keyword_style(word, is_function);
        spans.push(Span::styled(std::mem::take(word), style));
    }
}

fn get_keyword_style(word: &str, is_function: bool) -> Style {
    match word {
        "int" | "char" | "void" | "bool" | "float" | "double" | "long" | "short" | "unsigned"
        | "signed" | "auto" | "const" | "static" | "wchar_t" | "char16_t" | "char32_t" => {
            Style::default().fg(DEFAULT_THEME.type_name)
        }
        "struct" | "typedef" | "using" | "namespace" | "return" | "if" | "else" | "while"
        | "for" | "do" | "switch" | "case" | "default" | "break" | "continue" | "sizeof" => {
            Style::default()
                .fg(DEFAULT_THEME.keyword)
                .add_modifier(Modifier::BOLD)
        }
        "nullptr" | "NULL" | "true" | "false" => Style::default().fg(DEFAULT_THEME.number),
        _ if word.starts_with(|c: char| c.is_ascii_digit()) => {
            Style::default().fg(DEFAULT_THEME.number)
        }
        _ if is_function => Style::default().fg(DEFAULT_THEME.function),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

fn border_style(is_focused: bool) -> Style {
    if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    }
}

/// Character range of the current node on `line_start`'s line
fn node_columns(node: &NodeInfo, line_start: usize, line_len: usize) -> Option<(usize, usize)> {
    let line_end = line_start + line_len;
    if node.span.end <= line_start || node.span.start >= line_end {
        return None;
    }
    let from = node.span.start.max(line_start) - line_start;
    let to = node.span.end.min(line_end) - line_start;
    Some((from, to))
}

/// Underline the columns `[from, to)` of a highlighted line
fn mark_columns(line: Line<'static>, from: usize, to: usize) -> Line<'static> {
    let marked = Style::default()
        .add_modifier(Modifier::UNDERLINED | Modifier::BOLD)
        .fg(DEFAULT_THEME.secondary);
    let mut out = Vec::new();
    let mut column = 0;
    for span in line.spans {
        let text: Vec<char> = span.content.chars().collect();
        let start = column;
        column += text.len();
        if column <= from || start >= to {
            out.push(span);
            continue;
        }
        let a = from.saturating_sub(start);
        let b = (to - start).min(text.len());
        if a > 0 {
            out.push(Span::styled(text[..a].iter().collect::<String>(), span.style));
        }
        out.push(Span::styled(text[a..b].iter().collect::<String>(), span.style.patch(marked)));
        if b < text.len() {
            out.push(Span::styled(text[b..].iter().collect::<String>(), span.style));
        }
    }
    Line::from(out)
}

/// Render the source pane with the current node highlighted
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    source_code: &str,
    current: Option<&NodeInfo>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(" Source Code ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let lines: Vec<&str> = source_code.lines().collect();
    let total_lines = lines.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    let current_line = current.map_or(0, |node| node.span.line);

    // Keep the current line in the middle third of the pane
    if current_line > 0 {
        let idx = current_line - 1;
        if idx < *scroll_offset + visible_height / 3 || idx >= *scroll_offset + visible_height * 2 / 3 {
            *scroll_offset = idx.saturating_sub(visible_height / 2);
        }
    }
    *scroll_offset = (*scroll_offset).min(total_lines.saturating_sub(visible_height));

    let mut line_start = 0;
    let mut starts = Vec::with_capacity(total_lines);
    for line in &lines {
        starts.push(line_start);
        line_start += line.chars().count() + 1;
    }

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let is_current = line_num == current_line;
            let num_style = if is_current {
                Style::default()
                    .fg(DEFAULT_THEME.secondary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(DEFAULT_THEME.comment)
            };

            let mut content = highlight_source_code(line);
            if let Some((from, to)) =
                current.and_then(|node| node_columns(node, starts[idx], line.chars().count()))
            {
                content = mark_columns(content, from, to);
            }
            if is_current {
                for span in &mut content.spans {
                    span.style = span.style.bg(DEFAULT_THEME.current_line_bg);
                }
            }

            let mut spans = vec![Span::styled(format!("{:4} ", line_num), num_style)];
            spans.extend(content.spans);
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(visible_lines).block(block), area);
}

/// Render the variables pane
pub fn render_variables_pane(
    frame: &mut Frame,
    area: Rect,
    variables: &[VariableInfo],
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(" Variables ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    if variables.is_empty() {
        let paragraph = Paragraph::new("(no variables in scope)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    *scroll_offset = (*scroll_offset).min(variables.len().saturating_sub(visible_height));

    let items: Vec<ListItem> = variables
        .iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(|var| {
            ListItem::new(Line::from(vec![
                Span::styled(var.ty.clone(), Style::default().fg(DEFAULT_THEME.type_name)),
                Span::raw(" "),
                Span::styled(var.name.clone(), Style::default().fg(DEFAULT_THEME.fg)),
                Span::styled(" = ", Style::default().fg(DEFAULT_THEME.comment)),
                Span::styled(var.value.clone(), Style::default().fg(DEFAULT_THEME.number)),
            ]))
        })
        .collect();

    let block = block.padding(Padding::new(1, 0, 0, 0));
    frame.render_widget(List::new(items).block(block), area);
}

/// Render the program output pane, with the input line below it while the
/// program waits for console input
pub fn render_output_pane(
    frame: &mut Frame,
    area: Rect,
    output: &str,
    input: Option<&str>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let (output_area, input_area) = match input {
        Some(_) => {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(3)])
                .split(area);
            (rows[0], Some(rows[1]))
        }
        None => (area, None),
    };

    let block = Block::default()
        .title(" Output ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    if output.is_empty() {
        let paragraph = Paragraph::new("(no output)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, output_area);
    } else {
        let lines: Vec<&str> = output.lines().collect();
        let visible_height = output_area.height.saturating_sub(2).max(1) as usize;
        *scroll_offset = (*scroll_offset).min(lines.len().saturating_sub(visible_height));
        let items: Vec<ListItem> = lines
            .iter()
            .skip(*scroll_offset)
            .take(visible_height)
            .map(|line| ListItem::new(line.to_string()).style(Style::default().fg(DEFAULT_THEME.fg)))
            .collect();
        let block = block.padding(Padding::new(1, 0, 0, 0));
        frame.render_widget(List::new(items).block(block), output_area);
    }

    if let (Some(area), Some(text)) = (input_area, input) {
        let block = Block::default()
            .title(" Input (Enter to send, Esc for end of file) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(DEFAULT_THEME.secondary));
        let line = Line::from(vec![
            Span::styled("> ", Style::default().fg(DEFAULT_THEME.secondary)),
            Span::raw(text.to_string()),
        ]);
        frame.render_widget(Paragraph::new(line).block(block), area);
    }
}

/// Run state shown in the status bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunBadge {
    Ready,
    AwaitingInput,
    Finished,
    Faulted,
}

/// Render the status bar at the bottom
pub fn render_status_bar(
    frame: &mut Frame,
    area: Rect,
    message: &str,
    node: Option<&NodeInfo>,
    badge: RunBadge,
    statement_breaks: bool,
) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let location = match node {
        Some(node) => format!(" {} {}:{} ", node.kind, node.span.line, node.span.column),
        None => " start ".to_string(),
    };
    let left_spans = vec![
        Span::styled(
            location,
            Style::default()
                .bg(DEFAULT_THEME.primary)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            " | ",
            Style::default()
                .bg(DEFAULT_THEME.current_line_bg)
                .fg(DEFAULT_THEME.comment),
        ),
        Span::styled(
            format!(" {} ", message),
            Style::default()
                .bg(DEFAULT_THEME.current_line_bg)
                .fg(DEFAULT_THEME.fg),
        ),
    ];
    let left_paragraph = Paragraph::new(Line::from(left_spans))
        .style(Style::default().bg(DEFAULT_THEME.current_line_bg))
        .alignment(Alignment::Left);
    frame.render_widget(left_paragraph, layout[0]);

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = Style::default()
        .bg(DEFAULT_THEME.current_line_bg)
        .fg(DEFAULT_THEME.fg);
    let sep_style = Style::default()
        .bg(DEFAULT_THEME.current_line_bg)
        .fg(DEFAULT_THEME.comment);

    let breaks = if statement_breaks { " stmt:on " } else { " stmt:off " };
    let mut right_spans = vec![
        Span::styled(" → ", key_style),
        Span::styled(" node ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" n ", key_style),
        Span::styled(" line ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" c ", key_style),
        Span::styled(" continue ", desc_style),
        Span::styled("│", sep_style),
        Span::styled(" b ", key_style),
        Span::styled(breaks, desc_style),
        Span::styled("│", sep_style),
        Span::styled(" q ", key_style),
        Span::styled(" quit ", desc_style),
    ];

    let badge = match badge {
        RunBadge::Ready => None,
        RunBadge::AwaitingInput => Some((" INPUT ", DEFAULT_THEME.secondary)),
        RunBadge::Finished => Some((" END ", DEFAULT_THEME.success)),
        RunBadge::Faulted => Some((" FAULT ", DEFAULT_THEME.error)),
    };
    if let Some((text, color)) = badge {
        right_spans.push(Span::styled("│", sep_style));
        right_spans.push(Span::styled(
            text,
            Style::default()
                .bg(color)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let right_paragraph = Paragraph::new(Line::from(right_spans))
        .style(Style::default().bg(DEFAULT_THEME.current_line_bg))
        .alignment(Alignment::Right);
    frame.render_widget(right_paragraph, layout[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::{NodeKind, Span as SourceSpan};

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_highlight_keeps_text() {
        let line = highlight_source_code("int x = f(\"a;b\"); // done");
        assert_eq!(text(&line), "int x = f(\"a;b\"); // done");
    }

    #[test]
    fn test_node_columns_clip_to_line() {
        let node = NodeInfo {
            kind: NodeKind::ExpressionStatement,
            span: SourceSpan::new(5, 20, 1, 6),
        };
        assert_eq!(node_columns(&node, 0, 10), Some((5, 10)));
        assert_eq!(node_columns(&node, 11, 10), Some((0, 9)));
        assert_eq!(node_columns(&node, 21, 4), None);
    }

    #[test]
    fn test_mark_columns_splits_spans() {
        let line = mark_columns(highlight_source_code("a = b;"), 4, 5);
        assert_eq!(text(&line), "a = b;");
        let marked = line
            .spans
            .iter()
            .find(|s| s.style.add_modifier.contains(Modifier::UNDERLINED))
            .map(|s| s.content.to_string());
        assert_eq!(marked.as_deref(), Some("b"));
    }
}
