use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};

use crate::core::message::Message;

const USER_PREFIX: &str = "You: ";

/// Wrapping applied to the transcript paragraph.
pub const TRANSCRIPT_WRAP: Wrap = Wrap { trim: false };

/// Flatten the conversation into display lines, one blank line between turns.
///
/// Assistant turns are prefixed with the model name. An empty assistant turn
/// (the placeholder of a stream that has not produced text yet) renders as a
/// lone prefix.
pub fn build_transcript_lines(messages: &[Message], model: &str) -> Vec<Line<'static>> {
    let user_style = Style::default().fg(Color::Cyan);
    let assistant_prefix_style = Style::default()
        .fg(Color::Green)
        .add_modifier(Modifier::BOLD);
    let assistant_prefix = format!("{model}: ");

    let mut lines = Vec::new();
    for message in messages {
        let (prefix, prefix_style, body_style) = if message.is_user() {
            (
                USER_PREFIX.to_string(),
                user_style.add_modifier(Modifier::BOLD),
                user_style,
            )
        } else {
            (
                assistant_prefix.clone(),
                assistant_prefix_style,
                Style::default(),
            )
        };

        let mut content_lines = message.content.split('\n');
        let first = content_lines.next().unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled(prefix, prefix_style),
            Span::styled(first.to_string(), body_style),
        ]));
        for rest in content_lines {
            lines.push(Line::from(Span::styled(rest.to_string(), body_style)));
        }
        lines.push(Line::from(""));
    }
    lines
}

/// Rows `paragraph` occupies at `width` columns, counted by ratatui's own
/// line composer so the scroll range matches what is drawn. Call it before a
/// block is attached, since the count includes block borders.
pub fn wrapped_height(paragraph: &Paragraph<'_>, width: u16) -> u16 {
    u16::try_from(paragraph.line_count(width)).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    fn transcript(lines: Vec<Line<'static>>) -> Paragraph<'static> {
        Paragraph::new(lines).wrap(TRANSCRIPT_WRAP)
    }

    fn drawn_rows(lines: Vec<Line<'static>>, width: u16) -> u16 {
        let mut terminal = Terminal::new(TestBackend::new(width, 20)).expect("terminal");
        terminal
            .draw(|f| f.render_widget(transcript(lines), f.area()))
            .expect("draw");
        let buffer = terminal.backend().buffer();
        (0..20)
            .filter(|&y| (0..width).any(|x| buffer[(x, y)].symbol() != " "))
            .map(|y| y + 1)
            .max()
            .unwrap_or(0)
    }

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn prefixes_turns_and_splits_multiline_content() {
        let messages = vec![
            Message::user("hi"),
            Message::assistant("line one\nline two"),
        ];
        let lines = build_transcript_lines(&messages, "llama3");
        let text: Vec<String> = lines.iter().map(plain).collect();
        assert_eq!(
            text,
            vec!["You: hi", "", "llama3: line one", "line two", ""]
        );
    }

    #[test]
    fn placeholder_renders_as_prefix_only() {
        let lines = build_transcript_lines(&[Message::assistant("")], "phi3");
        assert_eq!(plain(&lines[0]), "phi3: ");
    }

    #[test]
    fn wrapped_height_counts_overflowing_lines() {
        let lines = vec![
            Line::from("a".repeat(25)),
            Line::from(""),
            Line::from("short"),
        ];
        assert_eq!(wrapped_height(&transcript(lines.clone()), 10), 3 + 1 + 1);
        assert_eq!(wrapped_height(&transcript(lines), 0), 0);
    }

    #[test]
    fn wrapped_height_follows_word_boundaries() {
        // Twelve columns of text, but each word needs its own row at width 6.
        let lines = vec![Line::from("aaaa bbbb cc")];
        assert_eq!(wrapped_height(&transcript(lines.clone()), 6), 3);
        assert_eq!(drawn_rows(lines, 6), 3);
    }

    #[test]
    fn wrapped_height_matches_rendered_transcript() {
        let messages = vec![
            Message::user("could you explain word wrapping in terminals"),
            Message::assistant("sure thing, lines break between words\nlike so"),
        ];
        let mut lines = build_transcript_lines(&messages, "llama3");
        lines.pop();
        for width in [12, 17, 23] {
            assert_eq!(
                wrapped_height(&transcript(lines.clone()), width),
                drawn_rows(lines.clone(), width),
                "width {width}"
            );
        }
    }
}
