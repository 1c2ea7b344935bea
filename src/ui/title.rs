use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const SEPARATOR: &str = " • ";

/// Header text for the chat screen, shortened to fit `max_width` columns.
///
/// The host is dropped first, then the model name is truncated with an
/// ellipsis.
pub fn chat_title(model: &str, host: &str, max_width: usize) -> String {
    let app_name = format!("ollama-tui v{}", env!("CARGO_PKG_VERSION"));
    let full = format!("{app_name}{SEPARATOR}{model}{SEPARATOR}{host}");
    if UnicodeWidthStr::width(full.as_str()) <= max_width {
        return full;
    }

    let without_host = format!("{app_name}{SEPARATOR}{model}");
    if UnicodeWidthStr::width(without_host.as_str()) <= max_width {
        return without_host;
    }

    let prefix = format!("{app_name}{SEPARATOR}");
    let budget = max_width.saturating_sub(UnicodeWidthStr::width(prefix.as_str()));
    format!("{prefix}{}", truncate_to_width(model, budget))
}

fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0usize;
    let budget = max_width.saturating_sub(1);
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > budget {
            break;
        }
        out.push(ch);
        used += w;
    }
    if max_width > 0 {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_title_when_it_fits() {
        let title = chat_title("llama3", "http://localhost:11434", 200);
        assert!(title.starts_with("ollama-tui v"));
        assert!(title.ends_with("llama3 • http://localhost:11434"));
    }

    #[test]
    fn host_is_dropped_before_model_is_truncated() {
        let narrow = chat_title("llama3", "http://localhost:11434", 30);
        assert!(narrow.ends_with("llama3"));
        assert!(!narrow.contains("localhost"));
    }

    #[test]
    fn model_is_truncated_with_ellipsis() {
        let title = chat_title("a-very-long-model-name:70b-instruct", "h", 28);
        assert!(title.ends_with('…'));
        assert!(UnicodeWidthStr::width(title.as_str()) <= 28);
    }
}
