use keel_value::StyleTable;

/// Wrap `text` in the ANSI escapes assigned to `style_type`; unknown styles
/// leave the text unchanged
pub fn stylize(styles: &StyleTable, text: &str, style_type: &str) -> String {
    match styles.codes(style_type) {
        Some((open, close)) => format!("\u{1b}[{}m{}\u{1b}[{}m", open, text, close),
        None => text.to_string(),
    }
}
