//! Re-indentation of inserted and replacement content.
//!
//! Output always uses `\n`; the caller converts it to the target file's
//! line ending before splicing.

use crate::position::{leading_whitespace, Indent, IndentStyle, IndentUnit};

/// Split content into lines, dropping a single trailing line break.
fn content_lines(content: &str) -> Vec<&str> {
    let trimmed = content
        .strip_suffix("\r\n")
        .or_else(|| content.strip_suffix('\n'))
        .or_else(|| content.strip_suffix('\r'))
        .unwrap_or(content);
    trimmed
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Smallest indentation, in columns, over the non-blank lines.
fn common_indent(lines: &[&str], unit: IndentUnit) -> usize {
    common_indent_of_nonblank(lines, unit).unwrap_or(0)
}

/// Re-render `line` with `strip` columns removed and `base` prepended.
/// Remaining relative indentation is converted to the file's style.
fn rebase_line(line: &str, strip: usize, base: &str, unit: IndentUnit) -> String {
    if line.trim().is_empty() {
        return String::new();
    }
    let ws = leading_whitespace(line);
    let relative = unit.columns(ws).saturating_sub(strip);
    let relative_ws = match unit.style {
        IndentStyle::Tabs => unit.render(relative),
        IndentStyle::Spaces => " ".repeat(relative),
    };
    format!("{base}{relative_ws}{}", &line[ws.len()..])
}

/// Format content to be inserted as whole lines at `base` indentation.
///
/// Single-line content has its own indentation replaced by the base.
/// Multi-line content is dedented by its common indentation and re-indented,
/// so nesting inside the block is preserved. Blank lines stay empty.
pub fn format_for_insertion(content: &str, base: &Indent, unit: IndentUnit) -> String {
    let lines = content_lines(content);
    let strip = common_indent(&lines, unit);
    lines
        .iter()
        .map(|line| rebase_line(line, strip, &base.text, unit))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a replacement for an in-line span.
///
/// The first line lands at the match column and is kept verbatim. When no
/// later line sits shallower than the anchor line, the replacement already
/// carries absolute indentation and is returned unchanged. Otherwise later
/// lines are treated as relative to the shallowest line of the replacement
/// and re-based onto the anchor line's indentation.
pub fn format_for_replacement(content: &str, base: &Indent, unit: IndentUnit) -> String {
    if !content.contains('\n') && !content.contains('\r') {
        return content.to_string();
    }

    let lines: Vec<&str> = content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let continuation = common_indent_of_nonblank(&lines[1..], unit);
    match continuation {
        Some(min) if min < unit.columns(&base.text) => {}
        _ => return lines.join("\n"),
    }

    let strip = common_indent(&lines, unit);
    let mut out = String::with_capacity(content.len() + base.text.len() * lines.len());
    out.push_str(lines[0]);
    for line in &lines[1..] {
        out.push('\n');
        out.push_str(&rebase_line(line, strip, &base.text, unit));
    }
    out
}

fn common_indent_of_nonblank(lines: &[&str], unit: IndentUnit) -> Option<usize> {
    lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| unit.columns(leading_whitespace(line)))
        .min()
}
