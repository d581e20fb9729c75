//! Markdown report of ranked suggestions, grouped by originating file.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AdvisorError, Result};
use crate::suggestion::Suggestion;

const CONTEXT_PREVIEW_CHARS: usize = 100;

fn unix_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    secs.to_string()
}

/// Files in the order they first appear, each with its suggestions
fn group_by_file(suggestions: &[Suggestion]) -> Vec<(&str, Vec<&Suggestion>)> {
    let mut groups: Vec<(&str, Vec<&Suggestion>)> = Vec::new();
    for suggestion in suggestions {
        match groups.iter_mut().find(|(file, _)| *file == suggestion.file) {
            Some((_, members)) => members.push(suggestion),
            None => groups.push((suggestion.file.as_str(), vec![suggestion])),
        }
    }
    groups
}

pub fn render_markdown(suggestions: &[Suggestion], generated_at: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Link Suggestions Report\n");
    let _ = writeln!(out, "**Generated:** {}", generated_at);
    let _ = writeln!(out, "**Total Suggestions:** {}\n", suggestions.len());

    if suggestions.is_empty() {
        let _ = writeln!(out, "No broken links found or all links have been resolved.");
        return out;
    }

    for (file, members) in group_by_file(suggestions) {
        let name = Path::new(file)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file.to_string());
        let _ = writeln!(out, "## {}\n", name);
        let _ = writeln!(out, "**Path:** `{}`\n", file);

        for s in members {
            let _ = writeln!(out, "### [{}] Broken Link: `{}`\n", s.tier(), s.broken_link);
            let _ = writeln!(out, "- **Line:** {}", s.line);
            let _ = writeln!(out, "- **Suggested Fix:** `{}`", s.suggested_target);
            let _ = writeln!(out, "- **Confidence:** {:.1}%", s.confidence * 100.0);
            let _ = writeln!(out, "- **Reasoning:** {}", s.reasoning);
            if !s.context.is_empty() {
                let preview: String = s
                    .context
                    .chars()
                    .take(CONTEXT_PREVIEW_CHARS)
                    .map(|c| if c == '\n' { ' ' } else { c })
                    .collect();
                let _ = writeln!(out, "- **Context:** {}...", preview);
            }
            out.push('\n');
        }
    }

    out
}

pub fn write_report(path: &Path, suggestions: &[Suggestion]) -> Result<()> {
    let content = render_markdown(suggestions, &unix_now());
    fs::write(path, content).map_err(|source| AdvisorError::Io {
        path: path.to_path_buf(),
        source,
    })
}
