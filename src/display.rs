use colored::Colorize;
use regex::{Regex, RegexBuilder};

use crate::models::{CodeMatch, RepoResult};

/// Print every repository that produced matches: a project header, then per
/// match the blob URL and the match data with line numbers and the search
/// text highlighted.
pub fn print_results(results: &[RepoResult], search_text: &str) {
    let pattern = highlight_pattern(search_text);

    for entry in results.iter().filter(|entry| !entry.matches.is_empty()) {
        println!("Proj : {}\n", entry.name.bold());

        for content in &entry.matches {
            println!("{} - {}\n", content.filename, blob_url(entry, content));
            print_data_block(content, &pattern);
            println!("-----------\n");
        }
    }
}

/// Canonical web address of the matched file at the matched ref.
fn blob_url(entry: &RepoResult, content: &CodeMatch) -> String {
    format!(
        "{}/-/blob/{}/{}",
        entry.web_url, content.ref_name, content.path
    )
}

fn print_data_block(content: &CodeMatch, pattern: &Regex) {
    for (offset, line) in content.data.lines().enumerate() {
        let number = content.start_line + offset as u64;
        println!(
            "{} {}",
            format!("{number:>6} |").dimmed(),
            highlight_line(line, pattern)
        );
    }
}

/// Compile the search text for highlighting, case-insensitively. The text is
/// treated as a pattern; when it is not a valid one, fall back to a literal
/// match so rendering never fails after a successful search.
fn highlight_pattern(search_text: &str) -> Regex {
    RegexBuilder::new(search_text)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|_| {
            RegexBuilder::new(&regex::escape(search_text))
                .case_insensitive(true)
                .build()
                .expect("escaped pattern is always valid")
        })
}

/// Wrap every occurrence of the pattern in a highlight style.
fn highlight_line(line: &str, pattern: &Regex) -> String {
    let mut styled = String::with_capacity(line.len());
    let mut cursor = 0;

    for found in pattern.find_iter(line) {
        styled.push_str(&line[cursor..found.start()]);
        styled.push_str(&line[found.start()..found.end()].on_magenta().to_string());
        cursor = found.end();
    }

    styled.push_str(&line[cursor..]);
    styled
}
