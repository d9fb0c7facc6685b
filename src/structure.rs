use crate::types::StructureFlags;

const EN_STOPWORDS: &[&str] = &["the", "and", "of", "to", "in", "is", "for", "with", "that", "was"];
const ES_STOPWORDS: &[&str] = &["el", "la", "de", "que", "los", "las", "una", "por", "con", "para"];
const FR_STOPWORDS: &[&str] = &["le", "la", "les", "des", "une", "est", "dans", "pour", "que", "avec"];
const DE_STOPWORDS: &[&str] = &["der", "die", "das", "und", "ist", "nicht", "mit", "ein", "eine", "für"];

/// Derive structural flags in one pass over the Markdown. No entity work
/// happens here; this only feeds cheap facts to downstream consumers.
pub(crate) fn scan_structure(markdown: &str) -> StructureFlags {
    let mut flags = StructureFlags::default();
    let mut in_code_fence = false;

    for (i, line) in markdown.lines().enumerate() {
        if i == 0 && line.trim_end() == "---" {
            flags.has_front_matter = true;
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            flags.has_code_fences = true;
            in_code_fence = !in_code_fence;
            continue;
        }
        if in_code_fence {
            continue;
        }

        if is_header(line) {
            flags.has_headers = true;
            flags.section_count += 1;
        }
        if is_list_item(trimmed) {
            flags.has_lists = true;
        }
        // Pipe tables need at least two cell separators to count.
        if line.contains('|') && line.matches('|').count() >= 2 {
            flags.has_tables = true;
        }
    }

    flags.language = guess_language(markdown);
    flags
}

fn is_header(line: &str) -> bool {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    (1..=6).contains(&hashes) && line.as_bytes().get(hashes) == Some(&b' ')
}

fn is_list_item(trimmed: &str) -> bool {
    if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
        .or_else(|| trimmed.strip_prefix("+ "))
    {
        return !rest.is_empty();
    }
    // Numbered lists: `1. item` or `1) item`.
    let digits = trimmed.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return false;
    }
    matches!(trimmed.as_bytes().get(digits), Some(b'.') | Some(b')'))
        && trimmed.as_bytes().get(digits + 1) == Some(&b' ')
}

/// Stopword-frequency vote across a small builtin table. Returns None when
/// the signal is too weak to be worth reporting.
fn guess_language(markdown: &str) -> Option<String> {
    let families: [(&str, &[&str]); 4] = [
        ("en", EN_STOPWORDS),
        ("es", ES_STOPWORDS),
        ("fr", FR_STOPWORDS),
        ("de", DE_STOPWORDS),
    ];
    let mut counts = [0usize; 4];

    for token in markdown.split_whitespace().take(2_000) {
        let token = token
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        if token.is_empty() {
            continue;
        }
        for (i, (_, words)) in families.iter().enumerate() {
            if words.contains(&token.as_str()) {
                counts[i] += 1;
            }
        }
    }

    let (best_idx, &best) = counts
        .iter()
        .enumerate()
        .max_by_key(|&(_, &c)| c)?;
    if best < 3 {
        return None;
    }
    Some(families[best_idx].0.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_headers_lists_tables_fences() {
        let md = "# Title\n\n- item one\n- item two\n\n| a | b |\n|---|---|\n\n```rust\nlet x = 1;\n```\n## Section\n";
        let flags = scan_structure(md);
        assert!(flags.has_headers);
        assert!(flags.has_lists);
        assert!(flags.has_tables);
        assert!(flags.has_code_fences);
        assert!(!flags.has_front_matter);
        assert_eq!(flags.section_count, 2);
    }

    #[test]
    fn headers_inside_code_fences_are_ignored() {
        let md = "```\n# not a header\n```\n";
        let flags = scan_structure(md);
        assert!(!flags.has_headers);
        assert_eq!(flags.section_count, 0);
    }

    #[test]
    fn front_matter_only_counts_on_first_line() {
        assert!(scan_structure("---\ntitle: x\n---\nbody\n").has_front_matter);
        assert!(!scan_structure("body\n---\n").has_front_matter);
    }

    #[test]
    fn english_text_is_guessed() {
        let md = "The report was prepared for the board and is ready in the morning with the data.";
        assert_eq!(scan_structure(md).language.as_deref(), Some("en"));
    }

    #[test]
    fn short_noise_has_no_language() {
        assert_eq!(scan_structure("xyzzy 123").language, None);
    }
}
