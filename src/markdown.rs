use once_cell::sync::Lazy;
use regex::Regex;

// Matched pairs only; unbalanced ** stays literal text.
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*.*?\*\*").unwrap());

/// A contiguous run of text within a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Plain(String),
    Bold(String),
}

/// One rendered unit of formatted text. Produced one-per-line, in line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    ListItem(Vec<Span>),
    Paragraph(Vec<Span>),
    Spacer,
}

/// Converts raw model output into display blocks.
///
/// Line-oriented, single pass: split on newlines, classify each line by
/// prefix (headings, bullets, blank, paragraph), then split list/paragraph
/// content on `**bold**` runs. Headings keep their literal text without
/// inline parsing. Total over all inputs; no escaping mechanism.
pub fn parse(content: &str) -> Vec<Block> {
    content.split('\n').map(classify_line).collect()
}

fn classify_line(line: &str) -> Block {
    let hashes = line.chars().take_while(|&c| c == '#').count();
    if hashes > 0 {
        let rest = &line[hashes..];
        if rest.starts_with(char::is_whitespace) {
            let level = match hashes {
                1 => 1,
                2 => 2,
                _ => 3,
            };
            return Block::Heading {
                level,
                text: rest.trim_start().to_string(),
            };
        }
    }

    if let Some(rest) = line.strip_prefix(['-', '*']) {
        if rest.starts_with(char::is_whitespace) {
            return Block::ListItem(parse_spans(rest.trim_start()));
        }
    }

    if line.trim().is_empty() {
        return Block::Spacer;
    }

    Block::Paragraph(parse_spans(line))
}

/// Splits text on `**...**` runs into alternating plain and bold spans.
fn parse_spans(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut last = 0;

    for m in BOLD.find_iter(text) {
        if m.start() > last {
            spans.push(Span::Plain(text[last..m.start()].to_string()));
        }
        spans.push(Span::Bold(text[m.start() + 2..m.end() - 2].to_string()));
        last = m.end();
    }

    if last < text.len() {
        spans.push(Span::Plain(text[last..].to_string()));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> Span {
        Span::Plain(s.to_string())
    }

    fn bold(s: &str) -> Span {
        Span::Bold(s.to_string())
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(
            parse("### Title"),
            vec![Block::Heading {
                level: 3,
                text: "Title".to_string()
            }]
        );
        assert_eq!(
            parse("## Title"),
            vec![Block::Heading {
                level: 2,
                text: "Title".to_string()
            }]
        );
        assert_eq!(
            parse("# Title"),
            vec![Block::Heading {
                level: 1,
                text: "Title".to_string()
            }]
        );
    }

    #[test]
    fn test_four_hashes_is_still_level_three() {
        assert_eq!(
            parse("#### Deep"),
            vec![Block::Heading {
                level: 3,
                text: "Deep".to_string()
            }]
        );
    }

    #[test]
    fn test_hashes_without_whitespace_are_a_paragraph() {
        assert_eq!(parse("#hashtag"), vec![Block::Paragraph(vec![plain("#hashtag")])]);
    }

    #[test]
    fn test_both_bullet_markers() {
        assert_eq!(parse("- item one"), vec![Block::ListItem(vec![plain("item one")])]);
        assert_eq!(parse("* item one"), vec![Block::ListItem(vec![plain("item one")])]);
    }

    #[test]
    fn test_bare_bullet_marker_yields_empty_item() {
        assert_eq!(parse("- "), vec![Block::ListItem(vec![])]);
    }

    #[test]
    fn test_marker_without_whitespace_is_a_paragraph() {
        assert_eq!(parse("-item"), vec![Block::Paragraph(vec![plain("-item")])]);
        assert_eq!(parse("*stars*"), vec![Block::Paragraph(vec![plain("*stars*")])]);
    }

    #[test]
    fn test_bold_span_splitting() {
        assert_eq!(
            parse("Hello **world** today"),
            vec![Block::Paragraph(vec![
                plain("Hello "),
                bold("world"),
                plain(" today"),
            ])]
        );
    }

    #[test]
    fn test_bold_inside_list_item() {
        assert_eq!(
            parse("- **Water:** weekly"),
            vec![Block::ListItem(vec![bold("Water:"), plain(" weekly")])]
        );
    }

    #[test]
    fn test_unbalanced_bold_stays_literal() {
        assert_eq!(parse("a **b c"), vec![Block::Paragraph(vec![plain("a **b c")])]);
    }

    #[test]
    fn test_headings_skip_inline_parsing() {
        assert_eq!(
            parse("## **Rosa** rubiginosa"),
            vec![Block::Heading {
                level: 2,
                text: "**Rosa** rubiginosa".to_string()
            }]
        );
    }

    #[test]
    fn test_blank_lines_become_spacers() {
        assert_eq!(parse("a\n\nb").len(), 3);
        assert_eq!(parse("a\n\nb")[1], Block::Spacer);
        assert_eq!(parse("   \t"), vec![Block::Spacer]);
    }

    #[test]
    fn test_empty_input_is_one_spacer() {
        // "".split('\n') yields a single empty line, and the blank-line rule
        // runs before the paragraph fallthrough.
        assert_eq!(parse(""), vec![Block::Spacer]);
    }

    #[test]
    fn test_one_block_per_line() {
        let input = "# Rose\n\n- **Water:** weekly\n- Sun: full\nA hardy climber.";
        let blocks = parse(input);
        assert_eq!(blocks.len(), input.split('\n').count());
    }

    #[test]
    fn test_deterministic() {
        let input = "## Care\n- **Soil:** loamy\n\ntext **here**";
        assert_eq!(parse(input), parse(input));
    }
}
