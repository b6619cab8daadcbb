//! NEXUS lexical layer.
//!
//! NEXUS text has two constructs that change how every other character is
//! read:
//! - quoted strings, opened by `'` or `"` and closed by the same character
//!   (no escapes)
//! - bracket comments, `[ ... ]`, which nest
//!
//! Inside a quoted string, brackets are plain text. Inside a comment, quote
//! characters are plain comment text.
//!
//! Everything in this module is a pure function over `&str`.

/// How a single character was read by [`LexState::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    /// Ordinary top-level text.
    Text,
    /// Part of a quoted run, including the delimiters.
    Quoted,
    /// Part of a bracket comment, including the brackets.
    Comment,
}

/// Quote and comment state carried across characters.
#[derive(Debug, Default, Clone, Copy)]
struct LexState {
    depth: usize,
    quote: Option<char>,
}

impl LexState {
    /// Consumes one character and reports how it should be treated.
    fn step(&mut self, c: char) -> CharClass {
        if let Some(q) = self.quote {
            if c == q {
                self.quote = None;
            }
            return CharClass::Quoted;
        }

        if self.depth > 0 {
            match c {
                '[' => self.depth += 1,
                ']' => self.depth -= 1,
                _ => {}
            }
            return CharClass::Comment;
        }

        match c {
            '[' => {
                self.depth = 1;
                CharClass::Comment
            }
            '\'' | '"' => {
                self.quote = Some(c);
                CharClass::Quoted
            }
            _ => CharClass::Text,
        }
    }

    fn at_top_level(&self) -> bool {
        self.depth == 0 && self.quote.is_none()
    }
}

/// Removes all bracket comments from `text`.
///
/// Brackets nest, and brackets inside a quoted run are kept literally. An
/// unterminated comment swallows the rest of the input. A stray `]` outside
/// any comment is kept.
///
/// Stripping is idempotent: `strip_comments(&strip_comments(s)) == strip_comments(s)`.
pub fn strip_comments(text: &str) -> String {
    let mut state = LexState::default();
    let mut result = String::with_capacity(text.len());

    for c in text.chars() {
        if state.step(c) != CharClass::Comment {
            result.push(c);
        }
    }

    result
}

/// Splits `text` into lines with comments removed, each paired with its
/// 1-based line number in `text`.
///
/// A newline inside a comment does not end a line: the text on both sides
/// of a multi-line comment forms one line, numbered after the line it
/// started on.
pub fn comment_free_lines(text: &str) -> Vec<(usize, String)> {
    let mut state = LexState::default();
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut start = 1;
    let mut number = 1;

    for c in text.chars() {
        let class = state.step(c);
        if c == '\n' {
            number += 1;
        }
        match class {
            CharClass::Comment => {}
            _ if c == '\n' => {
                let line = std::mem::take(&mut current);
                lines.push((start, line.trim_end_matches('\r').to_string()));
                start = number;
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        lines.push((start, current));
    }

    lines
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Returns the `(start, end)` byte range of the first top-level,
/// case-insensitive, whole-word occurrence of `keyword`, along with the
/// lexical state at that point.
///
/// Occurrences inside quoted strings or comments are skipped.
fn find_keyword(document: &str, keyword: &str) -> Option<(usize, usize, LexState)> {
    let needle = keyword.as_bytes();
    if needle.is_empty() {
        return None;
    }

    let bytes = document.as_bytes();
    let mut state = LexState::default();
    let mut prev: Option<char> = None;

    for (i, c) in document.char_indices() {
        if state.at_top_level() {
            let end = i + needle.len();
            let candidate = bytes.get(i..end);
            if candidate.is_some_and(|b| b.eq_ignore_ascii_case(needle))
                && !prev.is_some_and(is_word_char)
                && !document
                    .get(end..)
                    .and_then(|rest| rest.chars().next())
                    .is_some_and(is_word_char)
            {
                return Some((i, end, state));
            }
        }
        state.step(c);
        prev = Some(c);
    }

    None
}

/// Returns true if `keyword` occurs as a top-level whole word in `document`.
pub fn contains_keyword(document: &str, keyword: &str) -> bool {
    find_keyword(document, keyword).is_some()
}

/// Extracts the body of the command introduced by `keyword`.
///
/// Locates the first case-insensitive whole-word occurrence of `keyword`
/// (`MATRIX` does not match inside `SUBMATRIX`) and returns the text
/// between the end of the keyword and the next semicolon that is neither
/// quoted nor inside a comment, with trailing whitespace removed. The body
/// starts right after the keyword, so its first line is the rest of the
/// keyword's line. Comments are left in place.
///
/// Returns `None` if the keyword is absent or the command is never
/// terminated.
pub fn extract_block<'a>(document: &'a str, keyword: &str) -> Option<&'a str> {
    let (_, start, mut state) = find_keyword(document, keyword)?;
    let body = &document[start..];

    for (i, c) in body.char_indices() {
        if state.step(c) == CharClass::Text && c == ';' {
            return Some(body[..i].trim_end());
        }
    }

    None
}

/// Splits the next token off `text`.
///
/// Leading whitespace is skipped. A token is either a complete quoted run
/// (`'...'` or `"..."`, delimiters included) or a maximal run of
/// non-whitespace characters. A quote with no closing partner is read as
/// an ordinary character.
///
/// Returns the token and the remainder immediately following it.
pub fn next_token(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    let first = text.chars().next()?;

    if first == '\'' || first == '"' {
        if let Some(close) = text[1..].find(first) {
            let end = 1 + close + first.len_utf8();
            return Some((&text[..end], &text[end..]));
        }
    }

    let end = text.find(char::is_whitespace).unwrap_or(text.len());
    Some((&text[..end], &text[end..]))
}

/// Iterates over all tokens of `text` using the [`next_token`] grammar.
pub fn tokens(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let (token, remainder) = next_token(rest)?;
        rest = remainder;
        Some(token)
    })
}

/// Strips one matching pair of surrounding quotes.
///
/// Both ends must carry the same quote character and the token must be
/// longer than one character.
pub fn unquote(token: &str) -> &str {
    for q in ['\'', '"'] {
        if token.len() > 1 && token.starts_with(q) && token.ends_with(q) {
            return &token[1..token.len() - 1];
        }
    }
    token
}

/// Unicode default case folding (`ß` folds to `ss`).
pub fn case_fold(text: &str) -> String {
    caseless::default_case_fold_str(text)
}

/// The matching key of a taxon token: unquoted, then case-folded.
pub fn canonical_key(token: &str) -> String {
    case_fold(unquote(token))
}

/// Length in bytes of the prefix of `line` whose case folding equals `key`.
///
/// Folding is applied per character, so the returned offset always lands
/// on a character boundary of `line`.
pub fn folded_prefix_len(line: &str, key: &str) -> Option<usize> {
    if key.is_empty() {
        return None;
    }

    let mut remaining = key;
    let mut buf = [0u8; 4];
    for (i, c) in line.char_indices() {
        if remaining.is_empty() {
            return Some(i);
        }
        let folded = case_fold(c.encode_utf8(&mut buf));
        remaining = remaining.strip_prefix(folded.as_str())?;
    }

    remaining.is_empty().then_some(line.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_simple_comment() {
        assert_eq!(strip_comments("A [comment] B"), "A  B");
    }

    #[test]
    fn test_strip_nested_comment() {
        assert_eq!(strip_comments("A [outer [inner] still] B"), "A  B");
    }

    #[test]
    fn test_brackets_inside_quotes_are_text() {
        assert_eq!(
            strip_comments("\"name[with]bracket\" ACGT"),
            "\"name[with]bracket\" ACGT"
        );
        assert_eq!(strip_comments("'a[b' [gone] c"), "'a[b'  c");
    }

    #[test]
    fn test_quotes_inside_comment_do_not_open_strings() {
        assert_eq!(strip_comments("A [it's fine] B 'c'"), "A  B 'c'");
    }

    #[test]
    fn test_unterminated_comment_consumes_rest() {
        assert_eq!(strip_comments("ACGT [never closed\nTTTT"), "ACGT ");
    }

    #[test]
    fn test_curly_braces_are_not_comments() {
        assert_eq!(strip_comments("{A} ACGT"), "{A} ACGT");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let inputs = [
            "A [x [y] z] B",
            "'q[uo]te' [c] ]stray",
            "\"open [never",
            "[unterminated 'quote",
            "plain text\n\nwith lines",
        ];
        for input in inputs {
            let once = strip_comments(input);
            assert_eq!(strip_comments(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_comment_free_lines_keep_raw_numbers() {
        let lines = comment_free_lines("A AC [one\ntwo] GT\r\n[own line]\n\nB 'q[x'\nC");
        assert_eq!(
            lines,
            vec![
                (1, "A AC  GT".to_string()),
                (3, String::new()),
                (4, String::new()),
                (5, "B 'q[x'".to_string()),
                (6, "C".to_string()),
            ]
        );
        assert!(comment_free_lines("").is_empty());
        assert_eq!(comment_free_lines("A\n"), vec![(1, "A".to_string())]);
    }

    #[test]
    fn test_extract_block_basic() {
        let doc = "BEGIN TAXA; TAXLABELS A B C; END;";
        assert_eq!(extract_block(doc, "TAXLABELS"), Some(" A B C"));
    }

    #[test]
    fn test_extract_block_case_insensitive() {
        let doc = "begin characters; matrix\n  a ACGT\n;\nend;";
        assert_eq!(extract_block(doc, "MATRIX"), Some("\n  a ACGT"));
    }

    #[test]
    fn test_extract_block_whole_word() {
        let doc = "SUBMATRIX x; MATRIXES y; MATRIX A ACGT;";
        assert_eq!(extract_block(doc, "MATRIX"), Some(" A ACGT"));
    }

    #[test]
    fn test_extract_block_ignores_quoted_and_commented_semicolons() {
        let doc = "MATRIX 'a;b' ACGT [note; here] TTTT\n;";
        assert_eq!(extract_block(doc, "MATRIX"), Some(" 'a;b' ACGT [note; here] TTTT"));
    }

    #[test]
    fn test_extract_block_skips_keyword_in_quotes_and_comments() {
        let doc = "TITLE 'Character Matrix'; [MATRIX follows] MATRIX A ACGT;";
        assert_eq!(extract_block(doc, "MATRIX"), Some(" A ACGT"));
    }

    #[test]
    fn test_extract_block_missing() {
        assert_eq!(extract_block("#NEXUS SIMPLIFIED CONTENT NOMATRIX", "MATRIX"), None);
        assert!(!contains_keyword("#NEXUS SIMPLIFIED CONTENT NOMATRIX", "MATRIX"));
    }

    #[test]
    fn test_extract_block_unterminated() {
        let doc = "MATRIX A ACGT 'dangling; B TTTT;";
        assert_eq!(extract_block(doc, "MATRIX"), None);
        assert!(contains_keyword(doc, "MATRIX"));
    }

    #[test]
    fn test_tokens_quoted_and_bare() {
        let found: Vec<&str> = tokens("T1 'taxon two'  \"three [x]\" {A}").collect();
        assert_eq!(found, vec!["T1", "'taxon two'", "\"three [x]\"", "{A}"]);
    }

    #[test]
    fn test_unclosed_quote_is_bare_token() {
        let found: Vec<&str> = tokens("'abc def").collect();
        assert_eq!(found, vec!["'abc", "def"]);
    }

    #[test]
    fn test_next_token_remainder() {
        assert_eq!(next_token("  'a b' ACGT"), Some(("'a b'", " ACGT")));
        assert_eq!(next_token("ACGT"), Some(("ACGT", "")));
        assert_eq!(next_token("   "), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'taxon two'"), "taxon two");
        assert_eq!(unquote("\"x\""), "x");
        assert_eq!(unquote("'mixed\""), "'mixed\"");
        assert_eq!(unquote("'"), "'");
        assert_eq!(unquote("plain"), "plain");
    }

    #[test]
    fn test_canonical_key_folds_case() {
        assert_eq!(canonical_key("Taxonß"), canonical_key("TaxonSS"));
        assert_eq!(canonical_key("'TaxonA'"), "taxona");
    }

    #[test]
    fn test_folded_prefix_len() {
        assert_eq!(folded_prefix_len("Taxon Two ACGT", "taxon two"), Some(9));
        assert_eq!(folded_prefix_len("TAXONSS ACGT", &case_fold("Taxonß")), Some(7));
        assert_eq!(folded_prefix_len("Taxonß ACGT", "taxonss"), Some(7));
        assert_eq!(folded_prefix_len("Tax", "taxon"), None);
        assert_eq!(folded_prefix_len("anything", ""), None);
    }
}
