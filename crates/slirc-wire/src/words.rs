//! The `word[]` / `word_eol[]` token views.
//!
//! Every dispatcher in the client core consumes a line as two parallel
//! views: `word(i)` is the i-th space-delimited token and
//! `word_eol(i)` is the substring from token i to the end of the line.
//! Indexing is 1-based with index 0 reserved for the dispatch key, the
//! layout handlers have expected since the RFC 1459 era.
//!
//! Out-of-range access returns `""`, never panics: handlers index
//! speculatively and an absent token is ordinary, not an error.

use smallvec::SmallVec;

/// Maximum number of distinct tokens. The final slot absorbs the rest
/// of the line so nothing is lost on pathological input.
pub const WORD_LIMIT: usize = 32;

/// Borrowed token views over a single line.
#[derive(Clone, Debug)]
pub struct Words<'a> {
    words: SmallVec<[&'a str; 16]>,
    eols: SmallVec<[&'a str; 16]>,
}

impl<'a> Words<'a> {
    /// Split a line into token views.
    ///
    /// Runs of spaces act as a single separator. At most
    /// [`WORD_LIMIT`] tokens are produced; the last one holds the
    /// unsplit remainder.
    pub fn split(line: &'a str) -> Words<'a> {
        let mut words = SmallVec::new();
        let mut eols = SmallVec::new();
        let mut rest = line;
        loop {
            let trimmed = rest.trim_start_matches(' ');
            if trimmed.is_empty() {
                break;
            }
            eols.push(trimmed);
            if words.len() == WORD_LIMIT - 1 {
                words.push(trimmed);
                break;
            }
            match trimmed.find(' ') {
                Some(pos) => {
                    words.push(&trimmed[..pos]);
                    rest = &trimmed[pos + 1..];
                }
                None => {
                    words.push(trimmed);
                    break;
                }
            }
        }
        Words { words, eols }
    }

    /// The i-th token (1-based), or `""` when absent.
    #[inline]
    pub fn word(&self, i: usize) -> &'a str {
        if i == 0 {
            return "";
        }
        self.words.get(i - 1).copied().unwrap_or("")
    }

    /// The substring from token i to end of line (1-based), or `""`.
    #[inline]
    pub fn word_eol(&self, i: usize) -> &'a str {
        if i == 0 {
            return "";
        }
        self.eols.get(i - 1).copied().unwrap_or("")
    }

    /// Number of tokens present.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when the line held no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Owned token views produced by the escape-aware splitter.
///
/// Used when re-splitting a CTCP DCC sub-line, where filenames may be
/// double-quoted and contain backslash-escaped characters.
#[derive(Clone, Debug)]
pub struct WordsOwned {
    words: Vec<String>,
    eols: Vec<String>,
}

impl WordsOwned {
    /// Split a line honoring double quotes and backslash escapes.
    ///
    /// Inside a token, `\x` yields a literal `x` and unescaped `"`
    /// toggles quoting (spaces inside quotes do not split). The
    /// `word_eol` view is the raw, unprocessed remainder so length
    /// accounting against the original line stays possible.
    pub fn split_quoted(line: &str) -> WordsOwned {
        let mut words = Vec::new();
        let mut eols = Vec::new();
        let chars: Vec<(usize, char)> = line.char_indices().collect();
        let mut i = 0;
        while i < chars.len() {
            while i < chars.len() && chars[i].1 == ' ' {
                i += 1;
            }
            if i >= chars.len() {
                break;
            }
            eols.push(line[chars[i].0..].to_string());
            let mut token = String::new();
            let mut quoted = false;
            while i < chars.len() {
                let c = chars[i].1;
                if c == '\\' && i + 1 < chars.len() {
                    token.push(chars[i + 1].1);
                    i += 2;
                } else if c == '"' {
                    quoted = !quoted;
                    i += 1;
                } else if c == ' ' && !quoted {
                    break;
                } else {
                    token.push(c);
                    i += 1;
                }
            }
            words.push(token);
            if words.len() == WORD_LIMIT {
                break;
            }
        }
        WordsOwned { words, eols }
    }

    /// The i-th token (1-based), or `""` when absent.
    pub fn word(&self, i: usize) -> &str {
        if i == 0 {
            return "";
        }
        self.words.get(i - 1).map(String::as_str).unwrap_or("")
    }

    /// The raw remainder from token i (1-based), or `""`.
    pub fn word_eol(&self, i: usize) -> &str {
        if i == 0 {
            return "";
        }
        self.eols.get(i - 1).map(String::as_str).unwrap_or("")
    }

    /// Number of tokens present.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when the line held no tokens at all.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_split() {
        let w = Words::split(":srv 001 me :Welcome home");
        assert_eq!(w.word(1), ":srv");
        assert_eq!(w.word(2), "001");
        assert_eq!(w.word(3), "me");
        assert_eq!(w.word(4), ":Welcome");
        assert_eq!(w.word_eol(4), ":Welcome home");
        assert_eq!(w.word_eol(1), ":srv 001 me :Welcome home");
    }

    #[test]
    fn test_out_of_range_is_empty() {
        let w = Words::split("PING");
        assert_eq!(w.word(0), "");
        assert_eq!(w.word(2), "");
        assert_eq!(w.word_eol(9), "");
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_space_runs() {
        let w = Words::split("a   b  c");
        assert_eq!(w.word(2), "b");
        assert_eq!(w.word(3), "c");
        assert_eq!(w.word_eol(2), "b  c");
    }

    #[test]
    fn test_word_limit_absorbs_rest() {
        let line = (0..40).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let w = Words::split(&line);
        assert_eq!(w.len(), WORD_LIMIT);
        assert_eq!(w.word(31), "30");
        // Final slot keeps the remainder intact
        assert_eq!(w.word(32), "31 32 33 34 35 36 37 38 39");
    }

    #[test]
    fn test_empty_line() {
        let w = Words::split("");
        assert!(w.is_empty());
        assert_eq!(w.word(1), "");
    }

    #[test]
    fn test_quoted_split() {
        let w = WordsOwned::split_quoted(r#"DCC SEND "my file.txt" 12345 6667 100"#);
        assert_eq!(w.word(1), "DCC");
        assert_eq!(w.word(2), "SEND");
        assert_eq!(w.word(3), "my file.txt");
        assert_eq!(w.word(4), "12345");
    }

    #[test]
    fn test_escaped_quote() {
        let w = WordsOwned::split_quoted(r#"SEND "odd \" name" x"#);
        assert_eq!(w.word(2), "odd \" name");
        assert_eq!(w.word(3), "x");
    }

    #[test]
    fn test_quoted_eol_is_raw() {
        let w = WordsOwned::split_quoted(r#"A "b c" d"#);
        assert_eq!(w.word_eol(2), r#""b c" d"#);
    }
}
