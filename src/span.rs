//! Declaration span location and lexical noise masking.
//!
//! Every scanner relies on the same small lexer: given a [`Syntax`], it knows
//! where comments and string literals start and end so that braces, keywords
//! and quotes inside them are never mistaken for code. Spans returned here are
//! consumed by callers that rewrite a single declaration in place, so an off
//! span corrupts unrelated code. When a span cannot be determined exactly the
//! functions fall back to the single declaration line rather than guessing.

/// How a single quote character is lexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleQuote {
    /// `'...'` is a string with backslash escapes (C-like, C#, Python, JS).
    String,
    /// `'x'` is a char literal, anything else (`'a` lifetimes, labels) is code.
    CharOrLifetime,
}

/// How a backtick is lexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backtick {
    None,
    /// Raw string without escapes (Go).
    Raw,
    /// Template literal with backslash escapes (JavaScript/TypeScript).
    Template,
}

/// Lexical conventions of one language family.
#[derive(Debug, Clone, Copy)]
pub struct Syntax {
    pub line_comments: &'static [&'static str],
    pub block_comment: Option<(&'static str, &'static str)>,
    pub nested_block_comments: bool,
    pub single_quote: SingleQuote,
    pub backtick: Backtick,
    /// Quote characters that open `"""`-style strings.
    pub triple_quotes: &'static [u8],
    /// `r"..."`, `r#"..."#`, `br"..."`.
    pub raw_strings: bool,
    /// `@"..."` with `""` as the escaped quote.
    pub verbatim_strings: bool,
    /// Plain `"..."` strings may contain raw newlines.
    pub multiline_strings: bool,
    /// The opening brace of a declaration body must be on the declaration line.
    pub brace_on_declaration_line: bool,
}

impl Syntax {
    pub const C_LIKE: Syntax = Syntax {
        line_comments: &["//"],
        block_comment: Some(("/*", "*/")),
        nested_block_comments: false,
        single_quote: SingleQuote::String,
        backtick: Backtick::None,
        triple_quotes: &[],
        raw_strings: false,
        verbatim_strings: false,
        multiline_strings: false,
        brace_on_declaration_line: false,
    };

    pub const RUST: Syntax = Syntax {
        nested_block_comments: true,
        single_quote: SingleQuote::CharOrLifetime,
        raw_strings: true,
        multiline_strings: true,
        ..Syntax::C_LIKE
    };

    pub const CSHARP: Syntax = Syntax {
        triple_quotes: b"\"",
        verbatim_strings: true,
        ..Syntax::C_LIKE
    };

    pub const GO: Syntax = Syntax {
        single_quote: SingleQuote::CharOrLifetime,
        backtick: Backtick::Raw,
        brace_on_declaration_line: true,
        ..Syntax::C_LIKE
    };

    pub const JAVASCRIPT: Syntax = Syntax {
        backtick: Backtick::Template,
        ..Syntax::C_LIKE
    };

    pub const PYTHON: Syntax = Syntax {
        line_comments: &["#"],
        block_comment: None,
        triple_quotes: b"\"'",
        ..Syntax::C_LIKE
    };
}

impl Default for Syntax {
    fn default() -> Self {
        Syntax::C_LIKE
    }
}

/// 1-based line number of `offset`; offsets past the end clamp to the last line.
pub fn line_of_offset(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Line number of the last line holding content (a trailing newline does not
/// start a new line).
pub fn last_line(text: &str) -> usize {
    let trimmed = text.strip_suffix('\n').unwrap_or(text);
    line_of_offset(trimmed, trimmed.len())
}

/// Offset of the `}` closing the `{` at `open_brace_offset`, using C-like lexing.
pub fn matching_brace_offset(text: &str, open_brace_offset: usize) -> Option<usize> {
    matching_close_offset(text, open_brace_offset, &Syntax::C_LIKE)
}

/// Offset of the bracket closing the `{`, `(` or `[` at `open_offset`.
///
/// Depth starts at 1 after the opening bracket; brackets inside comments and
/// string literals are ignored. Returns `None` when `open_offset` is not an
/// opening bracket or the text ends first.
pub fn matching_close_offset(text: &str, open_offset: usize, syntax: &Syntax) -> Option<usize> {
    let bytes = text.as_bytes();
    let (open, close) = match bytes.get(open_offset)? {
        b'{' => (b'{', b'}'),
        b'(' => (b'(', b')'),
        b'[' => (b'[', b']'),
        _ => return None,
    };

    let mut depth = 1usize;
    let mut i = open_offset + 1;
    while i < bytes.len() {
        if let Some(end) = skip_noise(bytes, i, syntax) {
            i = end;
            continue;
        }
        let b = bytes[i];
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// `(start_line, end_line)` of the brace-delimited declaration starting at
/// `declaration_offset`, using C-like lexing.
pub fn declaration_span(text: &str, declaration_offset: usize) -> (usize, usize) {
    declaration_span_with(text, declaration_offset, &Syntax::C_LIKE)
}

/// `(start_line, end_line)` of the declaration starting at `declaration_offset`.
///
/// The body is the first `{` after the offset that is not inside a comment,
/// string or generic argument list. A top-level `;` before any brace (unit
/// structs, positional records) or, for [`Syntax::brace_on_declaration_line`],
/// the end of the declaration line means there is no body and the span is the
/// declaration line alone. An unmatched opening brace yields the same.
pub fn declaration_span_with(
    text: &str,
    declaration_offset: usize,
    syntax: &Syntax,
) -> (usize, usize) {
    let start = line_of_offset(text, declaration_offset);
    match body_open_offset(text, declaration_offset, syntax) {
        Some(open) => match matching_close_offset(text, open, syntax) {
            Some(close) => (start, line_of_offset(text, close)),
            None => (start, start),
        },
        None => (start, start),
    }
}

/// Offset of the `{` opening the body of the declaration at `declaration_offset`.
pub fn body_open_offset(text: &str, declaration_offset: usize, syntax: &Syntax) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = declaration_offset;
    let mut paren_depth = 0usize;
    let mut angle_depth = 0usize;

    while i < bytes.len() {
        if let Some(end) = skip_noise(bytes, i, syntax) {
            // A line comment ends at the newline, which the same-line rule must still see.
            i = end;
            continue;
        }
        match bytes[i] {
            b'{' if angle_depth == 0 => return Some(i),
            b'(' | b'[' => paren_depth += 1,
            b')' | b']' => paren_depth = paren_depth.saturating_sub(1),
            b'<' => angle_depth += 1,
            b'>' => {
                let arrow = i > 0 && matches!(bytes[i - 1], b'-' | b'=');
                if !arrow {
                    angle_depth = angle_depth.saturating_sub(1);
                }
            }
            b';' if paren_depth == 0 => return None,
            b'\n' if syntax.brace_on_declaration_line => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

/// `(start_line, end_line)` of an indentation-delimited block such as a Python
/// class. The header ends at the first top-level `:`; the block covers every
/// following line indented deeper than the declaration line, including
/// continuation lines of multi-line strings. Trailing blank and comment lines
/// are not part of the block.
pub fn indented_block_span(text: &str, declaration_offset: usize, syntax: &Syntax) -> (usize, usize) {
    let start = line_of_offset(text, declaration_offset);
    let masked = mask_noise(text, syntax);
    let masked_bytes = masked.as_bytes();

    let mut header_end = None;
    let mut depth = 0usize;
    for (i, &b) in masked_bytes.iter().enumerate().skip(declaration_offset) {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b':' if depth == 0 => {
                header_end = Some(i);
                break;
            }
            _ => {}
        }
    }
    let Some(header_end) = header_end else {
        return (start, start);
    };

    let header_line = line_of_offset(text, header_end);
    let line_start = masked[..declaration_offset]
        .rfind('\n')
        .map(|p| p + 1)
        .unwrap_or(0);
    let decl_indent = indentation(&masked[line_start..]);

    let rest_of_header = masked[header_end + 1..].split('\n').next().unwrap_or("");
    if !rest_of_header.trim().is_empty() {
        return (start, header_line);
    }

    let mut end = header_line;
    let original_lines = text.split('\n').skip(header_line);
    let masked_lines = masked.split('\n').skip(header_line);
    for (offset, (original, masked_line)) in original_lines.zip(masked_lines).enumerate() {
        let line_no = header_line + 1 + offset;
        let original_trim = original.trim();
        if original_trim.is_empty() {
            continue;
        }
        if masked_line.trim().is_empty() {
            if !original_trim.starts_with('#') {
                end = line_no;
            }
            continue;
        }
        if indentation(masked_line) <= decl_indent {
            break;
        }
        end = line_no;
    }
    (start, end)
}

/// Copy of `text` with every comment and string literal replaced by spaces.
/// Newlines are kept, so byte offsets and line numbers stay valid.
pub fn mask_noise(text: &str, syntax: &Syntax) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if let Some(end) = skip_noise(bytes, i, syntax) {
            out.extend(
                bytes[i..end]
                    .iter()
                    .map(|&b| if b == b'\n' { b'\n' } else { b' ' }),
            );
            i = end;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

fn indentation(line: &str) -> usize {
    line.bytes()
        .take_while(|b| *b == b' ' || *b == b'\t')
        .map(|b| if b == b'\t' { 4 } else { 1 })
        .sum()
}

/// If a comment or string literal starts at `i`, the offset just past its end.
/// Line comments end at (not after) their newline.
fn skip_noise(bytes: &[u8], i: usize, syntax: &Syntax) -> Option<usize> {
    let rest = &bytes[i..];

    for prefix in syntax.line_comments {
        if rest.starts_with(prefix.as_bytes()) {
            let end = rest
                .iter()
                .position(|&b| b == b'\n')
                .map(|p| i + p)
                .unwrap_or(bytes.len());
            return Some(end);
        }
    }

    if let Some((open, close)) = syntax.block_comment {
        if rest.starts_with(open.as_bytes()) {
            return Some(skip_block_comment(bytes, i, open, close, syntax.nested_block_comments));
        }
    }

    if syntax.raw_strings {
        if let Some(end) = skip_raw_string(bytes, i) {
            return Some(end);
        }
    }

    if syntax.verbatim_strings {
        let body = if rest.starts_with(b"@\"") {
            Some(i + 2)
        } else if rest.starts_with(b"@$\"") || rest.starts_with(b"$@\"") {
            Some(i + 3)
        } else {
            None
        };
        if let Some(body) = body {
            return Some(skip_verbatim(bytes, body));
        }
    }

    let b = bytes[i];
    if syntax.triple_quotes.contains(&b) && rest.len() >= 3 && rest[1] == b && rest[2] == b {
        return Some(skip_triple_quoted(bytes, i, b));
    }

    match b {
        b'"' => Some(skip_quoted(bytes, i + 1, b'"', syntax.multiline_strings, true)),
        b'\'' => match syntax.single_quote {
            SingleQuote::String => Some(skip_quoted(bytes, i + 1, b'\'', false, true)),
            SingleQuote::CharOrLifetime => skip_char_literal(bytes, i),
        },
        b'`' => match syntax.backtick {
            Backtick::None => None,
            Backtick::Raw => Some(skip_quoted(bytes, i + 1, b'`', true, false)),
            Backtick::Template => Some(skip_quoted(bytes, i + 1, b'`', true, true)),
        },
        _ => None,
    }
}

fn skip_block_comment(bytes: &[u8], i: usize, open: &str, close: &str, nested: bool) -> usize {
    let (open, close) = (open.as_bytes(), close.as_bytes());
    let mut depth = 1usize;
    let mut j = i + open.len();
    while j < bytes.len() {
        if nested && bytes[j..].starts_with(open) {
            depth += 1;
            j += open.len();
        } else if bytes[j..].starts_with(close) {
            depth -= 1;
            j += close.len();
            if depth == 0 {
                return j;
            }
        } else {
            j += 1;
        }
    }
    bytes.len()
}

/// Ends at the closing quote, or at the newline for single-line literals.
fn skip_quoted(bytes: &[u8], mut j: usize, quote: u8, multiline: bool, escapes: bool) -> usize {
    while j < bytes.len() {
        match bytes[j] {
            b'\\' if escapes => j += 2,
            b'\n' if !multiline => return j,
            b if b == quote => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

fn skip_triple_quoted(bytes: &[u8], i: usize, quote: u8) -> usize {
    let run = bytes[i..].iter().take_while(|&&b| b == quote).count();
    let mut j = i + run;
    while j < bytes.len() {
        if bytes[j] == b'\\' {
            j += 2;
            continue;
        }
        if bytes[j] == quote {
            let closing = bytes[j..].iter().take_while(|&&b| b == quote).count();
            if closing >= run {
                return j + closing;
            }
            j += closing;
            continue;
        }
        j += 1;
    }
    bytes.len()
}

fn skip_verbatim(bytes: &[u8], mut j: usize) -> usize {
    while j < bytes.len() {
        if bytes[j] == b'"' {
            if bytes.get(j + 1) == Some(&b'"') {
                j += 2;
                continue;
            }
            return j + 1;
        }
        j += 1;
    }
    bytes.len()
}

fn skip_raw_string(bytes: &[u8], i: usize) -> Option<usize> {
    if i > 0 && is_ident_byte(bytes[i - 1]) {
        return None;
    }
    let mut j = i;
    if bytes.get(j) == Some(&b'b') {
        j += 1;
    }
    if bytes.get(j) != Some(&b'r') {
        return None;
    }
    j += 1;
    let hashes = bytes[j..].iter().take_while(|&&b| b == b'#').count();
    j += hashes;
    if bytes.get(j) != Some(&b'"') {
        return None;
    }
    j += 1;
    while j < bytes.len() {
        if bytes[j] == b'"' && bytes[j + 1..].iter().take(hashes).filter(|&&b| b == b'#').count() == hashes {
            return Some(j + 1 + hashes);
        }
        j += 1;
    }
    Some(bytes.len())
}

/// `'x'`, `'\n'`, `'\u{1F600}'` are literals; `'a` and `'label:` are code.
fn skip_char_literal(bytes: &[u8], i: usize) -> Option<usize> {
    let next = *bytes.get(i + 1)?;
    if next == b'\\' {
        let limit = (i + 12).min(bytes.len());
        let mut j = i + 3;
        while j < limit {
            if bytes[j] == b'\'' {
                return Some(j + 1);
            }
            j += 1;
        }
        return None;
    }
    let width = utf8_width(next);
    if bytes.get(i + 1 + width) == Some(&b'\'') {
        return Some(i + 2 + width);
    }
    None
}

fn utf8_width(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
