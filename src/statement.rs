//! Statement helpers: prefix extraction, default classification and the
//! buffer that turns input lines into complete statements.

/// Number of leading words kept in a statement prefix.
pub const PREFIX_WORDS: usize = 4;

/// Statement types that return rows.
const QUERY_WORDS: &[&str] = &[
    "SELECT", "WITH", "VALUES", "TABLE", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "PRAGMA",
];

/// Statement types whose kind includes the object keyword, e.g. `CREATE TABLE`.
const OBJECT_WORDS: &[&str] = &["CREATE", "DROP", "ALTER"];

/// Returns the first `n` words of `sql`, upper-cased and separated by single
/// spaces. Leading whitespace and comments are skipped.
pub fn prefix(sql: &str, n: usize) -> String {
    let mut words: Vec<String> = Vec::with_capacity(n);
    let mut rest = sql;
    while words.len() < n {
        rest = skip_comments(rest);
        if rest.is_empty() {
            break;
        }
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if end == 0 {
            // punctuation such as `(` or `;` ends the prefix
            break;
        }
        words.push(rest[..end].to_uppercase());
        rest = &rest[end..];
    }
    words.join(" ")
}

fn skip_comments(mut s: &str) -> &str {
    loop {
        s = s.trim_start();
        if let Some(after) = s.strip_prefix("--") {
            s = after.find('\n').map_or("", |i| &after[i + 1..]);
        } else if let Some(after) = s.strip_prefix("/*") {
            s = after.find("*/").map_or("", |i| &after[i + 2..]);
        } else {
            return s;
        }
    }
}

/// Classifies a statement from its prefix, returning the statement type and
/// whether it returns rows.
pub fn query_exec_type(prefix_str: &str, sql: &str) -> (String, bool) {
    let computed;
    let prefix_str = if prefix_str.trim().is_empty() {
        computed = prefix(sql, PREFIX_WORDS);
        computed.as_str()
    } else {
        prefix_str
    };

    let words: Vec<&str> = prefix_str.split_whitespace().collect();
    let first = match words.first() {
        Some(first) => *first,
        None => return ("EXEC".to_string(), false),
    };
    let kind = match words.get(1) {
        Some(second) if OBJECT_WORDS.contains(&first) => format!("{} {}", first, second),
        _ => first.to_string(),
    };
    (kind, QUERY_WORDS.contains(&first))
}

/// Transaction control expressed in raw SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionControl {
    Begin,
    Commit,
    Rollback,
}

/// Detects statements that open or close a transaction.
pub fn transaction_control(prefix_str: &str) -> Option<TransactionControl> {
    let mut words = prefix_str.split_whitespace();
    match (words.next()?, words.next()) {
        ("BEGIN", _) => Some(TransactionControl::Begin),
        ("START", Some("TRANSACTION")) => Some(TransactionControl::Begin),
        ("COMMIT", _) | ("END", None) | ("END", Some("TRANSACTION")) => {
            Some(TransactionControl::Commit)
        }
        ("ROLLBACK", Some("TO")) => None,
        ("ROLLBACK", _) | ("ABORT", _) => Some(TransactionControl::Rollback),
        _ => None,
    }
}

/// Accumulates input lines until a `;` outside quotes and comments ends a
/// statement. The terminator is kept in the statement text.
///
/// `--` comments are always recognised; `/* */` and `//` depend on the
/// active driver.
#[derive(Debug, Clone)]
pub struct StatementBuffer {
    buf: String,
    /// Whether `buf` holds anything besides whitespace and comments
    has_code: bool,
    quote: Option<char>,
    in_block_comment: bool,
    allow_multiline_comments: bool,
    allow_c_comments: bool,
}

impl Default for StatementBuffer {
    fn default() -> Self {
        StatementBuffer::new(true, false)
    }
}

impl StatementBuffer {
    pub fn new(allow_multiline_comments: bool, allow_c_comments: bool) -> Self {
        StatementBuffer {
            buf: String::new(),
            has_code: false,
            quote: None,
            in_block_comment: false,
            allow_multiline_comments,
            allow_c_comments,
        }
    }

    /// True when no partial statement is pending. Pending comments do not
    /// count, unless a block comment is still open.
    pub fn is_empty(&self) -> bool {
        !self.has_code && !self.in_block_comment
    }

    /// Appends a line and returns every statement it completed.
    pub fn push_line(&mut self, line: &str) -> Vec<String> {
        let mut complete = Vec::new();
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            if self.in_block_comment {
                self.buf.push(c);
                if c == '*' && next == Some('/') {
                    self.buf.push('/');
                    self.in_block_comment = false;
                    i += 1;
                }
            } else if let Some(q) = self.quote {
                self.buf.push(c);
                if c == q {
                    self.quote = None;
                }
            } else if (c == '-' && next == Some('-'))
                || (self.allow_c_comments && c == '/' && next == Some('/'))
            {
                // line comment runs to the end of the line
                self.buf.extend(&chars[i..]);
                break;
            } else if self.allow_multiline_comments && c == '/' && next == Some('*') {
                self.buf.push_str("/*");
                self.in_block_comment = true;
                i += 1;
            } else if c == '\'' || c == '"' || c == '`' {
                self.buf.push(c);
                self.quote = Some(c);
                self.has_code = true;
            } else if c == ';' {
                self.buf.push(c);
                let stmt = self.buf.trim().to_string();
                self.buf.clear();
                if self.has_code {
                    complete.push(stmt);
                }
                self.has_code = false;
            } else {
                self.buf.push(c);
                self.has_code |= !c.is_whitespace();
            }
            i += 1;
        }

        // comment-only text is not part of any statement
        if self.is_empty() {
            self.buf.clear();
        }
        if !self.buf.is_empty() {
            self.buf.push('\n');
        }
        complete
    }

    /// Takes whatever is pending as a final, unterminated statement.
    /// Returns `None` when only comments are pending.
    pub fn finish(&mut self) -> Option<String> {
        let stmt = self.buf.trim().to_string();
        let has_code = self.has_code;
        self.buf.clear();
        self.has_code = false;
        self.quote = None;
        self.in_block_comment = false;
        has_code.then_some(stmt)
    }
}
