//! Pull-based line reader with pushback and scan combinators.
//!
//! Every block routine in the compiler reads its lines through this cursor:
//! a routine consumes lines while they match its own pattern and pushes the
//! first non-matching line back for the next dispatch cycle.

/// Cursor over a document's lines offering peek, unlimited pushback, and
/// declarative scan combinators.
///
/// Reading past end of input is idempotent: once exhausted, [`gets`] keeps
/// returning `None` without error.
///
/// [`gets`]: LineCursor::gets
#[derive(Debug)]
pub struct LineCursor<'a> {
    lines: std::str::Lines<'a>,
    pushback: Vec<&'a str>,
    lineno: usize,
    exhausted: bool,
}

impl<'a> LineCursor<'a> {
    /// Creates a cursor positioned before the first line of `text`.
    pub fn new(text: &'a str) -> Self {
        LineCursor {
            lines: text.lines(),
            pushback: Vec::new(),
            lineno: 0,
            exhausted: false,
        }
    }

    /// 1-based number of the most recently consumed line.
    ///
    /// Starts at 0, increments on every [`gets`](LineCursor::gets) that
    /// yields a line, and decrements on [`ungets`](LineCursor::ungets).
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    /// Whether the underlying input has been read to its end.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted && self.pushback.is_empty()
    }

    /// Consumes and returns the next line, most recently pushed-back first.
    ///
    /// Carriage returns left over from CRLF input are stripped.
    pub fn gets(&mut self) -> Option<&'a str> {
        if let Some(line) = self.pushback.pop() {
            self.lineno += 1;
            return Some(line);
        }
        if self.exhausted {
            return None;
        }
        match self.lines.next() {
            Some(line) => {
                self.lineno += 1;
                Some(line.strip_suffix('\r').unwrap_or(line))
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }

    /// Pushes `line` back so the next [`gets`](LineCursor::gets) returns it.
    pub fn ungets(&mut self, line: &'a str) {
        self.lineno = self.lineno.saturating_sub(1);
        self.pushback.push(line);
    }

    /// Returns the next line without consuming it.
    pub fn peek(&mut self) -> Option<&'a str> {
        let line = self.gets()?;
        self.ungets(line);
        Some(line)
    }

    /// Consumes and returns the next line only when `pred` accepts it;
    /// otherwise the line stays available.
    pub fn next_if(&mut self, pred: impl FnOnce(&str) -> bool) -> Option<&'a str> {
        let line = self.gets()?;
        if pred(line) {
            Some(line)
        } else {
            self.ungets(line);
            None
        }
    }

    /// Consumes lines while `pred` matches, returning them in order. The
    /// first non-matching line is left for the next read.
    pub fn span(&mut self, pred: impl Fn(&str) -> bool) -> Vec<&'a str> {
        let mut out = Vec::new();
        while let Some(line) = self.next_if(&pred) {
            out.push(line);
        }
        out
    }

    /// Consumes lines until `pred` matches, returning the consumed lines.
    /// The matching line is left for the next read.
    pub fn take_until(&mut self, pred: impl Fn(&str) -> bool) -> Vec<&'a str> {
        self.span(|line| !pred(line))
    }

    /// Consumes lines until `pred` matches and discards the matching
    /// terminator line, returning everything before it.
    pub fn take_through(&mut self, pred: impl Fn(&str) -> bool) -> Vec<&'a str> {
        let out = self.take_until(&pred);
        self.gets();
        out
    }
}
