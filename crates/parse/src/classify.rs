//! Line classification for Chase statement text dumps.
//!
//! A statement arrives as an ordered sequence of extracted text lines.
//! Two anchor patterns split it into sections: the checking-summary
//! header and the transaction-detail header. Everything after an anchor
//! belongs to that section until the next anchor; page furniture is
//! dropped wherever it appears.

use std::sync::OnceLock;

use regex::Regex;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_summary_header, r"(?i)\bCHECKING\s+SUMMARY\b");
re!(re_ledger_header,
    r"(?i)(\bTRANSACTION\s+DETAIL\b|DATE\W+DESCRIPTION\W+AMOUNT\W+BALANCE)");
re!(re_page_number, r"(?i)^\s*Page\s+\d+(\s+of\s+\d+)?\s*$");
re!(re_boilerplate,
    r"(?i)(JPMorgan\s+Chase|Member\s+FDIC|\(continued\)|Deposit\s+products\s+offered\s+by)");

/// Section tag for one raw line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTag {
    Ledger,
    Summary,
    Ignore,
}

/// The classifier's output: section lines in document order, with
/// furniture removed. Either section may be empty; that is a
/// parse-quality signal for the caller, not an error here.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedLines {
    pub ledger: Vec<String>,
    pub summary: Vec<String>,
}

fn tag_line(line: &str, current: Option<LineTag>) -> LineTag {
    if is_furniture(line) {
        return LineTag::Ignore;
    }
    current.unwrap_or(LineTag::Ignore)
}

fn is_furniture(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || re_page_number().is_match(trimmed)
        || re_boilerplate().is_match(trimmed)
}

/// Forward scan over the document's lines.
pub fn classify_lines<'a, I>(lines: I) -> ClassifiedLines
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = ClassifiedLines::default();
    let mut section: Option<LineTag> = None;

    for line in lines {
        if re_summary_header().is_match(line) {
            section = Some(LineTag::Summary);
            continue;
        }
        if re_ledger_header().is_match(line) {
            section = Some(LineTag::Ledger);
            continue;
        }
        match tag_line(line, section) {
            LineTag::Ledger => out.ledger.push(line.to_string()),
            LineTag::Summary => out.summary.push(line.to_string()),
            LineTag::Ignore => {}
        }
    }

    out
}
