//! Roster sheet parsing: CSV decoding, header recognition, row validation.
//!
//! Headers are matched case-insensitively after stripping everything
//! non-alphanumeric, against a fixed synonym table — "Reg No",
//! "registration number" and "REGNO" all land on the same column.

use crate::error::IngestError;
use crate::platform::Platform;

/// Minimal CSV parser (quotes + CRLF tolerant).
pub fn parse_rows(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                if in_quotes {
                    if matches!(chars.peek(), Some('"')) {
                        chars.next(); // double-quote escape
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            ',' if !in_quotes => {
                row.push(std::mem::take(&mut field));
            }
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(std::mem::take(&mut field));
                if row.iter().any(|c| !c.trim().is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    row.push(field);
    if row.iter().any(|c| !c.trim().is_empty()) {
        rows.push(row);
    }
    rows
}

/// Decode an uploaded roster file into rows of cells.
pub fn parse_sheet(bytes: &[u8]) -> Result<Vec<Vec<String>>, IngestError> {
    let text = std::str::from_utf8(bytes).map_err(|_| IngestError::InvalidEncoding)?;
    // Strip a UTF-8 BOM; spreadsheet exports love to prepend one.
    Ok(parse_rows(text.trim_start_matches('\u{feff}')))
}

/// Lowercase and drop everything that isn't a letter or digit.
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

const NAME_ALIASES: &[&str] = &["name", "studentname", "student"];
const REG_ALIASES: &[&str] = &[
    "regno",
    "registerno",
    "registernumber",
    "registrationnumber",
    "reg",
];
const DEPT_ALIASES: &[&str] = &["dept", "department", "branch"];
const LEETCODE_ALIASES: &[&str] = &[
    "leetcode",
    "leetcodelink",
    "leetcodeprofile",
    "leetcodelinkurl",
];
const CODECHEF_ALIASES: &[&str] = &["codechef", "codecheflink", "codechefprofile"];
const GFG_ALIASES: &[&str] = &[
    "geeksforgeeks",
    "gfg",
    "geeksforgeekslink",
    "gfglink",
    "geeksforgeeksprofile",
];

fn find_column(header: &[String], aliases: &[&str]) -> Option<usize> {
    header
        .iter()
        .position(|h| aliases.contains(&normalize_header(h).as_str()))
}

/// Which column holds which field.
#[derive(Debug)]
pub struct ColumnMap {
    pub name: usize,
    pub reg: usize,
    pub dept: Option<usize>,
    pub leetcode: Option<usize>,
    pub codechef: Option<usize>,
    pub geeksforgeeks: Option<usize>,
}

impl ColumnMap {
    /// Resolve the header row. Name and registration number are required;
    /// everything else is optional.
    pub fn from_header(header: &[String]) -> Result<Self, IngestError> {
        Ok(Self {
            name: find_column(header, NAME_ALIASES)
                .ok_or(IngestError::MissingColumn("name"))?,
            reg: find_column(header, REG_ALIASES)
                .ok_or(IngestError::MissingColumn("registration number"))?,
            dept: find_column(header, DEPT_ALIASES),
            leetcode: find_column(header, LEETCODE_ALIASES),
            codechef: find_column(header, CODECHEF_ALIASES),
            geeksforgeeks: find_column(header, GFG_ALIASES),
        })
    }

    fn link_column(&self, platform: Platform) -> Option<usize> {
        match platform {
            Platform::Leetcode => self.leetcode,
            Platform::Codechef => self.codechef,
            Platform::Geeksforgeeks => self.geeksforgeeks,
        }
    }
}

/// One validated roster row with its recognized platform links.
#[derive(Debug, Clone)]
pub struct RosterRow {
    pub name: String,
    pub reg_number: String,
    pub dept: String,
    pub links: Vec<(Platform, String)>,
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("").trim()
}

/// Parse and validate data rows against the header. Invalid rows are
/// reported, not fatal.
pub fn parse_roster(rows: &[Vec<String>]) -> Result<(Vec<RosterRow>, Vec<String>), IngestError> {
    let header = rows.first().ok_or(IngestError::EmptySheet)?;
    let columns = ColumnMap::from_header(header)?;

    let mut accepted = Vec::new();
    let mut errors = Vec::new();

    for (i, row) in rows.iter().enumerate().skip(1) {
        // 1-based, counting the header, matching what the user sees in a
        // spreadsheet
        let row_no = i + 1;

        let name = cell(row, columns.name);
        if name.is_empty() {
            errors.push(format!("Row {row_no}: name is blank"));
            continue;
        }

        let reg_digits: String = cell(row, columns.reg)
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        if reg_digits.len() != 12 {
            errors.push(format!(
                "Row {row_no}: registration number must be exactly 12 digits"
            ));
            continue;
        }

        let dept = columns.dept.map(|c| cell(row, c)).unwrap_or("");

        let mut links = Vec::new();
        for platform in Platform::ALL {
            if let Some(col) = columns.link_column(platform) {
                let link = cell(row, col);
                if !link.is_empty() {
                    links.push((platform, link.to_string()));
                }
            }
        }

        accepted.push(RosterRow {
            name: name.to_string(),
            reg_number: reg_digits,
            dept: dept.to_string(),
            links,
        });
    }

    Ok((accepted, errors))
}
