use super::fields;

/// How a row defect is treated by the parser that found it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Engine output: a bad row only discards the block it belongs to
    Tolerant,
    /// Import: a bad row rejects the whole document
    Strict,
}

impl Strictness {
    pub fn reject(self, defect: RowDefect) -> RowOutcome {
        match self {
            Strictness::Tolerant => RowOutcome::Skip(defect),
            Strictness::Strict => RowOutcome::Fail(defect),
        }
    }
}

/// Why a row was not accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowDefect {
    /// A field is not an integer (header or prose line)
    NotNumeric { field: usize, text: String },
    /// Field count differs from the expected width
    WrongWidth { expected: usize, found: usize },
    /// An integer outside the allowed domain for its field
    OutOfDomain { field: usize, value: i64 },
}

impl std::fmt::Display for RowDefect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowDefect::NotNumeric { field, text } => {
                write!(f, "field {} ({:?}) is not an integer", field + 1, text)
            }
            RowDefect::WrongWidth { expected, found } => {
                write!(f, "expected {} fields, found {}", expected, found)
            }
            RowDefect::OutOfDomain { field, value } => {
                write!(f, "field {} has invalid value {}", field + 1, value)
            }
        }
    }
}

/// Result of the row classification step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Accepted(Vec<i64>),
    Skip(RowDefect),
    Fail(RowDefect),
}

/// Classify one protocol line as a row of exactly `width` integers, each
/// accepted by `in_domain(field_index, value)`.
///
/// Fields may be separated by whitespace, commas or semicolons. Defects are
/// reported as `Skip` or `Fail` depending on `strictness`.
pub fn classify_row<F>(line: &str, width: usize, strictness: Strictness, in_domain: F) -> RowOutcome
where
    F: Fn(usize, i64) -> bool,
{
    let mut values = Vec::with_capacity(width);
    for (field, text) in fields(line).enumerate() {
        match text.parse::<i64>() {
            Ok(value) => values.push(value),
            Err(_) => {
                return strictness.reject(RowDefect::NotNumeric {
                    field,
                    text: text.to_string(),
                })
            }
        }
    }

    if values.len() != width {
        return strictness.reject(RowDefect::WrongWidth {
            expected: width,
            found: values.len(),
        });
    }

    if let Some((field, &value)) = values
        .iter()
        .enumerate()
        .find(|(field, value)| !in_domain(*field, **value))
    {
        return strictness.reject(RowDefect::OutOfDomain { field, value });
    }

    RowOutcome::Accepted(values)
}
