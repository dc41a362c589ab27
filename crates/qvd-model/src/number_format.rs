use serde::{Deserialize, Serialize};

/// Declarative interpretation of a column's dual values.
///
/// The kind never changes how symbols are stored, only how their display
/// component is (re)generated at the file boundary and which header tags a
/// writer attaches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    #[default]
    Unknown,
    Ascii,
    Integer,
    Real,
    Date,
    Time,
    Timestamp,
    Interval,
    Money,
}

impl FormatKind {
    /// The `Type` element text used in the QVD header.
    pub fn as_str(self) -> &'static str {
        match self {
            FormatKind::Unknown => "UNKNOWN",
            FormatKind::Ascii => "ASCII",
            FormatKind::Integer => "INTEGER",
            FormatKind::Real => "REAL",
            FormatKind::Date => "DATE",
            FormatKind::Time => "TIME",
            FormatKind::Timestamp => "TIMESTAMP",
            FormatKind::Interval => "INTERVAL",
            FormatKind::Money => "MONEY",
        }
    }

    /// Parse a header `Type` element. Unrecognized kinds map to `Unknown`
    /// so files from newer producers still load.
    pub fn parse(text: &str) -> FormatKind {
        match text {
            "ASCII" => FormatKind::Ascii,
            "INTEGER" => FormatKind::Integer,
            "REAL" => FormatKind::Real,
            "DATE" => FormatKind::Date,
            "TIME" => FormatKind::Time,
            "TIMESTAMP" => FormatKind::Timestamp,
            "INTERVAL" => FormatKind::Interval,
            "MONEY" => FormatKind::Money,
            _ => FormatKind::Unknown,
        }
    }
}

/// Per-column number format descriptor, mirroring the header's
/// `NumberFormat` element (`Type`, `nDec`, `UseThou`, `Fmt`, `Dec`, `Thou`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    pub kind: FormatKind,
    pub n_dec: u32,
    pub use_thou: u32,
    pub fmt: String,
    pub dec: String,
    pub thou: String,
}

impl NumberFormat {
    /// A format of the given kind with a pattern and no separator overrides.
    pub fn with_pattern(kind: FormatKind, fmt: impl Into<String>) -> Self {
        NumberFormat {
            kind,
            fmt: fmt.into(),
            ..NumberFormat::default()
        }
    }
}
