//! Extracted rows and their per-task column schemas.

use serde::Serialize;
use tracing::debug;

/// One extracted record: string fields in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ExtractedRow(Vec<String>);

impl ExtractedRow {
    pub fn new(fields: Vec<String>) -> Self {
        Self(fields)
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn into_fields(self) -> Vec<String> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy of this row with `value` inserted as the first field.
    pub fn prepended(&self, value: &str) -> Self {
        let mut fields = Vec::with_capacity(self.0.len() + 1);
        fields.push(value.to_string());
        fields.extend(self.0.iter().cloned());
        Self(fields)
    }
}

impl<S: Into<String>> FromIterator<S> for ExtractedRow {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Fixed column layout of a table kind, and the file stem it is written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

pub const TRADE_SUMMARY: TableSchema = TableSchema {
    name: "trades",
    columns: &[
        "Trade Date",
        "High/Low Price",
        "High/Low Yield",
        "Trade Count",
        "Total Trade Amount",
    ],
};

pub const DISCLOSURES: TableSchema = TableSchema {
    name: "disclosures",
    columns: &["Document", "Posted Date"],
};

pub const FINAL_SCALE: TableSchema = TableSchema {
    name: "final_scale",
    columns: &["CUSIP", "Principal", "Coupon", "Maturity", "Ratings"],
};

pub const ISSUERS: TableSchema = TableSchema {
    name: "issuers",
    columns: &["Issuer Name", "Issuer ID", "Issuer Type"],
};

pub const ISSUERS_BY_STATE: TableSchema = TableSchema {
    name: "issuers",
    columns: &["State", "Issuer Name", "Issuer ID", "Issuer Type"],
};

pub const ISSUES: TableSchema = TableSchema {
    name: "issues",
    columns: &["Issue ID", "Issue Description", "Dated Date", "Maturity Dates"],
};

pub const SECURITIES: TableSchema = TableSchema {
    name: "securities",
    columns: &[
        "CUSIP",
        "Principal Amount at Issuance ($)",
        "Security Description",
        "Coupon",
        "Maturity Date",
        "Price/Yield",
        "Price",
        "Yield",
        "Fitch",
        "KBRA",
        "Moody's",
        "S&P",
    ],
};

/// Rows plus the header they are written under.
///
/// Every row pushed is conformed to the header width, so column count and
/// order never depend on how many pages were traversed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<ExtractedRow>,
}

impl Table {
    pub fn new(schema: TableSchema) -> Self {
        Self::with_columns(
            schema.name,
            schema.columns.iter().map(|c| c.to_string()).collect(),
        )
    }

    /// Table with a header discovered at scrape time.
    pub fn with_columns(name: &str, columns: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(schema: TableSchema, rows: impl IntoIterator<Item = ExtractedRow>) -> Self {
        let mut table = Self::new(schema);
        table.extend(rows);
        table
    }

    pub fn push(&mut self, row: ExtractedRow) {
        let width = self.columns.len();
        let mut fields = row.into_fields();
        if width > 0 && fields.len() != width {
            debug!(
                "Conforming {}-field row to {} columns of '{}'",
                fields.len(),
                width,
                self.name
            );
            fields.resize(width, String::new());
        }
        self.rows.push(ExtractedRow::new(fields));
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = ExtractedRow>) {
        for row in rows {
            self.push(row);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name)
    }
}

/// Normalize a verbatim source header into a field name:
/// trimmed, lowercased, spaces replaced by underscores.
pub fn normalize_field_name(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_conformed_to_schema_width() {
        let mut table = Table::new(DISCLOSURES);
        table.push(ExtractedRow::from_iter(["a"]));
        table.push(ExtractedRow::from_iter(["b", "c", "extra"]));
        assert!(table.rows.iter().all(|r| r.len() == 2));
        assert_eq!(table.rows[1].fields(), ["b", "c"]);
    }

    #[test]
    fn prepend_keeps_order() {
        let row = ExtractedRow::from_iter(["Anchorage", "123", "Issuer"]);
        assert_eq!(
            row.prepended("AK").fields(),
            ["AK", "Anchorage", "123", "Issuer"]
        );
    }

    #[test]
    fn field_names_are_normalized() {
        assert_eq!(normalize_field_name(" Volume Nominal "), "volume_nominal");
        assert_eq!(normalize_field_name("Date"), "date");
    }
}
