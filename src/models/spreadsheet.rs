use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Single spreadsheet cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Cell {
    /// Empty cells and the not-a-number sentinel carry no value.
    pub fn is_absent(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(n) => n.is_nan(),
            Cell::Text(t) => {
                let trimmed = t.trim();
                trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
            }
            Cell::Bool(_) => false,
        }
    }

    /// Text rendering used for text columns; numbers lose a trailing `.0`.
    pub fn as_text(&self) -> Option<String> {
        if self.is_absent() {
            return None;
        }
        match self {
            Cell::Text(t) => Some(t.trim().to_string()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Empty => None,
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Number(f64::from(value))
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Empty)
    }
}

/// One sheet: its name is the facility type, the first row holds the headers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Sheet {
    pub name: String,
    #[schema(value_type = Vec<Vec<Object>>)]
    pub rows: Vec<Vec<Cell>>,
}

/// Tabular workbook exchanged by the import and export endpoints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Number of candidate facility rows across all sheets
    pub fn data_row_count(&self) -> usize {
        self.sheets
            .iter()
            .map(|sheet| sheet.rows.len().saturating_sub(1))
            .sum()
    }
}

/// Problem with one spreadsheet row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RowError {
    /// Row ordinal: the `№` cell when present, else the 1-based data row position
    pub n: i64,
    /// Sheet the row came from
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: Option<String>,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidationReport {
    pub errors: Vec<RowError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImportedFacility {
    pub id: Uuid,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExportLink {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_deserialize_from_plain_json() {
        let row: Vec<Cell> =
            serde_json::from_str(r#"[null, 12.5, "Стадион", true, "nan"]"#).unwrap();
        assert_eq!(row[0], Cell::Empty);
        assert_eq!(row[1], Cell::Number(12.5));
        assert_eq!(row[2], Cell::Text("Стадион".into()));
        assert_eq!(row[3], Cell::Bool(true));
        assert!(row[4].is_absent());
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(Cell::Number(42.0).as_text().as_deref(), Some("42"));
        assert_eq!(Cell::Number(4.5).as_text().as_deref(), Some("4.5"));
        assert_eq!(Cell::Number(f64::NAN).as_text(), None);
        assert_eq!(Cell::Text("  ".into()).as_text(), None);
    }

    #[test]
    fn header_row_is_not_counted_as_data() {
        let workbook = Workbook {
            sheets: vec![Sheet {
                name: "бассейны".into(),
                rows: vec![vec!["Наименование".into()], vec!["Pool".into()]],
            }],
        };
        assert_eq!(workbook.data_row_count(), 1);
    }
}
