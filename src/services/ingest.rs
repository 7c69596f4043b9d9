//! Upload classification and metadata extraction.

use bytes::Bytes;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use serde_json::Value;
use std::io::Cursor;

use crate::error::AppError;

const CSV_MIME: &str = "text/csv";
const JSON_MIME: &str = "application/json";
const XLS_MIME: &str = "application/vnd.ms-excel";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Csv,
    Json,
    Workbook,
}

impl UploadKind {
    /// Classifies an upload by name first, then by declared mime type.
    pub fn detect(filename: &str, mime_type: &str) -> Option<Self> {
        let name = filename.to_lowercase();
        if name.ends_with(".csv") || mime_type == CSV_MIME {
            Some(UploadKind::Csv)
        } else if name.ends_with(".json") || mime_type == JSON_MIME {
            Some(UploadKind::Json)
        } else if name.ends_with(".xlsx")
            || name.ends_with(".xls")
            || mime_type == XLSX_MIME
            || mime_type == XLS_MIME
        {
            Some(UploadKind::Workbook)
        } else {
            None
        }
    }

    pub fn default_mime(self) -> &'static str {
        match self {
            UploadKind::Csv => CSV_MIME,
            UploadKind::Json => JSON_MIME,
            UploadKind::Workbook => XLSX_MIME,
        }
    }
}

/// Text stored for a dataset, with the metadata shown in listings.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedUpload {
    pub content: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

pub fn prepare_upload(kind: UploadKind, data: Bytes) -> Result<PreparedUpload, AppError> {
    match kind {
        UploadKind::Csv => {
            let content = String::from_utf8_lossy(&data).into_owned();
            Ok(describe_csv(content))
        }
        UploadKind::Json => {
            let content = String::from_utf8_lossy(&data).into_owned();
            describe_json(content)
        }
        UploadKind::Workbook => workbook_to_csv(data).map(describe_csv),
    }
}

fn describe_csv(content: String) -> PreparedUpload {
    let mut lines = content.split('\n').filter(|line| !line.trim().is_empty());
    let columns = lines
        .next()
        .map(|header| {
            header
                .split(',')
                .map(|col| col.trim().replace('"', ""))
                .collect()
        })
        .unwrap_or_default();
    let row_count = lines.count();

    PreparedUpload {
        content,
        row_count,
        columns,
    }
}

fn describe_json(content: String) -> Result<PreparedUpload, AppError> {
    let parsed: Value = serde_json::from_str(&content).map_err(|e| {
        tracing::warn!("Rejected JSON upload: {}", e);
        AppError::InvalidInput("Invalid JSON format".to_string())
    })?;

    let (row_count, columns) = match &parsed {
        Value::Array(items) => {
            let columns = match items.first() {
                Some(Value::Object(first)) => first.keys().cloned().collect(),
                _ => Vec::new(),
            };
            (items.len(), columns)
        }
        _ => (0, Vec::new()),
    };

    Ok(PreparedUpload {
        content,
        row_count,
        columns,
    })
}

/// Flattens the first worksheet into comma-separated text. Commas inside
/// cells are replaced so the row keeps its shape.
pub fn workbook_to_csv(data: Bytes) -> Result<String, AppError> {
    let start = std::time::Instant::now();
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data)).map_err(|e| {
        tracing::error!("Failed to open workbook: {}", e);
        AppError::FileProcessingError(format!("Failed to open workbook: {}", e))
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| AppError::FileProcessingError("No sheets found in workbook".to_string()))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    let lines: Vec<String> = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    other => other.to_string().replace(',', " "),
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();

    tracing::info!(
        "Converted sheet {} ({} rows) in {:?}",
        sheet_name,
        lines.len(),
        start.elapsed()
    );
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_kind() {
        assert_eq!(UploadKind::detect("Sales.CSV", ""), Some(UploadKind::Csv));
        assert_eq!(UploadKind::detect("blob", "text/csv"), Some(UploadKind::Csv));
        assert_eq!(UploadKind::detect("rows.json", ""), Some(UploadKind::Json));
        assert_eq!(UploadKind::detect("book.xlsx", ""), Some(UploadKind::Workbook));
        assert_eq!(UploadKind::detect("blob", XLS_MIME), Some(UploadKind::Workbook));
        assert_eq!(UploadKind::detect("notes.txt", "text/plain"), None);
    }

    #[test]
    fn test_csv_metadata() {
        let upload = prepare_upload(
            UploadKind::Csv,
            Bytes::from_static(b"\"month\", sales ,units\n\nJan,10,1\nFeb,12,2\n"),
        )
        .unwrap();

        assert_eq!(upload.columns, vec!["month", "sales", "units"]);
        assert_eq!(upload.row_count, 2);
    }

    #[test]
    fn test_json_metadata_keeps_key_order() {
        let upload = prepare_upload(
            UploadKind::Json,
            Bytes::from_static(br#"[{"zeta": 1, "alpha": 2}, {"zeta": 3, "alpha": 4}]"#),
        )
        .unwrap();

        assert_eq!(upload.columns, vec!["zeta", "alpha"]);
        assert_eq!(upload.row_count, 2);
    }

    #[test]
    fn test_json_object_has_no_rows() {
        let upload = prepare_upload(UploadKind::Json, Bytes::from_static(br#"{"a": 1}"#)).unwrap();
        assert_eq!(upload.row_count, 0);
        assert!(upload.columns.is_empty());
    }

    #[test]
    fn test_invalid_json_rejected() {
        let err = prepare_upload(UploadKind::Json, Bytes::from_static(b"[{")).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(msg) if msg == "Invalid JSON format"));
    }

    #[test]
    fn test_corrupt_workbook_rejected() {
        let err = prepare_upload(UploadKind::Workbook, Bytes::from_static(b"not a workbook"))
            .unwrap_err();
        assert!(matches!(err, AppError::FileProcessingError(_)));
    }
}
