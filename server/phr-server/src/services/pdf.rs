//! Health summary PDF export
//!
//! Single A4 page: title, patient information, up to ten reports and up to
//! fifteen recent logs, then a confidentiality footer.

use std::io::BufWriter;

use chrono::{DateTime, Utc};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use thiserror::Error;

use crate::models::{HealthLog, HealthReport, User};

pub const MAX_REPORT_ROWS: usize = 10;
pub const MAX_LOG_ROWS: usize = 15;
/// Latest logs loaded for the export; only [`MAX_LOG_ROWS`] are printed
pub const EXPORT_LOG_WINDOW: i64 = 30;

const LEFT: f32 = 20.0;
const LINE: f32 = 5.0;
const FOOTER: &str =
    "This document contains confidential health information. Share it only with authorized healthcare providers.";

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF font error: {0}")]
    Font(String),
    #[error("PDF save error: {0}")]
    Save(String),
    #[error("PDF buffer error: {0}")]
    Buffer(String),
}

/// Rendered export ready to stream
#[derive(Debug)]
pub struct PdfExport {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// `health_summary_{name}_{YYYYMMDD}.pdf`. The name keeps ASCII
/// alphanumerics, `_` and `-`; whitespace becomes `_` and everything else is
/// dropped so the result is always a valid header value.
pub fn export_filename(user: &User, now: DateTime<Utc>) -> String {
    format!("health_summary_{}_{}.pdf", filename_safe(&user.full_name), now.format("%Y%m%d"))
}

fn filename_safe(name: &str) -> String {
    let safe: String = name
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    if safe.is_empty() {
        "patient".to_string()
    } else {
        safe
    }
}

struct Cursor<'a> {
    layer: PdfLayerReference,
    font: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
    y: Mm,
}

impl Cursor<'_> {
    fn heading(&mut self, text: &str) {
        self.y -= Mm(4.0);
        self.layer.use_text(text, 12.0, Mm(LEFT), self.y, self.bold);
        self.y -= Mm(7.0);
    }

    /// One table row; `bold` for header rows
    fn row(&mut self, columns: &[(f32, &str)], bold: bool) {
        let font = if bold { self.bold } else { self.font };
        for (x, text) in columns {
            self.layer.use_text(*text, 9.0, Mm(*x), self.y, font);
        }
        self.y -= Mm(LINE);
    }
}

fn dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

/// Render the summary. `reports` must be newest report date first and
/// `logs` newest log date first.
pub fn render_health_summary(
    user: &User,
    reports: &[HealthReport],
    logs: &[HealthLog],
    now: DateTime<Utc>,
) -> Result<PdfExport, PdfError> {
    let title = "Personal Health Record Summary";
    let (doc, page1, layer1) = PdfDocument::new(title, Mm(210.0), Mm(297.0), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| PdfError::Font(e.to_string()))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| PdfError::Font(e.to_string()))?;

    let mut cursor = Cursor {
        layer: doc.get_page(page1).get_layer(layer1),
        font: &font,
        bold: &bold,
        y: Mm(280.0),
    };

    cursor.layer.use_text(title, 16.0, Mm(LEFT), cursor.y, &bold);
    cursor.y -= Mm(6.0);
    cursor.layer.use_text(
        format!("Generated: {}", now.format("%Y-%m-%d %H:%M UTC")),
        9.0,
        Mm(LEFT),
        cursor.y,
        &font,
    );
    cursor.y -= Mm(6.0);

    cursor.heading("Patient Information");
    let info = [
        ("Name", user.full_name.clone()),
        ("Email", user.email.clone()),
        ("Phone", dash(user.phone.clone())),
        ("Date of Birth", dash(user.date_of_birth.map(|d| d.to_string()))),
        ("Gender", dash(user.gender.clone())),
        ("Blood Group", dash(user.blood_group.clone())),
        ("Allergies", dash((!user.allergies.is_empty()).then(|| user.allergies.join(", ")))),
        (
            "Chronic Conditions",
            dash((!user.chronic_conditions.is_empty()).then(|| user.chronic_conditions.join(", "))),
        ),
    ];
    for (label, value) in &info {
        cursor.row(&[(LEFT, *label), (70.0, value.as_str())], false);
    }

    cursor.heading("Medical Reports");
    if reports.is_empty() {
        cursor.row(&[(LEFT, "No reports uploaded.")], false);
    } else {
        cursor.row(&[(LEFT, "Date"), (50.0, "Type"), (90.0, "Title")], true);
        for report in reports.iter().take(MAX_REPORT_ROWS) {
            let date = report.report_date.format("%Y-%m-%d").to_string();
            cursor.row(
                &[(LEFT, date.as_str()), (50.0, report.report_type.as_str()), (90.0, report.title.as_str())],
                false,
            );
        }
    }

    cursor.heading("Recent Health Logs");
    if logs.is_empty() {
        cursor.row(&[(LEFT, "No health logs recorded.")], false);
    } else {
        cursor.row(
            &[(LEFT, "Date"), (50.0, "Temperature"), (90.0, "Blood Pressure"), (135.0, "Mood")],
            true,
        );
        for log in logs.iter().take(MAX_LOG_ROWS) {
            let date = log.log_date.format("%Y-%m-%d").to_string();
            let temperature = dash(log.temperature.map(|t| format!("{t:.1} C")));
            let pressure = dash(log.blood_pressure());
            cursor.row(
                &[(LEFT, date.as_str()), (50.0, temperature.as_str()), (90.0, pressure.as_str()), (135.0, log.mood.as_str())],
                false,
            );
        }
    }

    cursor.y -= Mm(8.0);
    cursor.layer.use_text(FOOTER, 8.0, Mm(LEFT), cursor.y, &font);

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(|e| PdfError::Save(e.to_string()))?;
    let bytes = buf.into_inner().map_err(|e| PdfError::Buffer(e.to_string()))?;

    Ok(PdfExport {
        filename: export_filename(user, now),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HealthLogCreate, Role};
    use chrono::TimeZone;

    fn user() -> User {
        User::new("jane@example.com".into(), "hash".into(), "Jane Doe".into(), None, Role::Patient)
    }

    #[test]
    fn test_filename() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(export_filename(&user(), now), "health_summary_Jane_Doe_20250309.pdf");
    }

    #[test]
    fn test_filename_drops_header_breaking_characters() {
        let now = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap();
        let mut owner = user();

        owner.full_name = "Jane \"JJ\" Doe".into();
        assert_eq!(export_filename(&owner, now), "health_summary_Jane_JJ_Doe_20250309.pdf");

        owner.full_name = "Jane\nDoe\r\n".into();
        assert_eq!(export_filename(&owner, now), "health_summary_Jane_Doe_20250309.pdf");

        owner.full_name = "Zoë O'Brien-Smith".into();
        assert_eq!(export_filename(&owner, now), "health_summary_Zo_OBrien-Smith_20250309.pdf");

        owner.full_name = "\"; \u{4e2d}".into();
        assert_eq!(export_filename(&owner, now), "health_summary_patient_20250309.pdf");
    }

    #[test]
    fn test_renders_pdf_bytes() {
        let owner = user();
        let logs: Vec<HealthLog> = (0..20)
            .map(|_| {
                let create: HealthLogCreate =
                    serde_json::from_str(r#"{"temperature": 36.8, "blood_pressure_systolic": 120, "blood_pressure_diastolic": 80}"#)
                        .unwrap();
                create.into_log(owner.id)
            })
            .collect();

        let export = render_health_summary(&owner, &[], &logs, Utc::now()).unwrap();
        assert_eq!(&export.bytes[0..4], b"%PDF");
        assert!(export.filename.starts_with("health_summary_Jane_Doe_"));
    }
}
