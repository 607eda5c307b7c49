// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! PDF rendering of report snapshots.
//!
//! Rendering reads only the `Report` value; it never touches the database,
//! so a snapshot renders identically after its source records change.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::models::{round_display, Report};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN_LEFT: i64 = 50;
const TOP_Y: i64 = 790;
const LINE_HEIGHT: i64 = 16;
const LINES_PER_PAGE: usize = 46;
const MAX_LINE_CHARS: usize = 90;
const TITLE_SIZE: i64 = 18;
const HEADING_SIZE: i64 = 13;
const BODY_SIZE: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Style {
    Title,
    Heading,
    Body,
}

#[derive(Debug, Clone)]
struct Line {
    style: Style,
    text: String,
}

impl Line {
    fn title(text: impl Into<String>) -> Self {
        Self {
            style: Style::Title,
            text: text.into(),
        }
    }

    fn heading(text: impl Into<String>) -> Self {
        Self {
            style: Style::Heading,
            text: text.into(),
        }
    }

    fn body(text: impl Into<String>) -> Self {
        Self {
            style: Style::Body,
            text: text.into(),
        }
    }

    fn blank() -> Self {
        Self::body("")
    }
}

/// Errors from PDF rendering.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("Failed to encode page content: {0}")]
    Encode(String),

    #[error("Failed to write PDF: {0}")]
    Write(String),
}

/// Render a report snapshot to PDF bytes.
pub fn render_report_pdf(report: &Report) -> Result<Vec<u8>, PdfError> {
    let lines = layout_report(report);
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut page_ids: Vec<ObjectId> = Vec::new();
    let chunks: Vec<&[Line]> = lines.chunks(LINES_PER_PAGE).collect();
    let total_pages = chunks.len();

    for (index, chunk) in chunks.into_iter().enumerate() {
        let content = page_content(chunk, index + 1, total_pages);
        let encoded = content
            .encode()
            .map_err(|e| PdfError::Encode(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|id| Object::Reference(*id)).collect();
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(page_ids.len() as i64),
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfError::Write(e.to_string()))?;
    Ok(buffer)
}

fn page_content(lines: &[Line], page: usize, total_pages: usize) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 5 + 5);
    let mut y = TOP_Y;

    for line in lines {
        let (font, size) = match line.style {
            Style::Title => ("F2", TITLE_SIZE),
            Style::Heading => ("F2", HEADING_SIZE),
            Style::Body => ("F1", BODY_SIZE),
        };
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![Object::Name(font.as_bytes().to_vec()), Object::Integer(size)],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Integer(MARGIN_LEFT), Object::Integer(y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(pdf_safe(&line.text))],
        ));
        operations.push(Operation::new("ET", vec![]));
        y -= match line.style {
            Style::Title => LINE_HEIGHT * 2,
            _ => LINE_HEIGHT,
        };
    }

    // Footer
    operations.push(Operation::new("BT", vec![]));
    operations.push(Operation::new(
        "Tf",
        vec![Object::Name(b"F1".to_vec()), Object::Integer(8)],
    ));
    operations.push(Operation::new(
        "Td",
        vec![Object::Integer(MARGIN_LEFT), Object::Integer(30)],
    ));
    operations.push(Operation::new(
        "Tj",
        vec![Object::string_literal(format!(
            "Page {} of {}",
            page, total_pages
        ))],
    ));
    operations.push(Operation::new("ET", vec![]));

    Content { operations }
}

/// Standard Type1 fonts only cover Latin-1; keep output to printable ASCII.
fn pdf_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' => '-',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '?',
        })
        .collect()
}

/// Greedy word wrap at `MAX_LINE_CHARS`.
fn wrap(text: &str, indent: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > MAX_LINE_CHARS {
            lines.push(std::mem::take(&mut current));
        }
        if current.is_empty() {
            current.push_str(indent);
        } else {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn tonnes(value: f64) -> String {
    format!("{:.3} tCO2e", round_display(value, 3))
}

fn layout_report(report: &Report) -> Vec<Line> {
    let snapshot = &report.data_snapshot;
    let mut lines = vec![Line::title(report.title.clone())];

    lines.push(Line::body(format!("Generated: {}", report.created_at)));
    lines.push(Line::body(format!(
        "Available until: {}",
        report.expires_at.format("%Y-%m-%d")
    )));
    lines.push(Line::blank());

    if !report.summary.trim().is_empty() {
        lines.push(Line::heading("Summary"));
        lines.extend(wrap(&report.summary, "").into_iter().map(Line::body));
        lines.push(Line::blank());
    }

    lines.push(Line::heading("Totals"));
    lines.push(Line::body(format!(
        "Total emissions: {}",
        tonnes(snapshot.total_emissions)
    )));
    lines.push(Line::body(format!(
        "Calculations included: {}",
        snapshot.recent_calcs.len()
    )));
    lines.push(Line::blank());

    lines.push(Line::heading("Breakdown by category"));
    if snapshot.by_type.is_empty() {
        lines.push(Line::body("No emissions recorded."));
    }
    for (category, value) in &snapshot.by_type {
        let share = if snapshot.total_emissions > 0.0 {
            value / snapshot.total_emissions * 100.0
        } else {
            0.0
        };
        lines.push(Line::body(format!(
            "  {:<16} {:>18}  ({:.1}%)",
            category,
            tonnes(*value),
            share
        )));
    }
    lines.push(Line::blank());

    if !snapshot.recent_calcs.is_empty() {
        lines.push(Line::heading("Calculations"));
        for calc in &snapshot.recent_calcs {
            let date = calc.created_at.get(..10).unwrap_or(&calc.created_at);
            lines.push(Line::body(format!(
                "  {}  {:<16} {:>18}",
                date,
                calc.activity_type.label(),
                tonnes(calc.emissions)
            )));
        }
        lines.push(Line::blank());
    }

    if let Some(ai) = &report.ai_insights_snapshot {
        lines.push(Line::heading("Insights"));
        lines.extend(wrap(&ai.summary, "").into_iter().map(Line::body));
        if !ai.recommendations.is_empty() {
            lines.push(Line::body("Recommendations:"));
            for rec in &ai.recommendations {
                lines.extend(wrap(&format!("- {}", rec), "  ").into_iter().map(Line::body));
            }
        }
        if !ai.risk_flags.is_empty() {
            lines.push(Line::body("Risks:"));
            for risk in &ai.risk_flags {
                lines.extend(wrap(&format!("- {}", risk), "  ").into_iter().map(Line::body));
            }
        }
        if !ai.innovative_idea.trim().is_empty() {
            lines.push(Line::body("Idea:"));
            lines.extend(wrap(&ai.innovative_idea, "  ").into_iter().map(Line::body));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::calculation::{ElectricityInputs, ElectricitySource};
    use crate::models::{ActivityType, AiInsightsSnapshot, Calculation, CalculationInputs, DataSnapshot};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn calc(i: usize) -> Calculation {
        Calculation {
            id: format!("c{}", i),
            user_id: "user-1".to_string(),
            activity_type: ActivityType::Electricity,
            inputs: CalculationInputs::Electricity(ElectricityInputs {
                kwh: 100.0,
                source: ElectricitySource::Grid,
            }),
            emissions: 0.0475,
            created_at: "2026-03-01T10:00:00.000Z".to_string(),
            updated_at: "2026-03-01T10:00:00.000Z".to_string(),
        }
    }

    fn report(calcs: usize) -> Report {
        let recent_calcs: Vec<Calculation> = (0..calcs).map(calc).collect();
        let total = recent_calcs.iter().map(|c| c.emissions).sum();
        Report {
            id: "r1".to_string(),
            user_id: "user-1".to_string(),
            title: "Quarterly footprint \u{2014} Q1".to_string(),
            summary: "A summary that is long enough to need wrapping across more than one line of the page body text in the rendered document.".to_string(),
            data_snapshot: DataSnapshot {
                total_emissions: total,
                by_type: BTreeMap::from([("electricity".to_string(), total)]),
                recent_calcs,
            },
            ai_insights_snapshot: Some(AiInsightsSnapshot {
                summary: "Electricity dominates.".to_string(),
                recommendations: vec!["Switch tariff".to_string()],
                risk_flags: vec![],
                innovative_idea: "Solar pilot".to_string(),
                generated_at: None,
            }),
            created_at: "2026-03-02T00:00:00.000Z".to_string(),
            expires_at: chrono::Utc.with_ymd_and_hms(2026, 5, 31, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_render_produces_loadable_pdf() {
        let bytes = render_report_pdf(&report(3)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_long_reports_paginate() {
        let bytes = render_report_pdf(&report(120)).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() >= 3);
    }

    #[test]
    fn test_empty_snapshot_renders() {
        let mut r = report(0);
        r.ai_insights_snapshot = None;
        r.data_snapshot.by_type.clear();
        assert!(render_report_pdf(&r).is_ok());
    }

    #[test]
    fn test_pdf_safe_replaces_non_ascii() {
        assert_eq!(pdf_safe("CO\u{2082} \u{2014} ok"), "CO? - ok");
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "word ".repeat(60);
        let lines = wrap(&text, "  ");
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= MAX_LINE_CHARS + 2));
        assert!(lines.iter().all(|l| l.starts_with("  ")));
    }
}
