//! Form 137 transcript projection and PDF rendering.

use std::collections::HashMap;

use chrono::NaiveDate;
use common::{LedgerSemester, SubjectScores};
use model::entities::{section, strand, student_profile, year_level};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::{debug, info, instrument};

use crate::access::{enrolled_section_id, find_active_student};
use crate::error::{ComputeError, Result};
use crate::ledger::student_ledger;

const PLACEHOLDER: &str = "N/A";

/// Identity block printed at the top of the record.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptStudent {
    pub first_name: String,
    pub last_name: String,
    /// "Last, First Middle"
    pub full_name: String,
    pub lrn: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub sex: Option<String>,
    pub address: Option<String>,
    pub guardian: Option<String>,
    pub school_year: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSubjectLine {
    pub subject_name: Option<String>,
    pub scores: SubjectScores,
}

/// One semester table, labelled "1st Semester", "2nd Semester" or by name.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSemesterTable {
    pub label: String,
    pub subjects: Vec<TranscriptSubjectLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptYearLevel {
    pub year_level: Option<String>,
    pub semesters: Vec<TranscriptSemesterTable>,
}

/// Everything the renderer needs; no database access happens while rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptProjection {
    pub school_name: String,
    pub student: TranscriptStudent,
    pub strand: Option<String>,
    pub section: Option<String>,
    pub year_levels: Vec<TranscriptYearLevel>,
}

/// Turns a projection into document bytes.
pub trait TranscriptRenderer: Send + Sync + std::fmt::Debug {
    fn render(&self, projection: &TranscriptProjection) -> Result<Vec<u8>>;

    /// MIME type of the rendered bytes.
    fn content_type(&self) -> &'static str;
}

fn semester_label(position: usize, name: &str) -> String {
    match position {
        0 => "1st Semester".to_string(),
        1 => "2nd Semester".to_string(),
        _ => name.to_string(),
    }
}

/// Groups an ordered ledger by year level.
///
/// Year levels appear in the order of their earliest semester. Each year level
/// always carries the first and second semester tables, empty when no grades
/// were recorded for them.
pub fn group_by_year_level(
    ledger: Vec<LedgerSemester>,
    year_level_names: &HashMap<i32, String>,
) -> Vec<TranscriptYearLevel> {
    let mut order: Vec<i32> = Vec::new();
    let mut grouped: HashMap<i32, Vec<LedgerSemester>> = HashMap::new();
    for semester in ledger {
        if !grouped.contains_key(&semester.year_level_id) {
            order.push(semester.year_level_id);
        }
        grouped
            .entry(semester.year_level_id)
            .or_default()
            .push(semester);
    }

    order
        .into_iter()
        .map(|year_level_id| {
            let mut semesters = grouped.remove(&year_level_id).unwrap_or_default();
            semesters.sort_by_key(|s| (s.start_date, s.semester_id));

            let mut tables: Vec<TranscriptSemesterTable> = semesters
                .into_iter()
                .enumerate()
                .map(|(position, semester)| TranscriptSemesterTable {
                    label: semester_label(position, &semester.semester_name),
                    subjects: semester
                        .subjects
                        .into_iter()
                        .map(|s| TranscriptSubjectLine {
                            subject_name: s.subject_name,
                            scores: s.scores,
                        })
                        .collect(),
                })
                .collect();
            while tables.len() < 2 {
                tables.push(TranscriptSemesterTable {
                    label: semester_label(tables.len(), ""),
                    subjects: Vec::new(),
                });
            }

            TranscriptYearLevel {
                year_level: year_level_names.get(&year_level_id).cloned(),
                semesters: tables,
            }
        })
        .collect()
}

/// Loads everything needed to print a student's Form 137.
///
/// Fails with `NotFound` when the student does not exist or has no grades.
#[instrument(skip(db, school_name))]
pub async fn build_projection(
    db: &DatabaseConnection,
    student_id: i32,
    school_name: &str,
) -> Result<TranscriptProjection> {
    let student = find_active_student(db, student_id).await?;
    let ledger = student_ledger(db, student_id).await?;

    let profile = student_profile::Entity::find_by_id(student_id).one(db).await?;
    let strand = match student.strand_id {
        Some(strand_id) => strand::Entity::find_by_id(strand_id)
            .one(db)
            .await?
            .map(|s| s.name),
        None => None,
    };
    let section = match enrolled_section_id(db, student_id).await? {
        Some(section_id) => section::Entity::find_by_id(section_id)
            .one(db)
            .await?
            .map(|s| s.name),
        None => None,
    };

    let year_level_ids: Vec<i32> = ledger.iter().map(|s| s.year_level_id).collect();
    let year_level_names: HashMap<i32, String> = year_level::Entity::find()
        .filter(year_level::Column::Id.is_in(year_level_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|y| (y.id, y.name))
        .collect();

    let student = match profile {
        Some(profile) => TranscriptStudent {
            full_name: profile.display_name(),
            first_name: profile.first_name,
            last_name: profile.last_name,
            lrn: profile.lrn,
            birthdate: profile.birthdate,
            sex: profile.sex,
            address: profile.address,
            guardian: profile.guardian,
            school_year: profile.school_year,
        },
        None => {
            debug!("Student {} has no profile, falling back to username", student_id);
            TranscriptStudent {
                full_name: student.username.clone(),
                first_name: String::new(),
                last_name: student.username,
                lrn: None,
                birthdate: None,
                sex: None,
                address: None,
                guardian: None,
                school_year: None,
            }
        }
    };

    Ok(TranscriptProjection {
        school_name: school_name.to_string(),
        student,
        strand,
        section,
        year_levels: group_by_year_level(ledger, &year_level_names),
    })
}

/// `Form137_<Last>_<First>.pdf` with anything outside `[A-Za-z0-9-]` replaced.
pub fn transcript_filename(last_name: &str, first_name: &str) -> String {
    fn sanitize(part: &str) -> String {
        part.trim()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect::<String>()
            .trim_matches('_')
            .to_string()
    }

    let parts: Vec<String> = [last_name, first_name]
        .iter()
        .map(|p| sanitize(p))
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        "Form137.pdf".to_string()
    } else {
        format!("Form137_{}.pdf", parts.join("_"))
    }
}

fn fmt_score(score: Option<f64>) -> String {
    score
        .map(|s| format!("{:.2}", s))
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

fn fmt_text(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => PLACEHOLDER.to_string(),
    }
}

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const TOP_MM: f32 = 277.0;
const BOTTOM_MARGIN_MM: f32 = 20.0;
const LEFT_MM: f32 = 20.0;
const LINE_MM: f32 = 6.0;
const MAX_SUBJECT_CHARS: usize = 48;

/// Column x positions: subject, midterm, finals, final rating, action.
const COLUMNS_MM: [f32; 5] = [LEFT_MM, 110.0, 130.0, 150.0, 175.0];

/// A piece of text placed on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub bold: bool,
}

/// Lays text out top to bottom, opening a new page at the bottom margin.
#[derive(Debug)]
struct PageLayout {
    pages: Vec<Vec<PlacedText>>,
    y: f32,
}

impl PageLayout {
    fn new() -> Self {
        let mut layout = Self {
            pages: Vec::new(),
            y: TOP_MM,
        };
        layout.new_page();
        layout
    }

    fn new_page(&mut self) {
        let number = self.pages.len() + 1;
        self.pages.push(vec![PlacedText {
            text: format!("Page {}", number),
            x: PAGE_WIDTH_MM - 35.0,
            y: 10.0,
            size: 9.0,
            bold: false,
        }]);
        self.y = TOP_MM;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < BOTTOM_MARGIN_MM {
            self.new_page();
        }
    }

    fn line(&mut self, cells: &[(f32, String)], size: f32, bold: bool) {
        self.ensure_space(LINE_MM);
        let y = self.y;
        if let Some(page) = self.pages.last_mut() {
            for (x, text) in cells {
                page.push(PlacedText {
                    text: text.clone(),
                    x: *x,
                    y,
                    size,
                    bold,
                });
            }
        }
        self.y -= LINE_MM;
    }

    fn gap(&mut self) {
        self.y -= LINE_MM / 2.0;
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max - 3).collect();
        format!("{}...", cut)
    }
}

/// Positions every piece of text of the transcript, page by page.
pub fn layout_pages(projection: &TranscriptProjection) -> Vec<Vec<PlacedText>> {
    let mut layout = PageLayout::new();
    let student = &projection.student;

    layout.line(&[(LEFT_MM, projection.school_name.clone())], 14.0, true);
    layout.line(
        &[(LEFT_MM, "Learner's Permanent Academic Record (Form 137)".to_string())],
        12.0,
        true,
    );
    layout.gap();

    let identity = [
        ("Name", Some(student.full_name.as_str())),
        ("LRN", student.lrn.as_deref()),
        (
            "Birthdate",
            student.birthdate.map(|d| d.format("%Y-%m-%d").to_string()).as_deref(),
        ),
        ("Sex", student.sex.as_deref()),
        ("Address", student.address.as_deref()),
        ("Guardian", student.guardian.as_deref()),
        ("School Year", student.school_year.as_deref()),
        ("Strand", projection.strand.as_deref()),
        ("Section", projection.section.as_deref()),
    ]
    .map(|(label, value)| format!("{}: {}", label, fmt_text(value)));
    for text in identity {
        layout.line(&[(LEFT_MM, text)], 10.0, false);
    }

    for year_level in &projection.year_levels {
        layout.gap();
        // Keep the heading with at least the first table header
        layout.ensure_space(LINE_MM * 3.0);
        layout.line(
            &[(
                LEFT_MM,
                format!("Year Level: {}", fmt_text(year_level.year_level.as_deref())),
            )],
            12.0,
            true,
        );

        for table in &year_level.semesters {
            layout.ensure_space(LINE_MM * 3.0);
            layout.line(&[(LEFT_MM, table.label.clone())], 11.0, true);
            let header = ["Subject", "Midterm", "Finals", "Final Rating", "Action"];
            let header: Vec<(f32, String)> = COLUMNS_MM
                .iter()
                .zip(header)
                .map(|(x, h)| (*x, h.to_string()))
                .collect();
            layout.line(&header, 9.0, true);

            if table.subjects.is_empty() {
                let empty: Vec<(f32, String)> = COLUMNS_MM
                    .iter()
                    .map(|x| (*x, PLACEHOLDER.to_string()))
                    .collect();
                layout.line(&empty, 9.0, false);
            }
            for line in &table.subjects {
                let name = truncate(&fmt_text(line.subject_name.as_deref()), MAX_SUBJECT_CHARS);
                let action = line
                    .scores
                    .action
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| PLACEHOLDER.to_string());
                let cells = [
                    name,
                    fmt_score(line.scores.midterm),
                    fmt_score(line.scores.finals),
                    fmt_score(line.scores.final_rating),
                    action,
                ];
                let row: Vec<(f32, String)> = COLUMNS_MM.iter().copied().zip(cells).collect();
                layout.line(&row, 9.0, false);
            }
            layout.gap();
        }
    }

    layout.pages
}

/// Renders A4 PDF documents with the built-in Helvetica fonts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTranscriptRenderer;

impl PdfTranscriptRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl TranscriptRenderer for PdfTranscriptRenderer {
    #[instrument(skip(self, projection), fields(student = %projection.student.full_name))]
    fn render(&self, projection: &TranscriptProjection) -> Result<Vec<u8>> {
        let pages = layout_pages(projection);
        debug!("Transcript laid out on {} pages", pages.len());

        let title = format!("Form 137 - {}", projection.student.full_name);
        let (doc, first_page, first_layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let regular: IndirectFontRef = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ComputeError::Render(e.to_string()))?;
        let bold: IndirectFontRef = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ComputeError::Render(e.to_string()))?;

        for (index, items) in pages.iter().enumerate() {
            let layer = if index == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page, layer) =
                    doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
                doc.get_page(page).get_layer(layer)
            };
            for item in items {
                let font = if item.bold { &bold } else { &regular };
                layer.use_text(item.text.clone(), item.size, Mm(item.x), Mm(item.y), font);
            }
        }

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| ComputeError::Render(e.to_string()))?;
        info!("Rendered transcript of {} bytes", bytes.len());
        Ok(bytes)
    }

    fn content_type(&self) -> &'static str {
        "application/pdf"
    }
}
