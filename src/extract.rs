//! Turns the portal's data page into a [`FetchResult`].
//!
//! The page has no stable structure, so each of the three data domains is
//! found by its own heuristic. A domain that cannot be read falls back to its
//! default without affecting the others.

use std::sync::LazyLock;

use log::warn;
use scraper::{ElementRef, Html, Selector};

use crate::{
    error::AbsenceParseError,
    portal_data::{Absences, FetchResult, GradeEntry, LAST_UPDATE_CONNECTED, LAST_UPDATE_UNKNOWN},
    text_manipulators::{extract_stripped_text, extract_text, extract_visible_text},
};

static SEL_TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());
static SEL_TR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static SEL_TD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static SEL_TH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("th").unwrap());
static SEL_SUBJECT_WALK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3, b, strong, table").unwrap());

const UPDATE_MARKER: &str = "aktualisiert am";

const ABSENCE_TABLE_MARKERS: [&str; 2] = ["Fehltage", "Unentschuldigte"];
const DAYS: &str = "Fehltage";
const UNEXCUSED_DAYS: &str = "Unentschuldigte Fehltage";
const HOURS: &str = "Fehlstunden";
const UNEXCUSED_HOURS: &str = "Unentschuldigte Fehlstunden";

/// Bold text and headings containing these are never subjects.
const NOISE_HEADINGS: [&str; 3] = ["Notenspiegel", "Endnoten", "Legende"];
const MIN_SUBJECT_CHARS: usize = 3;
const GRADE_TABLE_HEADERS: [&str; 2] = ["Zensur", "Datum"];

pub fn extract(html: &str) -> FetchResult {
    let document = Html::parse_document(html);
    FetchResult {
        last_update: last_update(&document),
        absences: absences(&document),
        grades: grades(&document),
    }
}

pub fn last_update(document: &Html) -> String {
    parse_last_update(&extract_visible_text(document.root_element()))
}

fn parse_last_update(page_text: &str) -> String {
    let mut parts = page_text.split(UPDATE_MARKER);
    parts.next();
    let Some(after) = parts.next() else {
        return LAST_UPDATE_CONNECTED.to_string();
    };
    let Some(token) = after.split_whitespace().next() else {
        return LAST_UPDATE_UNKNOWN.to_string();
    };
    let token = token.trim_matches('"').trim_matches('\'');
    // A stray tag fragment must not leak into the value.
    token.split('<').next().unwrap_or(token).to_string()
}

/// Stripped text of every cell in `row` matching `cells`.
fn row_cells(row: ElementRef, cells: &Selector) -> Vec<String> {
    row.select(cells).map(extract_stripped_text).collect()
}

fn is_absence_table(table: &ElementRef) -> bool {
    let text = extract_text(*table);
    ABSENCE_TABLE_MARKERS
        .iter()
        .all(|marker| text.contains(marker))
}

fn parse_count(label: &'static str, value: &str) -> Result<i64, AbsenceParseError> {
    value.parse().map_err(|source| AbsenceParseError {
        label,
        value: value.to_string(),
        source,
    })
}

fn parse_absences(document: &Html) -> Result<Absences, AbsenceParseError> {
    let mut absences = Absences::default();
    for table in document.select(&SEL_TABLE).filter(is_absence_table) {
        for row in table.select(&SEL_TR) {
            let cells = row_cells(row, &SEL_TD);
            let [label, value, ..] = cells.as_slice() else {
                continue;
            };
            match label.as_str() {
                DAYS => absences.days = parse_count(DAYS, value)?,
                UNEXCUSED_DAYS => absences.unexcused_days = parse_count(UNEXCUSED_DAYS, value)?,
                HOURS => absences.hours = value.clone(),
                UNEXCUSED_HOURS => absences.unexcused_hours = value.clone(),
                _ => {}
            }
        }
    }
    Ok(absences)
}

/// Counters from the absence table, or all defaults if it is unreadable.
pub fn absences(document: &Html) -> Absences {
    parse_absences(document).unwrap_or_else(|e| {
        warn!("Ignoring absence table: {e}");
        Absences::default()
    })
}

/// The part of the page the grade walk cares about.
enum Node<'a> {
    Heading(String),
    Table(ElementRef<'a>),
}

fn subject_walk(document: &Html) -> impl Iterator<Item = Node<'_>> {
    document.select(&SEL_SUBJECT_WALK).map(|el| {
        if el.value().name() == "table" {
            Node::Table(el)
        } else {
            Node::Heading(extract_stripped_text(el))
        }
    })
}

fn is_subject_heading(text: &str) -> bool {
    text.chars().count() >= MIN_SUBJECT_CHARS
        && !NOISE_HEADINGS.iter().any(|noise| text.contains(noise))
}

fn is_grade_table(table: ElementRef) -> bool {
    let headers: Vec<String> = table.select(&SEL_TH).map(extract_stripped_text).collect();
    GRADE_TABLE_HEADERS
        .iter()
        .all(|wanted| headers.iter().any(|h| h == wanted))
}

/// Rows are `Datum | Zensur | Bemerkung | ...`; rows without a grade are
/// not graded yet.
fn grade_rows(table: ElementRef, subject: &str) -> impl Iterator<Item = GradeEntry> {
    table.select(&SEL_TR).filter_map(move |row| {
        let cells = row_cells(row, &SEL_TD);
        let [date, grade, comment, ..] = cells.as_slice() else {
            return None;
        };
        if grade.is_empty() {
            return None;
        }
        Some(GradeEntry {
            subject: subject.to_string(),
            date: date.clone(),
            grade: grade.clone(),
            comment: comment.clone(),
        })
    })
}

/// Walks headings and tables in document order, tagging each grade table with
/// the last subject heading seen.
///
/// The subject carries over until the next subject heading, so several
/// tables under one heading all belong to it. Tables before the first subject
/// heading are dropped.
pub fn grades(document: &Html) -> Vec<GradeEntry> {
    let (_, grades) = subject_walk(document).fold(
        (None::<String>, Vec::new()),
        |(subject, mut grades), node| match node {
            Node::Heading(text) if is_subject_heading(&text) => (Some(text), grades),
            Node::Heading(_) => (subject, grades),
            Node::Table(table) => {
                if let Some(subject) = subject.as_deref() {
                    if is_grade_table(table) {
                        grades.extend(grade_rows(table, subject));
                    }
                }
                (subject, grades)
            }
        },
    );
    grades
}
