//! Contrast scanning (WCAG 1.4.3 / 1.4.6).
//!
//! Pulls fill and stroke colors from literal `rg`/`RG`/`g`/`G` operands
//! and computes the WCAG contrast ratio between the fill color at each
//! text-showing operator and the most recently set non-fill color.
//! Per-page findings are consolidated into one issue with a sample
//! snippet. Colors are never guessed: a page whose content cannot be
//! parsed yields a single info-level manual-review entry instead.

use crate::analysis::issue::{Issue, IssueCategory, IssueSet, Severity};
use crate::content::{parse_content_ops, ContentOp};
use crate::document::PdfDocument;
use crate::object::Object;
use crate::structure::walker::clean_snippet;

/// Minimum ratio for normal text at Level AA.
pub const CONTRAST_NORMAL_AA: f64 = 4.5;
/// Minimum ratio for normal text at Level AAA.
pub const CONTRAST_NORMAL_AAA: f64 = 7.0;

/// Relative luminance of an sRGB color per WCAG 2.1.
fn relative_luminance(rgb: [f64; 3]) -> f64 {
    let channel = |c: f64| {
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * channel(rgb[0]) + 0.7152 * channel(rgb[1]) + 0.0722 * channel(rgb[2])
}

/// WCAG contrast ratio between two colors.
pub fn contrast_ratio(a: [f64; 3], b: [f64; 3]) -> f64 {
    let la = relative_luminance(a);
    let lb = relative_luminance(b);
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

#[derive(Debug, Clone)]
struct LowContrastRun {
    ratio: f64,
    sample: String,
}

/// One page's contrast scan outcome.
enum PageScan {
    /// Parsed fine; zero or more low-contrast runs
    Parsed(Vec<LowContrastRun>),
    /// No parseable operators at all
    Unparseable,
}

fn color_from_operands(operands: &[Object]) -> Option<[f64; 3]> {
    if operands.len() >= 3 {
        let r = operands[operands.len() - 3].as_number()?;
        let g = operands[operands.len() - 2].as_number()?;
        let b = operands[operands.len() - 1].as_number()?;
        return Some([r, g, b]);
    }
    None
}

fn gray_from_operands(operands: &[Object]) -> Option<[f64; 3]> {
    let value = operands.last()?.as_number()?;
    Some([value, value, value])
}

fn shown_text(op: &ContentOp) -> Option<String> {
    match op.operator.as_str() {
        "Tj" | "'" | "\"" => match op.operands.last() {
            Some(Object::String(s)) => Some(crate::object::decode_text_string(s)),
            _ => None,
        },
        "TJ" => match op.operands.last() {
            Some(Object::Array(items)) => {
                let mut text = String::new();
                for item in items {
                    if let Object::String(s) = item {
                        text.push_str(&crate::object::decode_text_string(s));
                    }
                }
                Some(text)
            },
            _ => None,
        },
        _ => None,
    }
}

fn scan_page(data: &[u8]) -> PageScan {
    let ops = parse_content_ops(data);
    if ops.is_empty() {
        return PageScan::Unparseable;
    }

    let mut fill: Option<[f64; 3]> = None;
    let mut stroke: Option<[f64; 3]> = None;
    let mut runs = Vec::new();

    for op in &ops {
        match op.operator.as_str() {
            "rg" => fill = color_from_operands(&op.operands),
            "g" => fill = gray_from_operands(&op.operands),
            "RG" => stroke = color_from_operands(&op.operands),
            "G" => stroke = gray_from_operands(&op.operands),
            _ => {
                let Some(text) = shown_text(op) else {
                    continue;
                };
                if text.trim().is_empty() {
                    continue;
                }
                // Only judge runs where both colors were set explicitly.
                let (Some(fill), Some(background)) = (fill, stroke) else {
                    continue;
                };
                let ratio = contrast_ratio(fill, background);
                if ratio < CONTRAST_NORMAL_AA {
                    runs.push(LowContrastRun {
                        ratio,
                        sample: clean_snippet(&text, 60),
                    });
                }
            },
        }
    }
    PageScan::Parsed(runs)
}

/// Scan every page and emit consolidated `poorContrast` findings.
pub fn check_contrast(doc: &PdfDocument, issues: &mut IssueSet) {
    let mut offending_pages: Vec<u32> = Vec::new();
    let mut worst_ratio: Option<f64> = None;
    let mut sample: Option<String> = None;
    let mut run_count = 0usize;
    let mut unparseable_pages: Vec<u32> = Vec::new();

    for (index, page) in doc.pages().into_iter().enumerate() {
        let page_num = index as u32 + 1;
        let data = doc.page_content(page);
        if data.iter().all(|b| b.is_ascii_whitespace()) {
            unparseable_pages.push(page_num);
            continue;
        }
        match scan_page(&data) {
            PageScan::Unparseable => unparseable_pages.push(page_num),
            PageScan::Parsed(runs) => {
                if runs.is_empty() {
                    continue;
                }
                run_count += runs.len();
                offending_pages.push(page_num);
                for run in &runs {
                    if worst_ratio.map(|w| run.ratio < w).unwrap_or(true) {
                        worst_ratio = Some(run.ratio);
                    }
                    if sample.is_none() && !run.sample.is_empty() {
                        sample = Some(run.sample.clone());
                    }
                }
            },
        }
    }

    if !offending_pages.is_empty() {
        let ratio = worst_ratio.unwrap_or(0.0);
        let mut issue = Issue::new(
            format!(
                "Text with insufficient color contrast (worst ratio {:.2}:1, minimum {}:1) on {} run(s).",
                ratio,
                CONTRAST_NORMAL_AA,
                run_count
            ),
            Severity::Medium,
        )
        .with_pages(offending_pages.clone())
        .with_page(offending_pages[0])
        .with_count(run_count);
        issue.remediation = Some(
            "Darken text or lighten backgrounds until body text reaches at least a 4.5:1 contrast ratio."
                .to_string(),
        );
        issue.contrast_ratio = Some((ratio * 100.0).round() / 100.0);
        issue.context = sample;
        issues.add(IssueCategory::PoorContrast, issue);
    }

    if !unparseable_pages.is_empty() {
        let mut issue = Issue::new(
            "Contrast could not be measured automatically; review text colors manually.",
            Severity::Info,
        )
        .with_pages(unparseable_pages);
        issue.remediation = Some(
            "Check text and background colors with a contrast checker; automated color extraction was not possible for these pages."
                .to_string(),
        );
        issues.add(IssueCategory::PoorContrast, issue);
    }
}
