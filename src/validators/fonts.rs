//! CID font Unicode-mapping checks (ISO 14289-1:7.11).
//!
//! Composite (Type0) fonts need a usable ToUnicode CMap for assistive
//! technology, and CIDFontType2 descendants additionally need a
//! CIDToGIDMap. "Usable" means the CMap maps at least one code to a real
//! Unicode value, not just notdef placeholders.

use crate::analysis::issue::{Issue, IssueCategory, IssueSet, Severity};
use crate::document::PdfDocument;
use crate::object::Dict;
use serde_json::json;
use std::collections::HashSet;

const FONT_MAPPING_MESSAGE: &str = "Font mapping is incomplete: CID fonts must include usable /ToUnicode mappings and CIDFontType2 fonts also need /CIDToGIDMap entries (ISO 14289-1:7.11 Fonts).";
const WEAK_MAPPING_MESSAGE: &str = "Unicode mapping exists but is not meaningful for assistive technology (ISO 14289-1:7.11 Fonts).";

/// Why a CMap was judged unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmapVerdict {
    /// At least one real Unicode mapping exists
    Meaningful,
    /// No CMap text at all
    Empty,
    /// Only notdef / U+0000 targets
    NotdefOnly,
    /// Mappings present but none decode to usable Unicode
    NoValidUnicode,
}

impl CmapVerdict {
    fn reason(&self) -> &'static str {
        match self {
            CmapVerdict::Meaningful => "meaningful",
            CmapVerdict::Empty => "empty",
            CmapVerdict::NotdefOnly => "notdefOnly",
            CmapVerdict::NoValidUnicode => "noValidUnicode",
        }
    }
}

/// One CID font that failed a mapping requirement.
#[derive(Debug, Clone)]
pub struct FailedFont {
    /// Resource name plus BaseFont, for reporting
    pub name: String,
    /// ToUnicode absent entirely
    pub missing_to_unicode: bool,
    /// ToUnicode present but unusable
    pub unusable_to_unicode: bool,
    /// CMap verdict when one was read
    pub to_unicode_status: Option<CmapVerdict>,
    /// CIDFontType2 without CIDToGIDMap
    pub missing_cid_to_gid: bool,
    /// Descendant font subtype ("/CIDFontType0" form)
    pub descendant_subtype: Option<String>,
    /// Requirement labels for the advisory meta block
    pub failed_requirements: Vec<String>,
}

/// Scan every page's fonts and report CID fonts with unusable mappings.
pub fn find_cid_fonts_missing_maps(doc: &PdfDocument) -> Vec<FailedFont> {
    let mut failed = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for page in doc.pages() {
        for (resource_name, font) in doc.page_fonts(page) {
            if font.get("Subtype").and_then(|s| s.as_name()) != Some("Type0") {
                continue;
            }
            let base = font
                .get("BaseFont")
                .and_then(|b| b.as_name())
                .unwrap_or(&resource_name);
            if !seen.insert(base.to_string()) {
                continue;
            }

            let descendant = descendant_font(doc, font);
            let descendant_subtype = descendant
                .and_then(|d| d.get("Subtype"))
                .and_then(|s| s.as_name())
                .map(|s| format!("/{}", s));

            let missing_to_unicode = !font.contains_key("ToUnicode");
            let mut unusable = false;
            let mut verdict = None;
            if !missing_to_unicode {
                let v = analyze_to_unicode(doc, font);
                if v != CmapVerdict::Meaningful {
                    unusable = true;
                }
                verdict = Some(v);
            }

            let missing_cid_to_gid = descendant_subtype.as_deref() == Some("/CIDFontType2")
                && descendant
                    .map(|d| !d.contains_key("CIDToGIDMap"))
                    .unwrap_or(false);

            if !missing_to_unicode && !unusable && !missing_cid_to_gid {
                continue;
            }

            let mut failed_requirements = Vec::new();
            if missing_to_unicode {
                failed_requirements.push("ToUnicodeMissing".to_string());
            }
            if unusable {
                failed_requirements.push("ToUnicodeNotMeaningful".to_string());
            }
            if missing_cid_to_gid {
                failed_requirements.push("CIDToGIDMapMissing".to_string());
            }

            failed.push(FailedFont {
                name: base.to_string(),
                missing_to_unicode,
                unusable_to_unicode: unusable,
                to_unicode_status: verdict,
                missing_cid_to_gid,
                descendant_subtype,
                failed_requirements,
            });
        }
    }
    failed
}

fn descendant_font<'a>(doc: &'a PdfDocument, font: &'a Dict) -> Option<&'a Dict> {
    let descendants = font.get("DescendantFonts")?;
    let arr = doc.resolve(descendants).as_array()?;
    doc.resolve_dict(arr.first()?)
}

fn analyze_to_unicode(doc: &PdfDocument, font: &Dict) -> CmapVerdict {
    let Some(to_unicode) = font.get("ToUnicode") else {
        return CmapVerdict::Empty;
    };
    let stream = doc.resolve(to_unicode);
    let data = match stream.decode_stream_data() {
        Ok(data) => data,
        Err(err) => {
            log::debug!("failed to decode ToUnicode CMap: {}", err);
            match stream.raw_stream_data() {
                Some(raw) => raw.to_vec(),
                None => return CmapVerdict::Empty,
            }
        },
    };
    analyze_cmap_text(&String::from_utf8_lossy(&data))
}

/// Judge a ToUnicode CMap's body: does any bfchar/bfrange map to a
/// Unicode value other than notdef placeholders?
pub fn analyze_cmap_text(text: &str) -> CmapVerdict {
    lazy_static::lazy_static! {
        static ref BF_TARGET: regex::Regex =
            regex::Regex::new(r"<[0-9A-Fa-f]+>\s*<([0-9A-Fa-f]+)>").expect("bf target regex");
    }
    if text.trim().is_empty() {
        return CmapVerdict::Empty;
    }
    if !text.contains("beginbfchar") && !text.contains("beginbfrange") {
        return CmapVerdict::Empty;
    }

    let mut saw_mapping = false;
    let mut saw_valid = false;
    for caps in BF_TARGET.captures_iter(text) {
        saw_mapping = true;
        let target = &caps[1];
        // Targets are sequences of UTF-16BE units, 4 hex digits each.
        for chunk in target.as_bytes().chunks(4) {
            let Ok(hex) = std::str::from_utf8(chunk) else {
                continue;
            };
            let Ok(unit) = u32::from_str_radix(hex, 16) else {
                continue;
            };
            if unit != 0x0000 && unit != 0xFFFD {
                saw_valid = true;
            }
        }
    }

    if !saw_mapping {
        return CmapVerdict::NoValidUnicode;
    }
    if saw_valid {
        CmapVerdict::Meaningful
    } else {
        CmapVerdict::NotdefOnly
    }
}

/// Emit the document-wide font-mapping finding into `issues`.
///
/// Fonts that merely carry a weak CMap get the softer wording; everything
/// is rolled into one finding per failure class so a font-heavy document
/// does not flood the report.
pub fn check_font_mappings(doc: &PdfDocument, issues: &mut IssueSet) {
    let failed = find_cid_fonts_missing_maps(doc);
    if failed.is_empty() {
        return;
    }

    let (weak, hard): (Vec<&FailedFont>, Vec<&FailedFont>) = failed
        .iter()
        .partition(|f| !f.missing_to_unicode && !f.missing_cid_to_gid && f.unusable_to_unicode);

    if !hard.is_empty() {
        issues.add(
            IssueCategory::PdfuaIssues,
            font_issue(FONT_MAPPING_MESSAGE, &hard)
                .with_context(font_names(&hard)),
        );
        issues.add(
            IssueCategory::FontIssues,
            Issue::new(FONT_MAPPING_MESSAGE, Severity::High)
                .with_context(font_names(&hard)),
        );
    }
    if !weak.is_empty() {
        let mut issue = font_issue(WEAK_MAPPING_MESSAGE, &weak).with_context(font_names(&weak));
        issue.remediation = Some(
            "Regenerate each font's ToUnicode CMap so character codes map to real Unicode values."
                .to_string(),
        );
        issues.add(IssueCategory::PdfuaIssues, issue);
        issues.add(
            IssueCategory::FontIssues,
            Issue::new(WEAK_MAPPING_MESSAGE, Severity::High).with_context(font_names(&weak)),
        );
    }
}

fn font_names(fonts: &[&FailedFont]) -> String {
    fonts
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn font_issue(message: &str, fonts: &[&FailedFont]) -> Issue {
    let mut requirements: Vec<String> = Vec::new();
    for font in fonts {
        for requirement in &font.failed_requirements {
            if !requirements.contains(requirement) {
                requirements.push(requirement.clone());
            }
        }
    }
    let font_meta: Vec<serde_json::Value> = fonts
        .iter()
        .map(|f| {
            json!({
                "name": f.name,
                "missingToUnicode": f.missing_to_unicode,
                "missingCidToGid": f.missing_cid_to_gid,
                "unusableToUnicode": f.unusable_to_unicode,
                "toUnicodeStatus": f.to_unicode_status.map(|v| v.reason()),
                "descendantSubtype": f.descendant_subtype,
                "failedRequirements": f.failed_requirements,
            })
        })
        .collect();

    let mut issue = Issue::pdfua(
        message,
        "ISO 14289-1:7.11",
        Severity::High,
        "Re-embed each CID font with valid /ToUnicode and, for CIDFontType2 fonts, a /CIDToGIDMap so extracted text is usable.",
    );
    issue.document_wide = Some(true);
    issue.auto_fix_available = Some(false);
    issue.meta = Some(json!({
        "failedRequirements": requirements,
        "fonts": font_meta,
        "toUnicodeStatus": fonts
            .first()
            .and_then(|f| f.to_unicode_status.map(|v| v.reason())),
        "descendantSubtype": fonts.first().and_then(|f| f.descendant_subtype.clone()),
    }));
    issue
}
