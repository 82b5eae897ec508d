//! Best-effort segmentation of a completion into digest sections.
//!
//! The model is asked for `Heading: content` lines but is free to decorate
//! them with Markdown, reorder them, or drop some. Anything unrecognized is
//! ignored and missing sections stay empty; parsing never fails.

use std::fmt::Write as _;

use serde::Serialize;

use crate::formats::{DigestFields, DigestRecord, SourceType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Title,
    FieldOrTopic,
    ResearchQuestion,
    Methodology,
    KeyFindings,
    Limitations,
    PersonalTakeaway,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Title,
        Section::FieldOrTopic,
        Section::ResearchQuestion,
        Section::Methodology,
        Section::KeyFindings,
        Section::Limitations,
        Section::PersonalTakeaway,
    ];

    pub fn heading(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::FieldOrTopic => "Field or Topic",
            Self::ResearchQuestion => "Research Question",
            Self::Methodology => "Methodology",
            Self::KeyFindings => "Key Findings",
            Self::Limitations => "Limitations",
            Self::PersonalTakeaway => "Personal Takeaway",
        }
    }

    fn json_key(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::FieldOrTopic => "field_or_topic",
            Self::ResearchQuestion => "research_question",
            Self::Methodology => "methodology",
            Self::KeyFindings => "key_findings",
            Self::Limitations => "limitations",
            Self::PersonalTakeaway => "personal_takeaway",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        let normalized = label
            .replace('_', " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        let section = match normalized.as_str() {
            "title" | "paper title" => Self::Title,
            "field or topic" | "field/topic" | "field / topic" | "field" | "topic"
            | "research field" | "topic area" => Self::FieldOrTopic,
            "research question" | "research questions" => Self::ResearchQuestion,
            "methodology" | "method" | "methods" => Self::Methodology,
            "key findings" | "findings" | "main findings" | "key points" | "key results" => {
                Self::KeyFindings
            }
            "limitations" | "limitation" => Self::Limitations,
            "personal takeaway" | "takeaway" | "takeaways" | "why it matters" => {
                Self::PersonalTakeaway
            }
            _ => return None,
        };
        Some(section)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDigest {
    pub fields: DigestFields,
    /// Sections that came back empty, in heading order.
    pub missing: Vec<Section>,
}

impl ParsedDigest {
    pub fn is_unrecognized(&self) -> bool {
        self.missing.len() == Section::ALL.len()
    }
}

pub fn parse_completion(completion: &str) -> ParsedDigest {
    let body = strip_code_fence(completion);
    let fields = parse_json_fields(body).unwrap_or_else(|| scan_labeled_lines(body));
    let missing = Section::ALL
        .into_iter()
        .filter(|section| section_is_empty(&fields, *section))
        .collect();
    ParsedDigest { fields, missing }
}

fn strip_code_fence(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.split_once('\n').map_or("", |(_, body)| body);
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

fn parse_json_fields(text: &str) -> Option<DigestFields> {
    if !text.starts_with('{') {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;

    let mut fields = DigestFields::default();
    for section in Section::ALL {
        let Some(value) = object.get(section.json_key()) else {
            continue;
        };
        if section == Section::KeyFindings {
            fields.key_findings = match value {
                serde_json::Value::Array(items) => items
                    .iter()
                    .map(json_text)
                    .filter(|item| !item.is_empty())
                    .collect(),
                other => {
                    let text = json_text(other);
                    if text.is_empty() { Vec::new() } else { vec![text] }
                }
            };
        } else if let Some(target) = text_field_mut(&mut fields, section) {
            *target = json_text(value);
        }
    }
    Some(fields)
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.trim().to_owned(),
        other => other.to_string(),
    }
}

fn scan_labeled_lines(text: &str) -> DigestFields {
    let mut fields = DigestFields::default();
    let mut current: Option<Section> = None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if current == Some(Section::KeyFindings)
            && let Some(item) = strip_bullet(line)
        {
            push_finding(&mut fields, item);
            continue;
        }

        if let Some((section, rest)) = split_label(line) {
            current = Some(section);
            if !rest.is_empty() {
                append_to(&mut fields, section, rest);
            }
            continue;
        }

        if let Some(section) = current {
            append_to(&mut fields, section, line);
        }
    }

    fields
}

/// Recognizes `Label: rest`, `**Label:** rest`, `## Label`, `1. Label:` and similar.
fn split_label(line: &str) -> Option<(Section, &str)> {
    let line = strip_list_number(line.trim_start_matches(['#', '*', '_', ' ', '>']));

    if let Some((label, rest)) = line.split_once(':') {
        if let Some(section) = Section::from_label(label.trim().trim_end_matches(['*', '_'])) {
            return Some((section, rest.trim_start_matches(['*', '_']).trim()));
        }
    }

    let whole = line.trim_end_matches(['*', '_', ':', ' ']);
    Section::from_label(whole).map(|section| (section, ""))
}

fn strip_list_number(line: &str) -> &str {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return line;
    }
    let rest = &line[digits..];
    // "3.5x" and "2)" inside prose are numbers, not list markers.
    rest.strip_prefix(['.', ')'])
        .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        .map(str::trim_start)
        .unwrap_or(line)
}

fn strip_bullet(line: &str) -> Option<&str> {
    const MARKERS: [&str; 4] = ["-", "*", "•", "+"];
    if MARKERS.contains(&line) {
        return Some("");
    }
    for marker in MARKERS {
        if let Some(rest) = line
            .strip_prefix(marker)
            .and_then(|rest| rest.strip_prefix(' '))
        {
            return Some(rest.trim());
        }
    }
    let numbered = strip_list_number(line);
    if numbered.len() != line.len() {
        return Some(numbered.trim());
    }
    None
}

fn push_finding(fields: &mut DigestFields, item: &str) {
    if !item.is_empty() {
        fields.key_findings.push(item.to_owned());
    }
}

fn append_to(fields: &mut DigestFields, section: Section, text: &str) {
    if section == Section::KeyFindings {
        let bullet = strip_bullet(text);
        match fields.key_findings.last_mut() {
            // Continuation of a wrapped bullet that has not ended its sentence.
            Some(last) if bullet.is_none() && !last.ends_with(['.', '!', '?']) => {
                last.push(' ');
                last.push_str(text);
            }
            _ => push_finding(fields, bullet.unwrap_or(text)),
        }
        return;
    }

    let Some(target) = text_field_mut(fields, section) else {
        return;
    };
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

fn text_field_mut(fields: &mut DigestFields, section: Section) -> Option<&mut String> {
    let field = match section {
        Section::Title => &mut fields.title,
        Section::FieldOrTopic => &mut fields.field_or_topic,
        Section::ResearchQuestion => &mut fields.research_question,
        Section::Methodology => &mut fields.methodology,
        Section::Limitations => &mut fields.limitations,
        Section::PersonalTakeaway => &mut fields.personal_takeaway,
        Section::KeyFindings => return None,
    };
    Some(field)
}

fn section_is_empty(fields: &DigestFields, section: Section) -> bool {
    match section {
        Section::Title => fields.title.is_empty(),
        Section::FieldOrTopic => fields.field_or_topic.is_empty(),
        Section::ResearchQuestion => fields.research_question.is_empty(),
        Section::Methodology => fields.methodology.is_empty(),
        Section::KeyFindings => fields.key_findings.is_empty(),
        Section::Limitations => fields.limitations.is_empty(),
        Section::PersonalTakeaway => fields.personal_takeaway.is_empty(),
    }
}

/// Reading note shown in the browser and printed by the CLI.
pub fn render_markdown(record: &DigestRecord) -> String {
    let fields = &record.fields;
    let title = if fields.title.is_empty() {
        "Untitled paper"
    } else {
        fields.title.as_str()
    };

    let mut out = String::new();
    let _ = writeln!(out, "# {title}\n");
    let _ = writeln!(out, "**Field or Topic:** {}\n", fields.field_or_topic);
    let _ = writeln!(out, "**Research Question:** {}\n", fields.research_question);
    let _ = writeln!(out, "**Methodology:** {}\n", fields.methodology);
    out.push_str("**Key Findings:**\n\n");
    for finding in &fields.key_findings {
        let _ = writeln!(out, "- {finding}");
    }
    out.push('\n');
    let _ = writeln!(out, "**Limitations:** {}\n", fields.limitations);
    let _ = writeln!(out, "**Personal Takeaway:** {}\n", fields.personal_takeaway);

    let source = match (record.source_type, record.source_url.as_deref()) {
        (SourceType::Url, Some(url)) => url.to_owned(),
        (source_type, _) => source_type.as_str().to_owned(),
    };
    let _ = writeln!(
        out,
        "_Source: {source} · {}_",
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::SourceInput;

    const TEMPLATE_COMPLETION: &str = "Title: Foo\n\
Field or Topic: Machine learning\n\
Research Question: Does Y help with X?\n\
Methodology: Controlled experiments using Y.\n\
Key Findings:\n\
- Z holds.\n\
- Z also holds at scale,\n\
  with caveats.\n\
Limitations: Small sample.\n\
Personal Takeaway: Useful for pricing models.\n";

    #[test]
    fn template_shaped_completion_fills_every_section() {
        let parsed = parse_completion(TEMPLATE_COMPLETION);
        let fields = &parsed.fields;
        assert_eq!(fields.title, "Foo");
        assert_eq!(fields.field_or_topic, "Machine learning");
        assert_eq!(fields.research_question, "Does Y help with X?");
        assert_eq!(fields.methodology, "Controlled experiments using Y.");
        assert_eq!(
            fields.key_findings,
            vec!["Z holds.", "Z also holds at scale, with caveats."]
        );
        assert_eq!(fields.limitations, "Small sample.");
        assert_eq!(fields.personal_takeaway, "Useful for pricing models.");
        assert!(parsed.missing.is_empty());
    }

    #[test]
    fn markdown_decorated_labels_are_recognized() {
        let completion = "Here is your note:\n\n\
## **Title:** Deep Nets\n\
**Field/Topic**: Vision\n\
### Key Findings\n\
1. Accuracy improves.\n\
2) Cost drops.\n\
* Robust to noise.\n\
**Personal takeaway:**\n\
Worth a read.\n";
        let parsed = parse_completion(completion);
        assert_eq!(parsed.fields.title, "Deep Nets");
        assert_eq!(parsed.fields.field_or_topic, "Vision");
        assert_eq!(
            parsed.fields.key_findings,
            vec!["Accuracy improves.", "Cost drops.", "Robust to noise."]
        );
        assert_eq!(parsed.fields.personal_takeaway, "Worth a read.");
        assert_eq!(
            parsed.missing,
            vec![
                Section::ResearchQuestion,
                Section::Methodology,
                Section::Limitations
            ]
        );
    }

    #[test]
    fn decimal_numbers_in_findings_are_kept_verbatim() {
        let completion = "Key Findings:\n\
- The model reaches a\n\
3.5x speedup over the baseline.\n\
2.4% of users churned.\n\
- 10.5 points higher on average.\n\
Limitations: None.\n";
        let parsed = parse_completion(completion);
        assert_eq!(
            parsed.fields.key_findings,
            vec![
                "The model reaches a 3.5x speedup over the baseline.",
                "2.4% of users churned.",
                "10.5 points higher on average.",
            ]
        );
        assert_eq!(parsed.fields.limitations, "None.");
    }

    #[test]
    fn bare_bullet_markers_are_dropped() {
        let parsed = parse_completion("Key Findings:\n-\n- Real finding\n*\n1.\n");
        assert_eq!(parsed.fields.key_findings, vec!["Real finding"]);

        let parsed = parse_completion("Key Findings:\n-\n");
        assert!(parsed.fields.key_findings.is_empty());
        assert!(parsed.missing.contains(&Section::KeyFindings));
    }

    #[test]
    fn unlabeled_text_yields_empty_record() {
        for input in ["", "   \n\n", "The model refused to answer.", ":::", "```"] {
            let parsed = parse_completion(input);
            assert_eq!(parsed.fields, DigestFields::default(), "{input:?}");
            assert!(parsed.is_unrecognized());
        }
    }

    #[test]
    fn multibyte_and_odd_input_never_panics() {
        for input in [
            "1",
            "12.",
            "• ",
            "Key Findings:\n-",
            "タイトル: 論文\nTitle: 論文のタイトル",
            "Title:",
            "**",
        ] {
            let _ = parse_completion(input);
        }
        assert_eq!(
            parse_completion("タイトル: 論文\nTitle: 論文のタイトル").fields.title,
            "論文のタイトル"
        );
    }

    #[test]
    fn json_completion_in_code_fence_is_read() {
        let completion = "```json\n{\n  \"title\": \"Foo\",\n  \"field_or_topic\": \"NLP\",\n  \"key_findings\": \"Only one\",\n  \"limitations\": null\n}\n```";
        let parsed = parse_completion(completion);
        assert_eq!(parsed.fields.title, "Foo");
        assert_eq!(parsed.fields.field_or_topic, "NLP");
        assert_eq!(parsed.fields.key_findings, vec!["Only one"]);
        assert_eq!(parsed.fields.limitations, "");
        assert!(parsed.missing.contains(&Section::Limitations));
    }

    #[test]
    fn json_findings_list_keeps_order() {
        let parsed = parse_completion(r#"{"key_findings": ["a", "", "b", 3]}"#);
        assert_eq!(parsed.fields.key_findings, vec!["a", "b", "3"]);
    }

    #[test]
    fn inline_findings_after_label_start_the_list() {
        let parsed = parse_completion("Key Findings: One thing.\n- Another.\nLimitations: few");
        assert_eq!(parsed.fields.key_findings, vec!["One thing.", "Another."]);
        assert_eq!(parsed.fields.limitations, "few");
    }

    #[test]
    fn markdown_note_lists_all_sections() {
        let parsed = parse_completion(TEMPLATE_COMPLETION);
        let record = DigestRecord::new(
            parsed.fields,
            &SourceInput::Url("https://example.com/foo".to_owned()),
        );
        let note = render_markdown(&record);
        assert!(note.starts_with("# Foo\n"));
        assert!(note.contains("- Z holds.\n"));
        assert!(note.contains("**Limitations:** Small sample."));
        assert!(note.contains("_Source: https://example.com/foo · "));
    }

    #[test]
    fn markdown_note_has_placeholder_title() {
        let record = DigestRecord::new(
            DigestFields::default(),
            &SourceInput::RawText("x".to_owned()),
        );
        assert!(render_markdown(&record).starts_with("# Untitled paper\n"));
    }
}
