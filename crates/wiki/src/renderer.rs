//! Wiki entry rendering
//!
//! Pure serialization of a synthesized entry into one of four formats:
//! markdown, HTML, plain text, or structured JSON. Rendering never mutates
//! the entry; `include_sources=false` suppresses citations in the output
//! while the entry itself keeps them. All source-derived text is escaped in
//! HTML output.

use chronicler_common::errors::{AppError, Result};
use chronicler_common::models::{WikiEntry, WikiSection};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Markdown,
    Html,
    Text,
    Structured,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Html => "html",
            OutputFormat::Text => "text",
            OutputFormat::Structured => "structured",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "markdown" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            "text" => Ok(OutputFormat::Text),
            "structured" => Ok(OutputFormat::Structured),
            other => Err(AppError::InvalidArgument {
                message: format!("unsupported output format: {}", other),
            }),
        }
    }
}

/// Render an entry into the requested format
pub fn render(entry: &WikiEntry, format: OutputFormat, include_sources: bool) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(render_markdown(entry, include_sources)),
        OutputFormat::Html => Ok(render_html(entry, include_sources)),
        OutputFormat::Text => Ok(render_text(entry, include_sources)),
        OutputFormat::Structured => render_structured(entry, include_sources),
    }
}

fn render_markdown(entry: &WikiEntry, include_sources: bool) -> String {
    let mut lines = vec![format!("# {}", entry.title), String::new()];

    if !entry.summary.is_empty() {
        lines.push(entry.summary.clone());
        lines.push(String::new());
    }

    // Table of contents for entries with multiple sections
    if entry.sections.len() > 2 {
        lines.push("## Contents".to_string());
        lines.push(String::new());
        for (i, section) in entry.sections.iter().enumerate() {
            let anchor = section.heading.to_lowercase().replace(' ', "-");
            lines.push(format!("{}. [{}](#{})", i + 1, section.heading, anchor));
        }
        lines.push(String::new());
    }

    for section in &entry.sections {
        markdown_section(&mut lines, section, 2, include_sources);
    }

    if include_sources && !entry.all_sources.is_empty() {
        lines.push(String::new());
        lines.push("## References".to_string());
        lines.push(String::new());
        for (i, source) in entry.all_sources.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, source.format_citation()));
        }
    }

    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(format!(
        "*Generated from {} sources*",
        entry.all_sources.len()
    ));

    lines.join("\n")
}

fn markdown_section(
    lines: &mut Vec<String>,
    section: &WikiSection,
    level: usize,
    include_sources: bool,
) {
    let prefix = "#".repeat(level.min(6));
    lines.push(format!("{} {}", prefix, section.heading));
    lines.push(String::new());
    if !section.content.is_empty() {
        lines.push(section.content.clone());
        lines.push(String::new());
    }

    if include_sources && !section.sources.is_empty() {
        let refs = section
            .sources
            .iter()
            .take(3)
            .map(|s| {
                format!(
                    "[{}]",
                    s.document_title.as_deref().unwrap_or(&s.source_path)
                )
            })
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("*Sources: {}*", refs));
        lines.push(String::new());
    }

    for subsection in &section.subsections {
        markdown_section(lines, subsection, level + 1, include_sources);
    }
}

fn render_html(entry: &WikiEntry, include_sources: bool) -> String {
    let mut parts = vec![
        "<!DOCTYPE html>".to_string(),
        "<html lang=\"en\">".to_string(),
        "<head>".to_string(),
        format!("<title>{}</title>", escape_html(&entry.title)),
        "<meta charset=\"UTF-8\">".to_string(),
        "<style>".to_string(),
        "body { font-family: system-ui, sans-serif; max-width: 800px; margin: 0 auto; padding: 2rem; }".to_string(),
        "h1 { border-bottom: 2px solid #333; padding-bottom: 0.5rem; }".to_string(),
        ".summary { font-size: 1.1rem; color: #555; }".to_string(),
        ".section { margin: 2rem 0; }".to_string(),
        ".source { font-size: 0.9rem; color: #666; }".to_string(),
        ".references { margin-top: 3rem; padding-top: 1rem; border-top: 1px solid #ddd; }".to_string(),
        ".confidence { font-size: 0.8rem; color: #999; }".to_string(),
        "</style>".to_string(),
        "</head>".to_string(),
        "<body>".to_string(),
        "<article>".to_string(),
        format!("<h1>{}</h1>", escape_html(&entry.title)),
    ];

    if !entry.summary.is_empty() {
        parts.push(format!(
            "<p class=\"summary\">{}</p>",
            escape_html(&entry.summary)
        ));
    }

    for section in &entry.sections {
        html_section(&mut parts, section, 2, include_sources);
    }

    if include_sources && !entry.all_sources.is_empty() {
        parts.push("<section class=\"references\">".to_string());
        parts.push("<h2>References</h2>".to_string());
        parts.push("<ol>".to_string());
        for source in &entry.all_sources {
            parts.push(format!("<li>{}</li>", escape_html(&source.format_citation())));
        }
        parts.push("</ol>".to_string());
        parts.push("</section>".to_string());
    }

    parts.push("</article>".to_string());
    parts.push("</body>".to_string());
    parts.push("</html>".to_string());

    parts.join("\n")
}

fn html_section(
    parts: &mut Vec<String>,
    section: &WikiSection,
    level: usize,
    include_sources: bool,
) {
    let tag = format!("h{}", level.min(6));

    parts.push("<section class=\"section\">".to_string());
    parts.push(format!(
        "<{}>{}</{}>",
        tag,
        escape_html(&section.heading),
        tag
    ));

    for paragraph in section.content.split("\n\n") {
        if !paragraph.trim().is_empty() {
            parts.push(format!("<p>{}</p>", escape_html(paragraph)));
        }
    }

    if include_sources && !section.sources.is_empty() {
        let refs = section
            .sources
            .iter()
            .take(3)
            .map(|s| {
                escape_html(s.document_title.as_deref().unwrap_or(&s.source_path))
            })
            .collect::<Vec<_>>()
            .join(", ");
        parts.push(format!("<p class=\"source\">Sources: {}</p>", refs));
    }

    if section.confidence > 0.0 {
        let confidence_pct = (section.confidence * 100.0) as u32;
        parts.push(format!(
            "<p class=\"confidence\">Confidence: {}%</p>",
            confidence_pct
        ));
    }

    for subsection in &section.subsections {
        html_section(parts, subsection, level + 1, include_sources);
    }

    parts.push("</section>".to_string());
}

fn render_text(entry: &WikiEntry, include_sources: bool) -> String {
    let mut lines = vec![
        entry.title.to_uppercase(),
        "=".repeat(entry.title.chars().count()),
        String::new(),
    ];

    if !entry.summary.is_empty() {
        lines.push(entry.summary.clone());
        lines.push(String::new());
    }

    for section in &entry.sections {
        text_section(&mut lines, section, 0);
    }

    if include_sources && !entry.all_sources.is_empty() {
        lines.push(String::new());
        lines.push("REFERENCES".to_string());
        lines.push("-".repeat(10));
        lines.push(String::new());
        for (i, source) in entry.all_sources.iter().enumerate() {
            lines.push(format!("[{}] {}", i + 1, source.format_citation()));
        }
    }

    lines.join("\n")
}

fn text_section(lines: &mut Vec<String>, section: &WikiSection, level: usize) {
    let indent = "  ".repeat(level);

    lines.push(format!("{}{}", indent, section.heading));
    lines.push(format!(
        "{}{}",
        indent,
        "-".repeat(section.heading.chars().count())
    ));
    lines.push(String::new());

    for line in section.content.lines() {
        lines.push(format!("{}{}", indent, line));
    }
    lines.push(String::new());

    for subsection in &section.subsections {
        text_section(lines, subsection, level + 1);
    }
}

fn render_structured(entry: &WikiEntry, include_sources: bool) -> Result<String> {
    if include_sources {
        Ok(serde_json::to_string_pretty(entry)?)
    } else {
        let mut stripped = entry.clone();
        stripped.all_sources.clear();
        for section in &mut stripped.sections {
            strip_section_sources(section);
        }
        Ok(serde_json::to_string_pretty(&stripped)?)
    }
}

fn strip_section_sources(section: &mut WikiSection) {
    section.sources.clear();
    for subsection in &mut section.subsections {
        strip_section_sources(subsection);
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chronicler_common::models::WikiSource;
    use uuid::Uuid;

    fn sample_source(title: &str) -> WikiSource {
        WikiSource {
            chunk_id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            document_title: Some(title.to_string()),
            source_path: format!("docs/{}.pdf", title),
            page_number: Some(7),
            section: Some("Rivers".into()),
            relevance_score: 0.8,
            excerpt: "Rivers flow downhill.".into(),
        }
    }

    fn sample_entry() -> WikiEntry {
        let source = sample_source("Atlas");
        WikiEntry {
            entry_id: Uuid::new_v4(),
            title: "River Deltas".into(),
            summary: "Deltas form where rivers slow.".into(),
            sections: vec![WikiSection {
                heading: "Formation".into(),
                content: "Sediment settles as the current weakens.".into(),
                sources: vec![source.clone()],
                confidence: 0.72,
                subsections: vec![WikiSection {
                    heading: "Sediment Load".into(),
                    content: "Heavier grains settle first.".into(),
                    sources: vec![sample_source("Survey")],
                    confidence: 0.6,
                    subsections: Vec::new(),
                }],
            }],
            all_sources: vec![source, sample_source("Survey")],
            generated_at: Utc::now(),
            query: "how do deltas form".into(),
        }
    }

    fn strip_tags(html: &str) -> String {
        let mut out = String::new();
        let mut in_tag = false;
        for c in html.chars() {
            match c {
                '<' => in_tag = true,
                '>' => in_tag = false,
                c if !in_tag => out.push(c),
                _ => {}
            }
        }
        out
    }

    #[test]
    fn test_unknown_format_rejected() {
        let err = "pptx".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument { .. }));
        assert_eq!("markdown".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!(
            "structured".parse::<OutputFormat>().unwrap(),
            OutputFormat::Structured
        );
    }

    #[test]
    fn test_markdown_structure() {
        let entry = sample_entry();
        let markdown = render(&entry, OutputFormat::Markdown, true).unwrap();

        assert!(markdown.starts_with("# River Deltas"));
        assert!(markdown.contains("## Formation"));
        assert!(markdown.contains("### Sediment Load"));
        assert!(markdown.contains("## References"));
        assert!(markdown.contains("*Generated from 2 sources*"));
    }

    #[test]
    fn test_markdown_without_sources() {
        let entry = sample_entry();
        let markdown = render(&entry, OutputFormat::Markdown, false).unwrap();
        assert!(!markdown.contains("## References"));
        assert!(!markdown.contains("*Sources:"));
        // The entry itself keeps its citations
        assert_eq!(entry.all_sources.len(), 2);
    }

    #[test]
    fn test_html_escapes_source_text() {
        let mut entry = sample_entry();
        entry.sections[0].content = "Watch out for <script>alert('x')</script> tags.".into();
        let html = render(&entry, OutputFormat::Html, true).unwrap();

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&#39;x&#39;"));
    }

    #[test]
    fn test_html_round_trip_preserves_content() {
        let entry = sample_entry();
        let html = render(&entry, OutputFormat::Html, true).unwrap();
        let stripped = strip_tags(&html);

        assert!(stripped.contains("River Deltas"));
        assert!(stripped.contains("Formation"));
        assert!(stripped.contains("Sediment Load"));
        assert!(stripped.contains("Sediment settles as the current weakens."));
        assert!(stripped.contains("Heavier grains settle first."));
    }

    #[test]
    fn test_text_format() {
        let entry = sample_entry();
        let text = render(&entry, OutputFormat::Text, true).unwrap();

        assert!(text.starts_with("RIVER DELTAS"));
        assert!(text.contains("Formation"));
        assert!(text.contains("REFERENCES"));
        assert!(text.contains("[1]"));
    }

    #[test]
    fn test_structured_round_trips() {
        let entry = sample_entry();
        let json = render(&entry, OutputFormat::Structured, true).unwrap();
        let parsed: WikiEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn test_structured_without_sources_strips_citations() {
        let entry = sample_entry();
        let json = render(&entry, OutputFormat::Structured, false).unwrap();
        let parsed: WikiEntry = serde_json::from_str(&json).unwrap();

        assert!(parsed.all_sources.is_empty());
        assert!(parsed.sections[0].sources.is_empty());
        assert!(parsed.sections[0].subsections[0].sources.is_empty());
        // Content survives
        assert_eq!(parsed.sections[0].content, entry.sections[0].content);
    }

    #[test]
    fn test_render_is_pure() {
        let entry = sample_entry();
        let first = render(&entry, OutputFormat::Markdown, true).unwrap();
        let second = render(&entry, OutputFormat::Markdown, true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("a & b < c > \"d\" 'e'"),
            "a &amp; b &lt; c &gt; &quot;d&quot; &#39;e&#39;"
        );
    }
}
