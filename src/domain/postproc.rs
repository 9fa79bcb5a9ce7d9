//! Text-level post-processors
//!
//! Post-processors rewrite the working text of already-ordered units.
//! They never mutate their input; each pass returns fresh copies with
//! the rewritten text. Unknown processor names are logged and skipped.

use log::warn;

use super::source_unit::SourceUnit;

/// A single post-processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    /// Removes `//<MARKER> … //</MARKER>` and `/*<MARKER>*/ … /*</MARKER>*/`
    /// spans, markers included.
    StripSpans { marker: String },

    /// Ensures the text starts with a `;` line, guarding concatenation
    /// against a preceding unterminated expression.
    Semicolon,
}

impl PostProcessor {
    /// Parses a processor name as given on the command line:
    /// `semicolon` or `strip:MARKER`.
    pub fn parse(name: &str) -> Option<PostProcessor> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("semicolon") {
            return Some(PostProcessor::Semicolon);
        }
        name.strip_prefix("strip:")
            .filter(|marker| !marker.is_empty())
            .map(|marker| PostProcessor::StripSpans {
                marker: marker.to_string(),
            })
    }

    /// Applies this pass to every unit, returning rewritten copies.
    pub fn process(&self, units: &[SourceUnit]) -> Vec<SourceUnit> {
        units
            .iter()
            .map(|unit| unit.with_working_text(self.apply(unit.working_text())))
            .collect()
    }

    fn apply(&self, text: &str) -> String {
        match self {
            PostProcessor::StripSpans { marker } => {
                let text = strip_spans(text, &format!("//<{marker}>"), &format!("//</{marker}>"));
                strip_spans(&text, &format!("/*<{marker}>*/"), &format!("/*</{marker}>*/"))
            }
            PostProcessor::Semicolon => {
                if text.trim_start().starts_with(';') {
                    text.to_string()
                } else {
                    format!(";\n{text}")
                }
            }
        }
    }
}

/// Applies every named processor in order. Unknown names are skipped
/// with a warning.
pub fn process_all(mut units: Vec<SourceUnit>, names: &[String]) -> Vec<SourceUnit> {
    for name in names {
        match PostProcessor::parse(name) {
            Some(processor) => units = processor.process(&units),
            None => warn!("unknown post-processor: {name}"),
        }
    }
    units
}

/// Removes every `open … close` span, markers included. An unclosed
/// span is left untouched.
fn strip_spans(text: &str, open: &str, close: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(open) {
        match rest[start + open.len()..].find(close) {
            Some(end) => {
                result.push_str(&rest[..start]);
                rest = &rest[start + open.len() + end + close.len()..];
            }
            None => break,
        }
    }
    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(body: &str) -> SourceUnit {
        let text = format!("/*\n---\ndescription: t\nprovides: [A]\n...\n*/\n{body}");
        SourceUnit::from_text(&text, None).unwrap()
    }

    #[test]
    fn parse_names() {
        assert_eq!(PostProcessor::parse("semicolon"), Some(PostProcessor::Semicolon));
        assert_eq!(
            PostProcessor::parse("strip:compat12"),
            Some(PostProcessor::StripSpans {
                marker: "compat12".to_string()
            })
        );
        assert_eq!(PostProcessor::parse("bogus"), None);
        assert_eq!(PostProcessor::parse("strip:"), None);
    }

    #[test]
    fn strips_line_comment_spans() {
        let unit = unit("keep();\n//<compat>\nlegacy();\n//</compat>\nalso_keep();\n");
        let processed = PostProcessor::parse("strip:compat").unwrap().process(&[unit]);
        let text = processed[0].working_text();
        assert!(text.contains("keep();"));
        assert!(text.contains("also_keep();"));
        assert!(!text.contains("legacy();"));
    }

    #[test]
    fn strips_block_comment_spans() {
        let unit = unit("a();\n/*<ie8>*/ shim(); /*</ie8>*/\nb();\n");
        let processed = PostProcessor::parse("strip:ie8").unwrap().process(&[unit]);
        let text = processed[0].working_text();
        assert!(!text.contains("shim();"));
        assert!(text.contains("a();"));
        assert!(text.contains("b();"));
    }

    #[test]
    fn unclosed_span_is_left_alone() {
        let unit = unit("a();\n//<compat>\nno_close();\n");
        let processed = PostProcessor::parse("strip:compat").unwrap().process(&[unit]);
        assert!(processed[0].working_text().contains("no_close();"));
    }

    #[test]
    fn semicolon_prepends_once() {
        let plain = unit("var a = 1;\n");
        let processed = PostProcessor::Semicolon.process(&[plain]);
        assert!(processed[0].working_text().starts_with(";\n"));

        let again = PostProcessor::Semicolon.process(&processed);
        assert_eq!(again[0].working_text(), processed[0].working_text());
    }

    #[test]
    fn input_units_are_not_mutated() {
        let original = unit("x();\n");
        let before = original.working_text().to_string();
        let _ = PostProcessor::Semicolon.process(&[original.clone()]);
        assert_eq!(original.working_text(), before);
    }

    #[test]
    fn process_all_applies_in_order_and_skips_unknown() {
        let units = vec![unit("//<c>\ndead();\n//</c>\nlive();\n")];
        let names = vec!["strip:c".to_string(), "nope".to_string(), "semicolon".to_string()];
        let result = process_all(units, &names);
        let text = result[0].working_text();
        assert!(text.starts_with(";\n"));
        assert!(!text.contains("dead();"));
        assert!(text.contains("live();"));
    }
}
