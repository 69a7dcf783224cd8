//! Script-based choice of the answer template.

use crate::config::{AnswerTemplate, DEFAULT_LANGUAGE};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Maps input text to a language tag by Unicode script range.
///
/// The first character that falls in any template's ranges decides the tag
/// for the whole text. Text with no such character gets [`DEFAULT_LANGUAGE`].
#[derive(Debug, Clone)]
pub struct LanguageRouter {
    rules: Vec<(String, Vec<RangeInclusive<u32>>)>,
}

impl LanguageRouter {
    pub fn new(templates: &BTreeMap<String, AnswerTemplate>) -> Self {
        let rules = templates
            .iter()
            .filter(|(_, template)| !template.scripts.is_empty())
            .map(|(tag, template)| {
                let ranges = template.scripts.iter().map(|[lo, hi]| *lo..=*hi).collect();
                (tag.clone(), ranges)
            })
            .collect();

        Self { rules }
    }

    pub fn detect_language(&self, text: &str) -> &str {
        for c in text.chars() {
            let code = c as u32;
            for (tag, ranges) in &self.rules {
                if ranges.iter().any(|range| range.contains(&code)) {
                    return tag;
                }
            }
        }
        DEFAULT_LANGUAGE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;

    fn router() -> LanguageRouter {
        LanguageRouter::new(&Prompts::default().answer)
    }

    #[test]
    fn test_bengali_routes_to_bn() {
        assert_eq!(router().detect_language("আমি ফিনল্যান্ডে পড়তে চাই"), "bn");
    }

    #[test]
    fn test_english_routes_to_default() {
        assert_eq!(router().detect_language("I want to study in Finland"), DEFAULT_LANGUAGE);
        assert_eq!(router().detect_language(""), DEFAULT_LANGUAGE);
    }

    #[test]
    fn test_single_bengali_character_is_enough() {
        assert_eq!(router().detect_language("Finland খরচ?"), "bn");
        assert_eq!(router().detect_language("price \u{09FF}"), "bn");
        assert_eq!(router().detect_language("price \u{0980}"), "bn");
    }

    #[test]
    fn test_neighbouring_scripts_are_not_bengali() {
        // Devanagari and Gurmukhi sit on either side of the Bengali block
        assert_eq!(router().detect_language("नमस्ते"), DEFAULT_LANGUAGE);
        assert_eq!(router().detect_language("\u{0A05}"), DEFAULT_LANGUAGE);
    }

    #[test]
    fn test_extra_templates_route_by_their_ranges() {
        let mut templates = Prompts::default().answer;
        templates.insert(
            "hi".to_string(),
            AnswerTemplate {
                scripts: vec![[0x0900, 0x097F]],
                ..AnswerTemplate::default()
            },
        );

        let router = LanguageRouter::new(&templates);
        assert_eq!(router.detect_language("नमस्ते"), "hi");
        assert_eq!(router.detect_language("নমস্কার"), "bn");
    }
}
