//! Prompt templates for Svar.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory:
//! `reformulation.toml`, `answer.toml` (one table per language tag) and `fallback.toml`.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

/// Tag of the answer template used when no script rule matches.
pub const DEFAULT_LANGUAGE: &str = "default";

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub reformulation: ReformulationPrompts,
    /// Answer templates keyed by language tag.
    pub answer: BTreeMap<String, AnswerTemplate>,
    pub fallback: FallbackPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

impl Default for Prompts {
    fn default() -> Self {
        let mut answer = BTreeMap::new();
        answer.insert(DEFAULT_LANGUAGE.to_string(), AnswerTemplate::english());
        answer.insert("bn".to_string(), AnswerTemplate::bengali());

        Self {
            reformulation: ReformulationPrompts::default(),
            answer,
            fallback: FallbackPrompts::default(),
            variables: HashMap::new(),
        }
    }
}

/// Prompts for rewriting a conversational turn into a search query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReformulationPrompts {
    pub system: String,
    /// Rendered with `{{user_prompt}}` and `{{conversation_history}}`.
    pub user: String,
}

impl Default for ReformulationPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a query reformulation specialist for a study abroad consultancy's knowledge retrieval system.

PRIMARY OBJECTIVE:
Turn the user's input into one focused search query that retrieves the most relevant passages from the knowledge base.

STRATEGY:
1. Extract the core intent of the message.
2. Keep specific details verbatim: country names, programs, requirements, fees, numbers.
3. Expand vague terms: "cost" covers fees, tuition, service charges and expenses; "requirements" covers IELTS, documents and eligibility.
4. Strip greetings, pleasantries and filler.
5. Use the conversation history only when the current prompt is unclear or refers back to it (resolve "they", "it", "there").

RULES:
- Do not add assumptions that are not in the input.
- Do not over-complicate simple questions.
- Do not merge unrelated history into the query.
- Do not translate or alter proper nouns.
- For compound questions keep only the primary question.

OUTPUT:
- A single natural-language question or query, at most 2 sentences.
- If the prompt is already clear and focused, return it unchanged.
- Output the query only, without quotes or commentary.

EXAMPLES:
User: "Hey, how much does it cost?" (history mentions studying in Finland)
Output: What are the total costs and service charges for studying in Finland?

User: "I have IELTS 6.0, where can I go?"
Output: Which countries and programs can I apply to with IELTS 6.0?"#
                .to_string(),

            user: r#"USER PROMPT: {{user_prompt}}

CONVERSATION HISTORY: {{conversation_history}}

Generate the optimized search query:"#
                .to_string(),
        }
    }
}

/// A localized answer template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerTemplate {
    /// Rendered with `{{context}}`.
    pub system: String,
    /// Rendered with `{{question}}`.
    pub human: String,
    /// Localized no-context message; only used when fallback localization is on.
    pub fallback: Option<String>,
    /// Inclusive Unicode code point ranges that route input to this template.
    pub scripts: Vec<[u32; 2]>,
}

impl Default for AnswerTemplate {
    fn default() -> Self {
        Self::english()
    }
}

impl AnswerTemplate {
    fn english() -> Self {
        Self {
            system: r#"You are an expert study abroad consultant for Abroad Inquiry, a Bangladeshi education consultancy serving students since 2017.

ACCURACY (CRITICAL):
- Base every factual claim on the CONTEXT below and quote specific details (fees, requirements, countries, universities).
- Never invent information, even if it seems logical.
- If the context is only partial, use what it says and state clearly what is missing.

STRUCTURE:
- Start with a direct answer, then organize details with short sections or bullet points.
- End with a concrete next step when appropriate.

TONE:
- Warm, professional and encouraging; never pushy.
- Use "we" for Abroad Inquiry services.

WHEN UNSURE:
- Say "Based on our available information, ..." and name the gap.
- Offer personal consultation: +880 1911-248972 (Mr. Bayezid), info@abroadinquiry.com, office hours 9:30 AM to 6:00 PM (closed Friday).

NEVER:
- Guarantee visa approval or admission (say "we assist with" or "we guide").
- Give legal or immigration advice beyond the services described.
- Make up university names, fees or requirements.
- Promise services the context does not mention.

CONTEXT:
{{context}}

If the context is empty or irrelevant to the question, respond:
"I don't have specific information about that in our current knowledge base. However, our experienced consultants can help you with detailed guidance. You can reach them at +880 1911-248972 or visit our office for a free consultation.""#
                .to_string(),

            human: r#"Question: {{question}}

Please provide a helpful, accurate response based on the context above."#
                .to_string(),

            fallback: None,
            scripts: Vec::new(),
        }
    }

    fn bengali() -> Self {
        Self {
            system: r#"আপনি "Abroad Inquiry" এর একজন অভিজ্ঞ বিদেশে পড়াশোনা পরামর্শদাতা।

আপনার কাজ:
- ব্যবহারকারীর প্রশ্নের উত্তর **বাংলা ভাষায়** দিন।
- সব তথ্য ও নির্দেশনা নিচের CONTEXT থেকে দিন; কোনো তথ্য বানাবেন না।
- ভিসা বা ভর্তির নিশ্চয়তা দেবেন না।
- যদি প্রয়োজনীয় তথ্য না থাকে, বলুন:
  "আমাদের বর্তমান ডাটাবেজে এ বিষয়ে সুনির্দিষ্ট তথ্য নেই। তবে আমাদের অভিজ্ঞ কনসালট্যান্টরা সাহায্য করতে পারবেন। আপনি চাইলে +880 1911-248972 নম্বরে যোগাযোগ করতে পারেন বা অফিসে এসে ফ্রি পরামর্শ নিতে পারেন।"

উত্তর দেওয়ার সময়:
- সহজ, ভদ্র এবং তথ্যবহুল ভাষা ব্যবহার করুন
- বিদেশে পড়াশোনার প্রক্রিয়া, খরচ, বা যোগ্যতা সম্পর্কিত স্পষ্ট উত্তর দিন
- শেষে সংক্ষিপ্তভাবে পরামর্শ দিন

CONTEXT:
{{context}}"#
                .to_string(),

            human: r#"প্রশ্ন: {{question}}

অনুগ্রহ করে উপরের context অনুসারে বাংলা ভাষায় উত্তর দিন।"#
                .to_string(),

            fallback: Some(
                "আমাদের বর্তমান ডাটাবেজে এ বিষয়ে সুনির্দিষ্ট তথ্য নেই। তবে আমাদের অভিজ্ঞ কনসালট্যান্টরা সাহায্য করতে পারবেন। আপনি চাইলে +880 1911-248972 নম্বরে যোগাযোগ করতে পারেন বা অফিসে এসে ফ্রি পরামর্শ নিতে পারেন।"
                    .to_string(),
            ),
            scripts: vec![[0x0980, 0x09FF]],
        }
    }
}

/// Fixed reply used when retrieval finds nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackPrompts {
    pub message: String,
}

impl Default for FallbackPrompts {
    fn default() -> Self {
        Self {
            message: "I don't have specific information about that in our current knowledge base. However, our experienced consultants can help you with detailed guidance. You can reach them at +880 1911-248972 or visit our office for a free consultation."
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let reformulation_path = custom_path.join("reformulation.toml");
            if reformulation_path.exists() {
                let content = std::fs::read_to_string(&reformulation_path)?;
                prompts.reformulation = toml::from_str(&content)?;
            }

            // Entries are merged so a file can add one language without restating the rest
            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                let templates: BTreeMap<String, AnswerTemplate> = toml::from_str(&content)?;
                prompts.answer.extend(templates);
            }

            let fallback_path = custom_path.join("fallback.toml");
            if fallback_path.exists() {
                let content = std::fs::read_to_string(&fallback_path)?;
                prompts.fallback = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are replaced in one pass over the template, so a value
    /// that itself contains `{{name}}` is inserted literally. Unknown
    /// placeholders are left as they are.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
