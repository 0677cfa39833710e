//! LLM prompts for the extraction phases.
//!
//! Each prompt asks for JSON matching the response shapes in
//! [`pipeline::parse`](crate::pipeline::parse). The exact wording is a
//! tuning concern, not a contract; the pipeline only depends on the JSON
//! shapes.

/// Prompt for judging fragment relevance.
pub const TRIAGE_PROMPT: &str = r#"Triage this news fragment for information extraction.

Decide whether the fragment contains newsworthy factual content worth
extracting (facts, named entities, quotes, figures). If only part of the
text is relevant, return that part.

Output JSON:
{
    "relevant": true | false,
    "reason": "one-line justification",
    "relevant_text": "the portion of the text worth extracting, or null for all of it"
}

Fragment title: {title}
Fragment text:
{text}"#;

/// Prompt for extracting facts and named entities.
pub const EXTRACTION_PROMPT: &str = r#"Extract the verifiable facts and named entities from this news fragment.

Rules:
- A fact is a single verifiable statement, kept close to the source wording.
- An entity is a proper noun: person, organization, or place.
- Do not invent information that is not in the text.

Output JSON:
{
    "facts": [
        {"statement": "...", "category": "politica|economia|sociedad|otro", "confidence": 0.0 to 1.0}
    ],
    "entities": [
        {"name": "...", "kind": "persona|organizacion|lugar", "relevance": 0.0 to 1.0}
    ]
}

Fragment title: {title}
Fragment text:
{text}"#;

/// Prompt for extracting quotes and quantitative data.
pub const QUOTES_PROMPT: &str = r#"Extract direct quotes and quantitative data from this news fragment.

Rules:
- A quote is verbatim quoted speech; include the speaker when attributable.
- A quantitative datum is a figure, percentage, or amount with its meaning.
- Use the facts already extracted as context; do not repeat them.

Output JSON:
{
    "quotes": [
        {"text": "...", "speaker": "name or null", "context": "surrounding context or null", "confidence": 0.0 to 1.0}
    ],
    "data": [
        {"value": 123.4, "unit": "unit or null", "description": "...", "confidence": 0.0 to 1.0}
    ]
}

Facts already extracted:
{facts}

Fragment text:
{text}"#;

/// Fill the triage prompt.
pub fn format_triage_prompt(title: &str, text: &str) -> String {
    TRIAGE_PROMPT
        .replace("{title}", title)
        .replace("{text}", text)
}

/// Fill the extraction prompt.
pub fn format_extraction_prompt(title: &str, text: &str) -> String {
    EXTRACTION_PROMPT
        .replace("{title}", title)
        .replace("{text}", text)
}

/// Fill the quotes/data prompt.
pub fn format_quotes_prompt(facts: &[String], text: &str) -> String {
    let facts_block = if facts.is_empty() {
        "(none)".to_string()
    } else {
        facts
            .iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n")
    };

    QUOTES_PROMPT
        .replace("{facts}", &facts_block)
        .replace("{text}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_filled() {
        let prompt = format_triage_prompt("Título", "Cuerpo del fragmento");
        assert!(prompt.contains("Título"));
        assert!(prompt.contains("Cuerpo del fragmento"));
        assert!(!prompt.contains("{title}"));
        assert!(!prompt.contains("{text}"));
    }

    #[test]
    fn quotes_prompt_lists_facts() {
        let prompt = format_quotes_prompt(
            &["El ministro renunció".to_string()],
            "texto",
        );
        assert!(prompt.contains("- El ministro renunció"));

        let prompt = format_quotes_prompt(&[], "texto");
        assert!(prompt.contains("(none)"));
    }
}
