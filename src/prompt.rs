use serde::Serialize;

pub const DEFAULT_MAX_INPUT_CHARS: usize = 10_000;
pub const DEFAULT_TAKEAWAY_FOCUS: &str =
    "marketing, data, and international/cross-border e-commerce";

/// How far back from the limit a whitespace boundary is searched for.
const WORD_BOUNDARY_WINDOW: usize = 200;

pub const SYSTEM_INSTRUCTIONS: &str = "You are an assistant that summarizes academic papers into structured reading notes. \
Answer only with the requested sections, in the requested order, and nothing else.";

/// Section headings, in the order the model is asked to produce them.
pub const SECTION_HEADINGS: [&str; 7] = [
    "Title",
    "Field or Topic",
    "Research Question",
    "Methodology",
    "Key Findings",
    "Limitations",
    "Personal Takeaway",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub instructions: String,
    pub input: String,
    pub truncated: bool,
    pub original_chars: usize,
    pub kept_chars: usize,
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub takeaway_focus: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            takeaway_focus: DEFAULT_TAKEAWAY_FOCUS.to_owned(),
        }
    }
}

impl PromptTemplate {
    pub fn render(&self, paper_text: &str) -> String {
        let focus = self.takeaway_focus.trim();
        format!(
            "Given the following academic text, write a reading note using exactly these sections, \
one per line, each starting with its heading followed by a colon:\n\
\n\
Title: <the title of the paper>\n\
Field or Topic: <the academic field or topic area>\n\
Research Question: <the main research question(s) addressed>\n\
Methodology: <the research methodology used>\n\
Key Findings:\n\
- <finding 1>\n\
- <finding 2>\n\
- <finding 3>\n\
Limitations: <the limitations of the study>\n\
Personal Takeaway: <why this paper matters for someone interested in {focus}>\n\
\n\
Do not use Markdown headings, code blocks, or any text outside these sections.\n\
\n\
BEGIN_PAPER_TEXT\n\
{paper_text}\n\
END_PAPER_TEXT\n"
        )
    }
}

/// Builds the request for `text`, keeping at most `max_input_chars` characters of it.
pub fn build_prompt(text: &str, template: &PromptTemplate, max_input_chars: usize) -> Prompt {
    let text = text.trim();
    let (kept, truncated) = truncate_chars(text, max_input_chars);
    Prompt {
        instructions: SYSTEM_INSTRUCTIONS.to_owned(),
        input: template.render(kept),
        truncated,
        original_chars: text.chars().count(),
        kept_chars: kept.chars().count(),
    }
}

/// Longest prefix of `text` with at most `max_chars` characters, cut on
/// whitespace when one is close to the limit.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return (text, false);
    };
    let hard = &text[..cut];

    let window_start = hard
        .char_indices()
        .rev()
        .nth(WORD_BOUNDARY_WINDOW.min(max_chars.saturating_sub(1)))
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    let soft = hard[window_start..]
        .rfind(char::is_whitespace)
        .map(|rel| hard[..window_start + rel].trim_end())
        .filter(|soft| !soft.is_empty());

    (soft.unwrap_or(hard), true)
}
