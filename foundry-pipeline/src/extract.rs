//! Extraction prompts and parsing of the structured answers.

use foundry_core::{FoundryError, FoundryResult, Tags};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Title used when the case-study answer has none.
pub const UNTITLED: &str = "Untitled Customer Story";

pub const CASE_STUDY_INSTRUCTIONS: &str = "\
You extract structured information from Microsoft customer success story text.
When given the text content of a customer story page, extract and return ONLY
a valid JSON object with these fields:
{
  \"title\": \"<story title>\",
  \"customer_name\": \"<customer organization name>\",
  \"short_summary\": \"<1-2 sentence summary of the project>\",
  \"context\": \"<200-400 word description: challenges faced, Azure solution adopted, and measurable outcomes>\",
  \"tags\": [\"<Azure service or technology>\", ...],
  \"reference_url\": \"<original URL if mentioned or provided, else empty string>\"
}
Be factual and precise. Return ONLY the JSON object with no markdown fences,
no explanations, and no extra text.
";

pub const ARCHITECTURE_INSTRUCTIONS: &str = "\
You are a cloud solution architect. When given a project title, customer name,
context description, and list of technology tags, generate a structured JSON
representation of the solution architecture following this exact schema:
{
  \"diagram_type\": \"solution_architecture\",
  \"components\": [
    {\"name\": \"<component name>\", \"type\": \"<Azure service type>\", \"description\": \"<what it does in the solution>\"}
  ],
  \"connections\": [
    {\"from\": \"<component A name>\", \"to\": \"<component B name>\", \"description\": \"<data or control flow description>\"}
  ],
  \"patterns\": [\"<architectural pattern>\", ...]
}
Derive the components and connections from the context description and tags.
Each component should correspond to a real Azure service or architectural
building block mentioned or implied by the project context.
Return ONLY the JSON object with no markdown fences, no explanations, and no
extra text.
";

static FENCED: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$"));

// ============================================================================
// CASE STUDY
// ============================================================================

/// Fields extracted from a customer story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseStudy {
    pub title: String,
    pub customer_name: String,
    pub short_summary: String,
    pub context: String,
    pub tags: Tags,
    pub reference_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCaseStudy {
    title: Option<String>,
    customer_name: Option<String>,
    short_summary: Option<String>,
    context: Option<String>,
    tags: Option<RawTags>,
    reference_url: Option<String>,
}

/// Models answer with either a tag list or one comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTags {
    List(Vec<String>),
    Joined(String),
}

impl From<RawTags> for Tags {
    fn from(raw: RawTags) -> Self {
        match raw {
            RawTags::List(items) => items.into_iter().collect(),
            RawTags::Joined(joined) => Tags::parse(&joined),
        }
    }
}

pub fn case_study_message(page_text: &str, source_url: &str) -> String {
    format!("Reference URL: {}\n\nPage content:\n{}", source_url, page_text)
}

/// Parse the case-study answer.
///
/// A missing title becomes [`UNTITLED`]; an empty reference URL becomes
/// `source_url`. An empty `context` leaves nothing to embed and is rejected.
pub fn parse_case_study(raw: &str, source_url: &str) -> FoundryResult<CaseStudy> {
    let parsed: RawCaseStudy = serde_json::from_str(strip_fences(raw)).map_err(|e| {
        FoundryError::invalid_response("case study extraction", format!("not a JSON object: {}", e))
    })?;

    let non_blank = |s: Option<String>| s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    let context = non_blank(parsed.context).ok_or_else(|| {
        FoundryError::invalid_response("case study extraction", "answer has no context")
    })?;

    Ok(CaseStudy {
        title: non_blank(parsed.title).unwrap_or_else(|| UNTITLED.to_string()),
        customer_name: non_blank(parsed.customer_name).unwrap_or_default(),
        short_summary: non_blank(parsed.short_summary).unwrap_or_default(),
        context,
        tags: parsed.tags.map(Tags::from).unwrap_or_default(),
        reference_url: non_blank(parsed.reference_url).unwrap_or_else(|| source_url.to_string()),
    })
}

// ============================================================================
// ARCHITECTURE
// ============================================================================

/// A validated architecture description.
#[derive(Debug, Clone, PartialEq)]
pub struct Architecture {
    /// Compact JSON, stored verbatim in the entry.
    pub json: String,
    pub components: Vec<String>,
    pub patterns: Vec<String>,
}

pub fn architecture_message(case: &CaseStudy) -> String {
    let technologies: Vec<&str> = case.tags.iter().collect();
    format!(
        "Title: {}\nCustomer: {}\nTechnologies: {}\n\nContext:\n{}",
        case.title,
        case.customer_name,
        technologies.join(", "),
        case.context
    )
}

/// Parse the architecture answer, which must be a JSON object.
pub fn parse_architecture(raw: &str) -> FoundryResult<Architecture> {
    let invalid = |reason: String| FoundryError::invalid_response("architecture extraction", reason);

    let value: Value = serde_json::from_str(strip_fences(raw))
        .map_err(|e| invalid(format!("not valid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| invalid("answer is not a JSON object".to_string()))?;

    let components = object
        .get("components")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|c| c.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let patterns = object
        .get("patterns")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    Ok(Architecture {
        json: value.to_string(),
        components,
        patterns,
    })
}

/// Drop a surrounding markdown code fence, which agents add despite instructions.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Ok(re) = &*FENCED {
        if let Some(body) = re.captures(trimmed).and_then(|c| c.get(1)) {
            return body.as_str();
        }
    }
    trimmed
}

// =============================================================================
// TESTS
// =============================================================================
