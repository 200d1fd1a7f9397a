//! Prompt templates and response schemas for the two provider calls.
//!
//! - **Stats lookup**: enumerates every metric of the fallback catalog,
//!   grouped under its category heading, and stamps the request with the
//!   current time so intermediate caches never serve a stale answer.
//! - **Scraper script**: describes the Python program the generator view
//!   displays. The output is treated as opaque text.
//!
//! Schemas use the provider's OpenAPI subset (`ARRAY`, `OBJECT`, `STRING`).

use std::fmt::Write as _;

use serde_json::{Value, json};

use super::GenerateRequest;
use crate::stats::{Category, fallback};

// ---------------------------------------------------------------------------
// Stats lookup
// ---------------------------------------------------------------------------

/// Build the stats prompt for the given cache-busting time reference.
pub fn build_stats_prompt(time_reference: &str) -> String {
    let mut prompt = String::from(
        "Retrieve the current dynamic statistics for the specific list below, \
         based on Worldometers.info data.\n\n\
         You MUST provide a value for EVERY item in this list:\n",
    );

    for (index, (category, labels)) in fallback::catalog().into_iter().enumerate() {
        let _ = write!(prompt, "\n{}. {}:\n", index + 1, category.heading());
        for label in labels {
            let _ = writeln!(prompt, "   - {label}");
        }
    }

    let _ = write!(
        prompt,
        "\nProvide numerical values for all. Current time reference: {time_reference}"
    );
    prompt
}

/// Response schema for the stats lookup: an array of label/value/category objects.
pub fn stats_response_schema() -> Value {
    let categories: Vec<&str> = Category::FIXED.iter().map(|c| c.as_str()).collect();
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "label": { "type": "STRING" },
                "value": { "type": "STRING" },
                "category": { "type": "STRING", "enum": categories },
            },
            "required": ["label", "value", "category"],
        },
    })
}

/// Complete stats request.
pub fn stats_request(time_reference: &str, search_grounding: bool) -> GenerateRequest {
    GenerateRequest {
        prompt: build_stats_prompt(time_reference),
        response_schema: stats_response_schema(),
        search_grounding,
    }
}

// ---------------------------------------------------------------------------
// Scraper script
// ---------------------------------------------------------------------------

const SCRIPT_PROMPT: &str = "\
Create a comprehensive Python application to scrape 'https://www.worldometers.info/'.

Requirements:
1. Target: Extract ALL 60+ dynamic counters shown on the homepage.
2. Specific Data Points:
   - Population (Current, Births/Deaths year/today, Growth)
   - Economics (Public Healthcare/Edu/Military, Cars, Bicycles, Computers)
   - Society (Books, Papers, TV, Phones, Games, Internet, Email, Blogs, Tweets, Google)
   - Environment (Forest, Soil, CO2, Desertification, Toxins)
   - Food (Undernourished, Overweight, Obese, Hunger deaths, Obesity spending)
   - Water (Water used, Water deaths, No safe water)
   - Energy (Total, Renewable/Non-renewable, Solar, Oil/Gas/Coal reserves & days left)
   - Health (Disease deaths, Flu, Child/Maternal mortality, HIV, Cancer, Malaria, Smoking, Alcohol, Suicide, Drugs, Traffic)
3. Challenge: Data is updated via JavaScript (odometer effect).
4. Solution: Use 'Playwright' (async) or 'Selenium' to capture the final rendered numbers.
5. Storage: Store data in a CSV file (e.g., 'world_data.csv'). Each run should append a new row with a timestamp and columns for every single metric.
6. Scheduler: The script must include a configuration variable for frequency (default: 1 hour) and use a scheduler loop to run indefinitely.
7. Code Quality: Clean, commented, robust error handling.

Return a JSON object with:
- 'code': The full Python source code.
- 'explanation': A brief markdown explanation of how it works.
- 'libraries': A list of pip libraries needed.
";

/// Response schema for the script generator.
pub fn script_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "code": { "type": "STRING" },
            "explanation": { "type": "STRING" },
            "libraries": { "type": "ARRAY", "items": { "type": "STRING" } },
        },
        "required": ["code", "explanation", "libraries"],
    })
}

/// Complete script-generation request. Never grounded.
pub fn script_request() -> GenerateRequest {
    GenerateRequest {
        prompt: SCRIPT_PROMPT.to_string(),
        response_schema: script_response_schema(),
        search_grounding: false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
