//! Recipe import from third-party web pages.
//!
//! The actual scraping is done by an external program that receives the
//! page URL as its last argument and prints a JSON document on stdout.
//! This module only runs it and turns its output into a recipe draft.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use url::Url;

/// Default time allowed for one scraper run.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How to invoke the scraper program.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub program: String,
    /// Fixed arguments placed before the URL
    pub args: Vec<String>,
    pub timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            program: "recipe-scraper".to_string(),
            args: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug)]
pub enum ScrapeError {
    /// Not an absolute http(s) URL
    InvalidUrl(String),
    /// The program could not be started
    Spawn(std::io::Error),
    /// The program exited unsuccessfully
    Exit { code: Option<i32>, stderr: String },
    /// The program ran longer than the configured timeout
    Timeout,
    /// Stdout was not a scraped recipe document
    Parse(serde_json::Error),
}

impl ScrapeError {
    /// Message returned to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            ScrapeError::InvalidUrl(_) => "Invalid recipe URL",
            ScrapeError::Spawn(_) => "Error spawning scraper process",
            ScrapeError::Exit { .. } | ScrapeError::Timeout => "Error executing scraper",
            ScrapeError::Parse(_) => "Error parsing JSON data",
        }
    }
}

impl std::fmt::Display for ScrapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScrapeError::InvalidUrl(e) => write!(f, "Invalid URL: {}", e),
            ScrapeError::Spawn(e) => write!(f, "Failed to spawn scraper: {}", e),
            ScrapeError::Exit {
                code: Some(code),
                stderr,
            } => write!(f, "Scraper exited with code {}: {}", code, stderr),
            ScrapeError::Exit { code: None, stderr } => {
                write!(f, "Scraper terminated by signal: {}", stderr)
            }
            ScrapeError::Timeout => write!(f, "Scraper timed out"),
            ScrapeError::Parse(e) => write!(f, "Failed to parse scraper output: {}", e),
        }
    }
}

impl std::error::Error for ScrapeError {}

/// Document printed by the scraper program. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
pub struct ScrapedRecipe {
    pub host: String,
    pub title: String,
    #[serde(default)]
    pub total_time: Option<serde_json::Number>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions_list: Vec<String>,
    #[serde(default)]
    pub yields: Option<String>,
    #[serde(default)]
    pub nutrients: Option<BTreeMap<String, serde_json::Value>>,
}

/// Recipe pre-filled from a scraped page, for the client to complete.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDraft {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub recipeingredients: Vec<String>,
    pub recipeinstructions: Vec<String>,
}

impl From<ScrapedRecipe> for RecipeDraft {
    fn from(scraped: ScrapedRecipe) -> Self {
        let description = describe(&scraped);
        Self {
            title: scraped.title,
            description,
            image: scraped.image,
            recipeingredients: scraped.ingredients,
            recipeinstructions: scraped.instructions_list,
        }
    }
}

fn describe(scraped: &ScrapedRecipe) -> String {
    let mut description = format!("Recipe retrieved from {}.", scraped.host);

    if let Some(yields) = scraped.yields.as_deref().filter(|y| !y.is_empty()) {
        description.push_str(&format!("\nYields {}.", yields));
    }

    if let Some(total_time) = scraped
        .total_time
        .as_ref()
        .filter(|t| t.as_f64().is_some_and(|t| t != 0.0))
    {
        description.push_str(&format!("\nTotal time {} minutes.", total_time));
    }

    if let Some(nutrients) = scraped.nutrients.as_ref().filter(|n| !n.is_empty()) {
        description.push_str("\nNutrients:");
        for (key, value) in nutrients {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            description.push_str(&format!("\n\t{}: {}", split_camel_case(key), value));
        }
    }

    description
}

/// `saturatedFatContent` -> `saturated fat content`.
fn split_camel_case(key: &str) -> String {
    let mut words = String::with_capacity(key.len() + 4);
    let mut previous_lower = false;
    for c in key.chars() {
        if previous_lower && c.is_ascii_uppercase() {
            words.push(' ');
        }
        previous_lower = c.is_ascii_lowercase();
        words.push(c.to_ascii_lowercase());
    }
    words
}

/// Accept only absolute http(s) URLs with a host.
pub fn validate_url(raw: &str) -> Result<Url, ScrapeError> {
    let url = Url::parse(raw.trim()).map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScrapeError::InvalidUrl(format!(
            "unsupported scheme {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ScrapeError::InvalidUrl("missing host".to_string()));
    }

    Ok(url)
}

/// Run the scraper against a page and map its output to a draft.
pub async fn scrape(config: &ScraperConfig, raw_url: &str) -> Result<RecipeDraft, ScrapeError> {
    let url = validate_url(raw_url)?;

    let child = Command::new(&config.program)
        .args(&config.args)
        .arg(url.as_str())
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(config.timeout, child)
        .await
        .map_err(|_| ScrapeError::Timeout)?
        .map_err(ScrapeError::Spawn)?;

    if !output.status.success() {
        return Err(ScrapeError::Exit {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let scraped: ScrapedRecipe =
        serde_json::from_slice(&output.stdout).map_err(ScrapeError::Parse)?;
    Ok(scraped.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scraped(value: serde_json::Value) -> ScrapedRecipe {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_description_from_host_only() {
        let draft = RecipeDraft::from(scraped(json!({
            "host": "example.com",
            "title": "Soup",
        })));
        assert_eq!(draft.description, "Recipe retrieved from example.com.");
        assert_eq!(draft.image, None);
    }

    #[test]
    fn test_description_with_details() {
        let draft = RecipeDraft::from(scraped(json!({
            "host": "example.com",
            "title": "Soup",
            "total_time": 45,
            "yields": "4 servings",
            "image": "https://example.com/soup.jpg",
            "ingredients": ["1 onion", "2 carrots"],
            "instructions_list": ["Chop", "Boil"],
            "nutrients": {
                "saturatedFatContent": "2 g",
                "calories": "250 kcal"
            }
        })));

        assert_eq!(
            draft.description,
            "Recipe retrieved from example.com.\nYields 4 servings.\nTotal time 45 minutes.\nNutrients:\n\tcalories: 250 kcal\n\tsaturated fat content: 2 g"
        );
        assert_eq!(draft.recipeingredients, vec!["1 onion", "2 carrots"]);
        assert_eq!(draft.recipeinstructions, vec!["Chop", "Boil"]);
    }

    #[test]
    fn test_zero_total_time_omitted() {
        let draft = RecipeDraft::from(scraped(json!({
            "host": "example.com",
            "title": "Toast",
            "total_time": 0,
            "nutrients": {}
        })));
        assert_eq!(draft.description, "Recipe retrieved from example.com.");
    }

    #[test]
    fn test_split_camel_case() {
        assert_eq!(split_camel_case("calories"), "calories");
        assert_eq!(split_camel_case("fiberContent"), "fiber content");
        assert_eq!(split_camel_case("unsaturatedFatContent"), "unsaturated fat content");
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/recipe").is_ok());
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("not a url").is_err());
        assert!(validate_url("").is_err());
    }

    #[tokio::test]
    async fn test_scrape_runs_program_with_url() {
        let config = ScraperConfig {
            program: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                r#"printf '{"host":"%s","title":"Echo"}' "$0""#.to_string(),
            ],
            timeout: Duration::from_secs(5),
        };

        let draft = scrape(&config, "https://example.com/r").await.unwrap();
        assert_eq!(draft.title, "Echo");
        assert_eq!(
            draft.description,
            "Recipe retrieved from https://example.com/r."
        );
    }

    #[tokio::test]
    async fn test_scrape_failures() {
        let failing = ScraperConfig {
            program: "false".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            scrape(&failing, "https://example.com").await,
            Err(ScrapeError::Exit { .. })
        ));

        let missing = ScraperConfig {
            program: "/nonexistent/recipe-scraper".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            scrape(&missing, "https://example.com").await,
            Err(ScrapeError::Spawn(_))
        ));

        let garbage = ScraperConfig {
            program: "echo".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            scrape(&garbage, "https://example.com").await,
            Err(ScrapeError::Parse(_))
        ));

        assert!(matches!(
            scrape(&garbage, "ftp://example.com").await,
            Err(ScrapeError::InvalidUrl(_))
        ));
    }
}
