//! Report segment validation against retrieved context.
//!
//! Retrieves the most relevant indexed chunks for a query, joins them into
//! a context block, and asks the configured chat model to validate the
//! segment's structure, formats, and completeness against what a CCMTA
//! report is expected to contain.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::llm::LlmClient;
use crate::search::search_chunks;

const VALIDATOR_SYSTEM_PROMPT: &str = "You are a CCMTA (Canadian Council of Motor Transport \
Administrators) report validator that takes a text input from a pdf report chunk, structures \
the data and validates what the user asks.";

/// Outcome of one validation call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Validation {
    /// Pages the retrieved context came from.
    pub context_pages: Vec<i64>,
    /// The model's verdict text.
    pub verdict: String,
}

/// Retrieve context for `query` and ask the model to validate it.
pub async fn validate_report(config: &Config, query: &str, chunks_n: i64) -> Result<Validation> {
    let client = LlmClient::new(&config.llm)?;

    let pool = db::connect(config).await?;
    // Semantic retrieval when embeddings are configured, keyword otherwise.
    let mode = if config.embedding.is_enabled() {
        "semantic"
    } else {
        "keyword"
    };
    let hits = search_chunks(config, &pool, query, mode, chunks_n).await?;
    pool.close().await;

    let context = hits
        .iter()
        .map(|h| h.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    let context_pages: Vec<i64> = hits.iter().map(|h| h.page).collect();

    let user = format!(
        "Report chunk:\n\n{}\n\n\
         Validate if the information is structured correctly, the parameters are in the right \
         format, and the data is complete.\n\
         Validate the table data against what is expected for that segment in the CCMTA report. \
         Use most updated information\n",
        context
    );

    let verdict = client.complete(VALIDATOR_SYSTEM_PROMPT, &user).await?;

    Ok(Validation {
        context_pages,
        verdict,
    })
}

/// CLI entry point for `rods validate`.
pub async fn run_validate(config: &Config, query: &str, chunks_n: Option<i64>) -> Result<()> {
    let chunks_n = chunks_n.unwrap_or(config.retrieval.chunks);
    let validation = validate_report(config, query, chunks_n).await?;

    if validation.context_pages.is_empty() {
        println!("No indexed context matched the query; verdict is unguided.");
    } else {
        let pages: Vec<String> = validation
            .context_pages
            .iter()
            .map(|p| p.to_string())
            .collect();
        println!("context pages: {}", pages.join(", "));
    }
    println!();
    println!("{}", validation.verdict);
    Ok(())
}
