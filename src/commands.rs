use anyhow::{Context, Result, anyhow};
use std::io::{self, Write};
use std::sync::Arc;

use crate::api::{HttpBackend, SearchParams};
use crate::auth::DemoAuthenticator;
use crate::config::Config;
use crate::controller::{ControllerOptions, ConversationController};
use crate::error::ChatError;
use crate::language::Language;
use crate::ui::conversation::ConversationManager;

fn backend(config: &Config) -> Result<HttpBackend> {
    HttpBackend::from_config(config).context("Failed to create HTTP client")
}

/// Open the interactive chat screen
pub async fn chat(config: &Config) -> Result<()> {
    let backend = Arc::new(backend(config)?);
    let controller = ConversationController::new(backend, ControllerOptions::from(config));
    let manager = ConversationManager::new(
        controller,
        Arc::new(DemoAuthenticator),
        config.ui.history_limit,
        config.ui.show_timestamps,
    );
    crate::ui::run(manager).await
}

/// Ask a single question and print the answer as it is revealed
pub async fn ask(config: &Config, question: &str, language: Language) -> Result<()> {
    let backend = Arc::new(backend(config)?);
    let mut options = ControllerOptions::from(config);
    options.language = language;
    let mut controller = ConversationController::new(backend, options);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    ask_with(&mut controller, question, &mut out).await
}

/// Drive one turn on `controller`, writing revealed text to `out` as it grows
pub async fn ask_with<W: Write>(
    controller: &mut ConversationController,
    question: &str,
    out: &mut W,
) -> Result<()> {
    match controller.submit(question) {
        Ok(_) => {}
        Err(ChatError::Validation) => return Err(anyhow!("Question is empty")),
        Err(err) => return Err(err.into()),
    }

    writeln!(out, "🚗 Driver's Friend ({}):", controller.language().display_name())?;
    let mut printed = 0;
    while controller.next_event().await {
        let Some(message) = controller.messages().last() else {
            continue;
        };
        if !message.is_bot() {
            continue;
        }
        // Frames only ever grow, so print the new tail.
        let text = message.text.as_str();
        if text.len() > printed && text.is_char_boundary(printed) {
            write!(out, "{}", &text[printed..])?;
            out.flush()?;
            printed = text.len();
        }
    }
    writeln!(out)?;

    if let Some(message) = controller.messages().last() {
        if let Some((source, url)) = message.attribution() {
            match url {
                Some(url) => writeln!(out, "📚 Source: {} ({})", source, url)?,
                None => writeln!(out, "📚 Source: {}", source)?,
            }
        }
    }
    let suggestions = controller.suggestions();
    if !suggestions.is_empty() {
        writeln!(out, "💡 You could also ask:")?;
        for suggestion in suggestions {
            writeln!(out, "   • {}", suggestion)?;
        }
    }
    Ok(())
}

/// Check that the backend is up
pub async fn health(config: &Config) -> Result<()> {
    let backend = backend(config)?;
    match backend.health().await {
        Ok(status) => {
            println!("✅ Backend at {} reports: {}", backend.base_url(), status.status);
            Ok(())
        }
        Err(err) => {
            println!("❌ Backend at {} is not reachable.", backend.base_url());
            Err(err).context("Health check failed")
        }
    }
}

/// List regulation categories for a language
pub async fn categories(config: &Config, language: Language) -> Result<()> {
    let categories = backend(config)?
        .categories(language)
        .await
        .context("Failed to fetch categories")?;

    if categories.is_empty() {
        println!("📭 No categories available for {}.", language.display_name());
        return Ok(());
    }

    println!("📋 Categories ({}):\n", language.display_name());
    for category in categories {
        println!("  • {}", category);
    }
    Ok(())
}

/// Search the regulation corpus
pub async fn search(config: &Config, params: SearchParams) -> Result<()> {
    let response = backend(config)?
        .search(&params)
        .await
        .context("Search failed")?;

    println!(
        "🔎 {} result(s) for '{}'",
        response.total_results, response.query
    );
    if !response.matched_keywords.is_empty() {
        println!("   Keywords: {}", response.matched_keywords.join(", "));
    }
    println!("{}", "=".repeat(50));
    for result in &response.results {
        let pretty = serde_json::to_string_pretty(result).context("Failed to format result")?;
        println!("{}\n", pretty);
    }
    Ok(())
}
