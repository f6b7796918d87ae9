//! Bookmark commands: list, add, delete, clear, show.

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use keeper_core::layout::to_rows;
use keeper_types::bookmark::{MutationOutcome, split_items};

use crate::state::AppState;

/// Print a user's bookmarks laid out `columns` per row.
pub async fn list_bookmarks(state: &AppState, user: &str, columns: usize, json: bool) -> Result<()> {
    let bookmarks = state
        .store
        .get_bookmarks_list(user)
        .await
        .with_context(|| format!("failed to list bookmarks for '{user}'"))?;

    if json {
        let result = serde_json::json!({
            "user": user,
            "bookmarks": bookmarks,
            "count": bookmarks.len(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if bookmarks.is_empty() {
        println!();
        println!("  {} No bookmarks.", style("i").blue().bold());
        println!("     Add some with: bmk add {user} <item>[,<item>...]");
        println!();
        return Ok(());
    }

    println!();
    println!(
        "  Bookmarks for '{}' ({} entries)",
        style(user).cyan(),
        bookmarks.len()
    );
    println!();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    for row in to_rows(&bookmarks, columns) {
        table.add_row(row.into_iter().map(|b| Cell::new(b).fg(Color::Cyan)));
    }
    println!("{table}");
    println!();

    Ok(())
}

/// Add comma-separated bookmarks.
pub async fn add_bookmarks(state: &AppState, user: &str, items: &str, json: bool) -> Result<()> {
    let items = parse_items(items)?;
    let outcome = state
        .store
        .add_bookmarks(user, &items)
        .await
        .with_context(|| format!("failed to add bookmarks for '{user}'"))?;
    print_outcome(user, "Added", "already bookmarked", &outcome, json)
}

/// Delete comma-separated bookmarks.
pub async fn delete_bookmarks(state: &AppState, user: &str, items: &str, json: bool) -> Result<()> {
    let items = parse_items(items)?;
    let outcome = state
        .store
        .delete_bookmarks(user, &items)
        .await
        .with_context(|| format!("failed to delete bookmarks for '{user}'"))?;
    print_outcome(user, "Deleted", "not bookmarked", &outcome, json)
}

/// Remove every bookmark of a user.
pub async fn clear_bookmarks(state: &AppState, user: &str, json: bool) -> Result<()> {
    let outcome = state
        .store
        .clear_bookmarks(user)
        .await
        .with_context(|| format!("failed to clear bookmarks for '{user}'"))?;

    if json {
        return print_json(user, &outcome);
    }

    println!();
    if outcome.persisted {
        println!(
            "  {} Cleared {} bookmark(s) for '{}'",
            style("ok").green(),
            outcome.applied.len(),
            style(user).cyan()
        );
    } else {
        println!(
            "  {} No bookmarks stored for '{}', nothing to clear.",
            style("i").blue().bold(),
            style(user).cyan()
        );
    }
    println!();
    Ok(())
}

/// Print the stored document as JSON, unknown fields included.
pub async fn show_document(state: &AppState, user: &str, json: bool) -> Result<()> {
    let document = state
        .store
        .load_document(user)
        .await
        .with_context(|| format!("failed to load document for '{user}'"))?;

    match document {
        Some(document) => println!("{}", serde_json::to_string_pretty(&document)?),
        None if json => println!("null"),
        None => {
            println!();
            println!(
                "  {} No document stored for '{}'.",
                style("i").blue().bold(),
                style(user).cyan()
            );
            println!();
        }
    }
    Ok(())
}

fn parse_items(raw: &str) -> Result<Vec<String>> {
    let items = split_items(raw);
    if items.is_empty() {
        bail!("no bookmarks given; pass a comma-separated list such as \"news, weather\"");
    }
    Ok(items)
}

fn print_json(user: &str, outcome: &MutationOutcome) -> Result<()> {
    let result = serde_json::json!({
        "user": user,
        "outcome": outcome,
    });
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn print_outcome(
    user: &str,
    verb: &str,
    skipped_reason: &str,
    outcome: &MutationOutcome,
    json: bool,
) -> Result<()> {
    if json {
        return print_json(user, outcome);
    }

    println!();
    println!(
        "  {} {verb} {} bookmark(s) for '{}'",
        style("ok").green(),
        outcome.applied.len(),
        style(user).cyan()
    );
    for item in &outcome.skipped {
        println!("     {} {item} ({skipped_reason})", style("-").dim());
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items_trims_and_drops_empty() {
        assert_eq!(
            parse_items(" news , ,weather,").unwrap(),
            vec!["news".to_string(), "weather".to_string()]
        );
    }

    #[test]
    fn test_parse_items_rejects_blank() {
        assert!(parse_items(" , ").is_err());
    }
}
