use crate::cli::output::ChangeJson;
use crate::io::workspace::{ChangeOutcome, Workspace};

/// Print change events until the watcher goes away. External edits
/// invalidate the cache and trigger a rescan; our own writes are marked.
pub fn cmd_watch(ws: &Workspace, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (_subscription, rx) = ws.watch()?;
    eprintln!("Watching {}/ (ctrl-c to stop)", ws.root().display());

    for change in rx {
        let outcome = ws.handle_change(&change);
        let suppressed = outcome == ChangeOutcome::Suppressed;

        if json {
            let event = ChangeJson {
                change: &change,
                suppressed,
            };
            println!("{}", serde_json::to_string(&event)?);
        } else {
            let old = change
                .old_path
                .as_deref()
                .map(|p| format!("{} → ", p))
                .unwrap_or_default();
            let marker = if suppressed { "  (own write)" } else { "" };
            println!("{:<8} {}{}{}", change.kind, old, change.path, marker);
        }

        if outcome == ChangeOutcome::Rescan {
            match ws.scan() {
                Ok(grouping) if !json => println!(
                    "rescanned: {} group(s), {} document(s)",
                    grouping.groups.len(),
                    grouping.document_count()
                ),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "rescan failed"),
            }
        }
    }
    Ok(())
}
