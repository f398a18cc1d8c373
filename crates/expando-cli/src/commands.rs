use crate::cli::{Commands, ConfigCommand, StatsCommand};
use crate::utils::{preview, resolve_snippet_id};
use expando_core::config::{
    ensure_config_dir, get_settings_file_path, get_snippets_file_path, get_stats_file_path,
};
use expando_core::recording::simulate_typing;
use expando_core::{
    normalize_trigger, DelimiterConfig, ExpandoError, Result, SettingsStore, SnippetStore,
    StatsStore,
};
use expando_daemon::{daemon_status, daemon_worker_entry, start_daemon, stop_daemon};

pub fn handle_command(command: Option<Commands>) -> Result<()> {
    match command {
        Some(command) => handle_subcommand(command),
        None => display_summary(),
    }
}

fn handle_subcommand(command: Commands) -> Result<()> {
    match command {
        Commands::Add { trigger, expansion } => handle_add(trigger, expansion),
        Commands::Delete { id } => {
            let mut store = open_store()?;
            let id = resolve_snippet_id(&store, &id)?;
            store
                .delete(id)
                .map(|s| println!("Snippet {} deleted successfully", s.trigger))
        }
        Commands::Update {
            id,
            trigger,
            expansion,
        } => handle_update(id, trigger, expansion),
        Commands::Enable { id } => set_snippet_enabled(&id, true),
        Commands::Disable { id } => set_snippet_enabled(&id, false),
        Commands::List => handle_list(),
        Commands::Import { path } => {
            let mut store = open_store()?;
            let count = store.import_from(&path)?;
            println!("Imported {} snippets from {}", count, path.display());
            Ok(())
        }
        Commands::Export { path } => {
            let store = open_store()?;
            store.export_to(&path)?;
            println!(
                "Exported {} snippets to {}",
                store.snippets().len(),
                path.display()
            );
            Ok(())
        }
        Commands::Config { action } => handle_config(action.unwrap_or(ConfigCommand::Show)),
        Commands::Stats { action } => handle_stats(action),
        Commands::Check { text } => handle_check(&text),
        Commands::Start => start_daemon(),
        Commands::Stop => stop_daemon(),
        Commands::Status => daemon_status(),
        Commands::DaemonWorker => daemon_worker_entry(),
    }
}

fn open_store() -> Result<SnippetStore> {
    ensure_config_dir()?;
    Ok(SnippetStore::open(get_snippets_file_path()))
}

fn open_settings() -> Result<SettingsStore> {
    ensure_config_dir()?;
    let mut settings = SettingsStore::new(get_settings_file_path());
    settings.load();
    Ok(settings)
}

/// Reject triggers that cannot be typed under the current delimiters.
pub fn validate_trigger(raw: &str, config: &DelimiterConfig) -> Result<String> {
    normalize_trigger(raw, config).ok_or_else(|| ExpandoError::InvalidTrigger(raw.to_string()))
}

/// First stored snippet whose trigger normalizes to `normalized`.
fn shadowing<'a>(
    store: &'a SnippetStore,
    normalized: &str,
    config: &DelimiterConfig,
) -> Option<&'a str> {
    store
        .snippets()
        .iter()
        .find(|s| normalize_trigger(&s.trigger, config).as_deref() == Some(normalized))
        .map(|s| s.trigger.as_str())
}

fn handle_add(trigger: String, expansion: String) -> Result<()> {
    let config = open_settings()?.delimiter_config();
    let normalized = validate_trigger(&trigger, &config)?;
    let mut store = open_store()?;

    if let Some(existing) = shadowing(&store, &normalized, &config) {
        println!(
            "Warning: {} already uses {}; the earlier snippet wins.",
            existing, normalized
        );
    }

    let snippet = store.add(trigger, expansion)?;
    println!("Snippet added successfully ({} as {})", snippet.id, normalized);
    Ok(())
}

fn handle_update(id: String, trigger: Option<String>, expansion: Option<String>) -> Result<()> {
    if trigger.is_none() && expansion.is_none() {
        return Err(ExpandoError::Other(
            "Nothing to update: pass --trigger and/or --expansion".to_string(),
        ));
    }
    if let Some(t) = &trigger {
        let config = open_settings()?.delimiter_config();
        validate_trigger(t, &config)?;
    }

    let mut store = open_store()?;
    let id = resolve_snippet_id(&store, &id)?;
    store
        .update(id, trigger, expansion)
        .map(|s| println!("Snippet {} updated successfully", s.trigger))
}

fn set_snippet_enabled(key: &str, enabled: bool) -> Result<()> {
    let mut store = open_store()?;
    let id = resolve_snippet_id(&store, key)?;
    store.set_enabled(id, enabled)?;
    println!(
        "Snippet {} {}",
        key,
        if enabled { "enabled" } else { "disabled" }
    );
    Ok(())
}

fn handle_list() -> Result<()> {
    let store = open_store()?;
    let config = open_settings()?.delimiter_config();

    if store.snippets().is_empty() {
        println!("No snippets yet. Add one with 'expando add --trigger eml --expansion me@example.com'");
        return Ok(());
    }

    for snippet in store.snippets() {
        let typed = normalize_trigger(&snippet.trigger, &config)
            .unwrap_or_else(|| "(invalid)".to_string());
        println!(
            "{} {} {:<14} {}",
            snippet.id,
            if snippet.is_enabled { "on " } else { "off" },
            typed,
            preview(&snippet.expansion, 48)
        );
    }
    Ok(())
}

fn handle_config(action: ConfigCommand) -> Result<()> {
    let mut settings = open_settings()?;
    match action {
        ConfigCommand::Show => {
            let current = settings.settings();
            let config = settings.delimiter_config();
            println!("Settings file:   {}", settings.path().display());
            println!("Expansion:       {}", if current.desired_enabled { "enabled" } else { "paused" });
            println!("Start delimiter: {}", config.start_delimiter);
            println!(
                "End anchors:     {}",
                config.end_anchors.iter().collect::<String>()
            );
            println!("Play sound:      {}", current.play_sound);
            return Ok(());
        }
        ConfigCommand::SetDelimiter { delimiter } => {
            let delimiter = delimiter.trim().to_string();
            if delimiter.is_empty() {
                return Err(ExpandoError::Other("Delimiter cannot be blank".to_string()));
            }
            settings.update(|s| s.start_delimiter = delimiter)?;
        }
        ConfigCommand::SetAnchors { anchors } => {
            let anchors: Vec<String> = anchors
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| c.to_string())
                .collect();
            if anchors.is_empty() {
                return Err(ExpandoError::Other("At least one anchor is required".to_string()));
            }
            settings.update(|s| s.end_anchors = anchors)?;
        }
        ConfigCommand::Enable => settings.update(|s| s.desired_enabled = true)?,
        ConfigCommand::Disable => settings.update(|s| s.desired_enabled = false)?,
    }
    println!("Settings saved.");
    Ok(())
}

fn handle_stats(action: Option<StatsCommand>) -> Result<()> {
    ensure_config_dir()?;
    let mut stats = StatsStore::open(get_stats_file_path());

    if let Some(StatsCommand::Reset) = action {
        stats.reset()?;
        println!("Statistics reset.");
        return Ok(());
    }

    let current = stats.stats();
    println!("Total expansions: {}", current.total_successful_expansions);
    match (&current.last_used_trigger, current.last_used_at) {
        (Some(trigger), Some(at)) => println!("Last used:        {} at {}", trigger, at.to_rfc3339()),
        _ => println!("Last used:        never"),
    }
    for (trigger, count) in current.top_triggers().into_iter().take(10) {
        println!("  {:<14} {}", trigger, count);
    }
    Ok(())
}

fn handle_check(text: &str) -> Result<()> {
    let store = open_store()?;
    let config = open_settings()?.delimiter_config();
    let run = simulate_typing(store.snippets(), &config, text);

    if run.expanded.is_empty() {
        println!("No expansion would fire.");
    } else {
        println!("Would expand: {}", run.expanded.join(", "));
    }
    println!("Result: {}", run.output);
    Ok(())
}

fn display_summary() -> Result<()> {
    daemon_status()?;
    let store = open_store()?;
    println!(
        "{} snippets in {}",
        store.snippets().len(),
        store.path().display()
    );
    println!("Run 'expando --help' for available commands.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn triggers_that_cannot_be_typed_are_rejected() {
        let config = DelimiterConfig::default();
        assert_eq!(validate_trigger("eml", &config).unwrap(), ";eml/");
        assert!(matches!(
            validate_trigger(";/", &config),
            Err(ExpandoError::InvalidTrigger(_))
        ));
        assert!(validate_trigger("   ", &config).is_err());
    }

    #[test]
    fn shadowing_finds_an_earlier_equivalent_trigger() {
        let dir = TempDir::new().unwrap();
        let mut store = SnippetStore::new(dir.path().join("snippets.json"));
        store.add("eml".into(), "first".into()).unwrap();
        let config = DelimiterConfig::default();

        assert_eq!(shadowing(&store, ";eml/", &config), Some("eml"));
        assert_eq!(shadowing(&store, ";sig/", &config), None);
    }
}
