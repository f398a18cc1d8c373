use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = "expando - keystroke-driven text expansion",
    long_about = "expando watches what you type and replaces delimiter-framed triggers such as ;eml/ with their stored expansions."
)]
pub struct Expando {
    #[clap(subcommand)]
    pub commands: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new snippet
    Add {
        #[clap(long, short = 't', help = "Trigger, e.g. ';eml/' or just 'eml'")]
        trigger: String,

        #[clap(long, short = 'e', help = "Text the trigger expands to")]
        expansion: String,
    },
    /// Delete a snippet
    Delete {
        #[clap(long, help = "Snippet ID or its trigger")]
        id: String,
    },
    /// Update an existing snippet
    Update {
        #[clap(long, help = "Snippet ID or its trigger")]
        id: String,

        #[clap(long, short = 't', help = "New trigger")]
        trigger: Option<String>,

        #[clap(long, short = 'e', help = "New expansion text")]
        expansion: Option<String>,
    },
    /// Enable a snippet
    Enable {
        #[clap(long, help = "Snippet ID or its trigger")]
        id: String,
    },
    /// Disable a snippet without deleting it
    Disable {
        #[clap(long, help = "Snippet ID or its trigger")]
        id: String,
    },
    /// List all snippets
    List,
    /// Replace all snippets with the contents of a snippets file
    Import { path: PathBuf },
    /// Write all snippets to a file
    Export { path: PathBuf },
    /// Show or change delimiter settings
    Config {
        #[clap(subcommand)]
        action: Option<ConfigCommand>,
    },
    /// Show or reset expansion statistics
    Stats {
        #[clap(subcommand)]
        action: Option<StatsCommand>,
    },
    /// Show what typing the given text would expand to, without touching the system
    Check { text: String },
    /// Start the expansion daemon
    Start,
    /// Stop the expansion daemon
    Stop,
    /// Check the status of the expansion daemon
    Status,
    // Hidden command used internally to run the daemon worker
    #[clap(hide = true)]
    DaemonWorker,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the current settings
    Show,
    /// Set the start delimiter
    SetDelimiter { delimiter: String },
    /// Set the end anchors, one character each (e.g. "/.")
    SetAnchors { anchors: String },
    /// Turn expansion on
    Enable,
    /// Pause expansion
    Disable,
}

#[derive(Subcommand)]
pub enum StatsCommand {
    /// Clear all counters
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_short_flags() {
        let args = Expando::try_parse_from(["expando", "add", "-t", "eml", "-e", "me@x.org"]).unwrap();
        match args.commands {
            Some(Commands::Add { trigger, expansion }) => {
                assert_eq!(trigger, "eml");
                assert_eq!(expansion, "me@x.org");
            }
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn parses_nested_config_commands() {
        let args = Expando::try_parse_from(["expando", "config", "set-anchors", "/."]).unwrap();
        assert!(matches!(
            args.commands,
            Some(Commands::Config {
                action: Some(ConfigCommand::SetAnchors { ref anchors })
            }) if anchors == "/."
        ));

        let args = Expando::try_parse_from(["expando", "stats"]).unwrap();
        assert!(matches!(
            args.commands,
            Some(Commands::Stats { action: None })
        ));
    }

    #[test]
    fn update_requires_an_id() {
        assert!(Expando::try_parse_from(["expando", "update", "-e", "x"]).is_err());
    }
}
