mod animation;
mod app;
mod config;
mod conversation;
mod events;
mod hierarchy;
mod importer;
mod layout;
mod logging;
mod minimap;
mod panel;
mod scene;
mod stats;
mod tui;
mod ui;
mod viewport;

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use config::{ConfigFile, ResolvedConfig};
use importer::ImportedConversation;

#[derive(Parser, Debug)]
#[command(
    name = "branchview",
    about = "Explore branching AI chat conversations as an interactive tree",
    long_about = None,
)]
struct Args {
    /// Conversation export (JSON) to open; omit to view the built-in sample
    file: Option<PathBuf>,

    /// Open the conversation with this id instead of the first one
    #[arg(long, env = "BRANCHVIEW_CONVERSATION")]
    conversation_id: Option<String>,

    /// Keep system messages in the tree
    #[arg(long)]
    include_system: bool,

    /// Keep tool / function messages in the tree
    #[arg(long)]
    include_tool: bool,

    /// List the conversations in the export and exit
    #[arg(long)]
    list: bool,

    /// Print the initial tree with coordinates and stats, no TUI
    #[arg(long)]
    dump: bool,

    /// Write a default config file to ~/.config/branchview/config.toml and exit
    #[arg(long)]
    init: bool,

    /// Generate shell completions and print to stdout (bash, zsh, fish, elvish)
    #[arg(long, value_name = "SHELL")]
    completions: Option<String>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ── --init ────────────────────────────────────────────────────────────────
    if args.init {
        let path = ConfigFile::write_default_if_missing()?;
        println!("Config written to: {}", path.display());
        println!("Edit it, then run: branchview <export.json>");
        return Ok(());
    }

    // ── --completions ─────────────────────────────────────────────────────────
    if let Some(shell_name) = &args.completions {
        return generate_completions(shell_name);
    }

    // A broken log file should never keep the viewer from starting.
    let log_path = logging::init(args.verbose).ok();

    let file = ConfigFile::load()?;
    let resolved = ResolvedConfig::resolve(
        &file,
        args.conversation_id.as_deref(),
        args.include_system,
        args.include_tool,
    );
    tracing::info!(log = ?log_path, file = ?args.file, "starting");

    let conversations = match &args.file {
        Some(path) => importer::read_export(path, &resolved.import).await?,
        None => vec![sample_conversation()],
    };

    // ── --list ────────────────────────────────────────────────────────────────
    if args.list {
        print_conversations(&conversations);
        return Ok(());
    }

    // ── --dump (plain stdout, no TUI) ─────────────────────────────────────────
    if args.dump {
        if let Some(first) = conversations.first() {
            print!("{}", tui::dump(first, &resolved));
        }
        return Ok(());
    }

    // ── Interactive TUI mode ──────────────────────────────────────────────────
    tui::run(resolved, conversations, args.file).await
}

fn sample_conversation() -> ImportedConversation {
    ImportedConversation {
        title: "Weekend in Tokyo (sample)".to_string(),
        id: "sample".to_string(),
        created: String::new(),
        tree: conversation::sample(),
    }
}

fn print_conversations(conversations: &[ImportedConversation]) {
    println!();
    println!("  Conversations");
    for c in conversations {
        let id = if c.id.is_empty() { "-" } else { c.id.as_str() };
        let created = if c.created.is_empty() { "-" } else { c.created.as_str() };
        println!("  {}", c.title);
        println!("    id        {id}");
        println!("    created   {created}");
        println!("    messages  {}", c.tree.count());
        println!();
    }
}

// ── Shell completions ─────────────────────────────────────────────────────────

fn generate_completions(shell_name: &str) -> Result<()> {
    use clap_complete::{Shell, generate};

    let shell: Shell = match shell_name.to_lowercase().as_str() {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "elvish" => Shell::Elvish,
        _ => anyhow::bail!("Unknown shell: {shell_name} (supported: bash, zsh, fish, elvish)"),
    };

    let mut cmd = Args::command();
    generate(shell, &mut cmd, "branchview", &mut std::io::stdout());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "branchview",
            "export.json",
            "--conversation-id",
            "abc",
            "--include-tool",
            "--dump",
        ])
        .unwrap();
        assert_eq!(args.file, Some(PathBuf::from("export.json")));
        assert_eq!(args.conversation_id.as_deref(), Some("abc"));
        assert!(args.include_tool && args.dump && !args.include_system);
    }

    #[test]
    fn test_unknown_shell_is_error() {
        assert!(generate_completions("powershell-ish").is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }
}
