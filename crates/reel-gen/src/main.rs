use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use reel_gen::{parse_source, BlueprintBuilder, BuilderOptions};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let matches = Command::new("reel-gen")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generate playback blueprints from annotated Python sources")
        .arg(
            Arg::new("file")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Python file to parse"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_parser(value_parser!(PathBuf))
                .help("Write the blueprint here instead of stdout"),
        )
        .arg(
            Arg::new("typing-speed")
                .long("typing-speed")
                .default_value("35")
                .value_parser(value_parser!(u64))
                .help("Milliseconds per typed character"),
        )
        .arg(
            Arg::new("action-delay")
                .long("action-delay")
                .default_value("1000")
                .value_parser(value_parser!(u64))
                .help("Pause between actions in milliseconds"),
        )
        .arg(
            Arg::new("voice")
                .long("voice")
                .default_value("en-US-BrianNeural")
                .help("Narration voice"),
        )
        .arg(
            Arg::new("no-voiceover")
                .long("no-voiceover")
                .action(ArgAction::SetTrue)
                .help("Generate a silent blueprint"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log segment details to stderr"),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    init_tracing(verbose);

    let file = matches.get_one::<PathBuf>("file").unwrap();
    if file.extension().and_then(|e| e.to_str()) != Some("py") {
        tracing::warn!(file = %file.display(), "input does not have a .py extension");
    }

    let source = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let segments = parse_source(&source)?;

    if verbose {
        for segment in &segments {
            tracing::debug!(
                kind = ?segment.kind,
                lines = %format!("{}-{}", segment.start_line, segment.end_line),
                name = segment.name.as_deref().unwrap_or("-"),
                has_docstring = segment.docstring.is_some(),
                "segment"
            );
        }
    }

    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("main.py")
        .to_string();
    let opts = BuilderOptions {
        typing_speed: *matches.get_one::<u64>("typing-speed").unwrap(),
        action_delay: *matches.get_one::<u64>("action-delay").unwrap(),
        voice: matches.get_one::<String>("voice").unwrap().clone(),
        enable_voiceover: !matches.get_flag("no-voiceover"),
    };
    let blueprint = BlueprintBuilder::new(filename, opts).build(segments);

    let json = serde_json::to_string_pretty(&blueprint)?;
    match matches.get_one::<PathBuf>("output") {
        Some(path) => {
            fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "blueprint written");
        }
        None => println!("{json}"),
    }

    let voiceovers = blueprint
        .actions
        .iter()
        .filter(|a| a.narration().map_or(false, |n| n.text().is_some()))
        .count();
    tracing::info!(
        actions = blueprint.actions.len(),
        voiceovers,
        root_folder = %blueprint.root_folder,
        "blueprint generated"
    );
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "reel_gen=debug" } else { "reel_gen=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
