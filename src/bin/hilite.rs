//! Command-line interface for hilite
//! Highlights files with grammars loaded from JSON or YAML definitions.
//!
//! Usage:
//!   hilite highlight `<path>` --grammar `<file>`... [--language `<name>`] [--format `<format>`] [--json]
//!   hilite detect `<path>` --grammar `<file>`...     - Report the best matching languages
//!   hilite list-formats                            - List available output formats

use clap::{Arg, ArgAction, ArgMatches, Command};
use hilite::hilite::formats::{FormatRegistry, HtmlFormatter};
use hilite::hilite::grammar::GrammarLoader;
use hilite::hilite::settings::{HighlightSettings, Loader};
use hilite::{HighlightOptions, HighlightResult, Highlighter};

fn grammar_arg() -> Arg {
    Arg::new("grammar")
        .long("grammar")
        .short('g')
        .help("Grammar definition file (.json, .yaml); may be repeated")
        .action(ArgAction::Append)
        .required(true)
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .help("TOML file layered over the built-in settings")
}

fn main() {
    env_logger::init();

    let matches = Command::new("hilite")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Syntax highlighting driven by regex grammars")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("highlight")
                .about("Highlight a file")
                .arg(
                    Arg::new("path")
                        .help("Path to the file to highlight")
                        .required(true)
                        .index(1),
                )
                .arg(grammar_arg())
                .arg(
                    Arg::new("language")
                        .long("language")
                        .short('l')
                        .help("Language to use; auto-detected when omitted"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format (e.g., 'html', 'treeviz', 'json')")
                        .default_value("html"),
                )
                .arg(
                    Arg::new("ignore-illegals")
                        .long("ignore-illegals")
                        .help("Keep going when a grammar marks text as illegal")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the full highlight result as JSON")
                        .action(ArgAction::SetTrue),
                )
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("detect")
                .about("Report the best and second best language for a file")
                .arg(
                    Arg::new("path")
                        .help("Path to the file to inspect")
                        .required(true)
                        .index(1),
                )
                .arg(grammar_arg())
                .arg(config_arg()),
        )
        .subcommand(Command::new("list-formats").about("List available output formats"))
        .get_matches();

    match matches.subcommand() {
        Some(("highlight", highlight_matches)) => handle_highlight_command(highlight_matches),
        Some(("detect", detect_matches)) => handle_detect_command(detect_matches),
        Some(("list-formats", _)) => handle_list_formats_command(),
        _ => unreachable!(),
    }
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("{context}: {err}");
    std::process::exit(1);
}

fn string_arg(matches: &ArgMatches, name: &str) -> Option<String> {
    matches.get_one::<String>(name).cloned()
}

fn load_settings(matches: &ArgMatches) -> HighlightSettings {
    let mut loader = Loader::new();
    if let Some(path) = string_arg(matches, "config") {
        loader = loader.with_file(path);
    }
    match loader.build() {
        Ok(config) => config.highlight,
        Err(e) => fail("Error loading configuration", e),
    }
}

/// Highlighter with every `--grammar` file registered
fn build_highlighter(matches: &ArgMatches, settings: HighlightSettings) -> Highlighter {
    let highlighter = Highlighter::new(settings);
    let paths = matches
        .get_many::<String>("grammar")
        .into_iter()
        .flatten();
    for path in paths {
        let loaded = GrammarLoader::from_path(path)
            .unwrap_or_else(|e| fail(&format!("Error loading grammar {path}"), e));
        let name = loaded.language_name();
        if let Err(e) = highlighter.registry().register_grammar(&name, loaded.grammar) {
            fail(&format!("Error registering grammar {path}"), e);
        }
        log::info!("Registered '{name}' from {path}");
    }
    highlighter
}

fn read_source(matches: &ArgMatches) -> String {
    let path = string_arg(matches, "path").unwrap_or_default();
    std::fs::read_to_string(&path).unwrap_or_else(|e| fail("Error reading file", e))
}

/// Handle the highlight command
fn handle_highlight_command(matches: &ArgMatches) {
    let settings = load_settings(matches);
    let class_prefix = settings.class_prefix.clone();
    let highlighter = build_highlighter(matches, settings);
    let source = read_source(matches);

    let result = match string_arg(matches, "language") {
        Some(language) => {
            let mut options = HighlightOptions::language(&language);
            if matches.get_flag("ignore-illegals") {
                options = options.ignore_illegals();
            }
            highlighter.highlight(&source, options)
        }
        None => highlighter.highlight_auto(&source, None),
    }
    .unwrap_or_else(|e| fail("Highlight error", e));

    if matches.get_flag("json") {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{json}"),
            Err(e) => fail("Serialization error", e),
        }
        return;
    }

    let mut formats = FormatRegistry::with_defaults();
    formats.register(HtmlFormatter::new(&class_prefix));
    let format = string_arg(matches, "format").unwrap_or_else(|| "html".to_string());
    let output = formats
        .serialize(result.tree.root(), &format)
        .unwrap_or_else(|e| fail("Format error", e));
    print!("{output}");
}

fn describe(result: &HighlightResult) -> String {
    format!(
        "{} (relevance {})",
        result.language.as_deref().unwrap_or("plain text"),
        result.relevance
    )
}

/// Handle the detect command
fn handle_detect_command(matches: &ArgMatches) {
    let settings = load_settings(matches);
    let highlighter = build_highlighter(matches, settings);
    let source = read_source(matches);

    let result = highlighter
        .highlight_auto(&source, None)
        .unwrap_or_else(|e| fail("Detection error", e));
    println!("best:   {}", describe(&result));
    if let Some(second) = &result.second_best {
        println!("second: {}", describe(second));
    }
}

/// Handle the list-formats command
fn handle_list_formats_command() {
    let formats = FormatRegistry::with_defaults();
    println!("Available formats:\n");
    for name in formats.list_formats() {
        let description = formats.get(&name).map(|f| f.description()).unwrap_or_default();
        println!("  {name}");
        println!("    {description}");
    }
}
