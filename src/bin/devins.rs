//! Command-line interface for DevIns
//! This binary is used to inspect DevIns templates at every stage of compilation.
//!
//! Usage:
//!   devins tokens `<path>` [--format `<format>`] [--trivia]   - List the lexer's tokens
//!   devins tree `<path>` [--format `<format>`]                - Print the document tree
//!   devins compile `<path>` [--format `<format>`] [--hobbit-hole] - Compile the front matter
//!   devins plan `<path>` [--format `<format>`]                - Read a markdown task plan
//!
//! `--config <file>` layers a TOML file over the built-in defaults. `DEVINS_LOG`
//! overrides the configured log filter.

use clap::{Arg, ArgAction, ArgMatches, Command};
use devins::devins::compiling::parse_plan;
use devins::devins::formats::{self, InspectOptions};
use devins::devins::lexing::tokenize;
use devins::devins::parsing::build_document;
use devins::devins::pipeline::{CompileOptions, Pipeline};
use devins_config::{DevinsConfig, Loader, OutputFormat};
use std::fmt::Display;
use tracing_subscriber::EnvFilter;

const FORMATS: [&str; 4] = ["simple", "json", "yaml", "debug"];

fn path_arg() -> Arg {
    Arg::new("path")
        .help("Path to the DevIns file")
        .required(true)
        .index(1)
}

fn format_arg() -> Arg {
    Arg::new("format")
        .long("format")
        .short('f')
        .help("Output format (defaults to inspect.format from the config)")
        .value_parser(FORMATS)
}

fn main() {
    let matches = Command::new("devins")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A tool for inspecting and compiling DevIns templates")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("TOML file layered over the default configuration"),
        )
        .subcommand(
            Command::new("tokens")
                .about("List the tokens of a document")
                .arg(path_arg())
                .arg(format_arg())
                .arg(
                    Arg::new("trivia")
                        .long("trivia")
                        .help("Include whitespace and comment tokens")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("tree")
                .about("Print the parse tree of a document")
                .arg(path_arg())
                .arg(format_arg()),
        )
        .subcommand(
            Command::new("compile")
                .about("Compile the front matter of a document")
                .arg(path_arg())
                .arg(format_arg())
                .arg(
                    Arg::new("hobbit-hole")
                        .long("hobbit-hole")
                        .help("Print the typed template configuration instead of the raw map")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("require-front-matter")
                        .long("require-front-matter")
                        .help("Fail when the document has no front matter")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about("Read a markdown task plan")
                .arg(path_arg())
                .arg(format_arg()),
        )
        .get_matches();

    let config = load_config(&matches);
    init_tracing(&config.logging.level);

    let output = match matches.subcommand() {
        Some(("tokens", sub)) => handle_tokens_command(sub, &config),
        Some(("tree", sub)) => handle_tree_command(sub, &config),
        Some(("compile", sub)) => handle_compile_command(sub, &config),
        Some(("plan", sub)) => handle_plan_command(sub, &config),
        _ => fail("unknown command"),
    };
    print!("{}", output);
}

fn fail(message: impl Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn load_config(matches: &ArgMatches) -> DevinsConfig {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    loader.build().unwrap_or_else(|e| fail(e))
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env("DEVINS_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(matches: &ArgMatches) -> String {
    let path = matches
        .get_one::<String>("path")
        .unwrap_or_else(|| fail("missing path"));
    std::fs::read_to_string(path).unwrap_or_else(|e| fail(format!("cannot read {}: {}", path, e)))
}

fn output_format(matches: &ArgMatches, config: &DevinsConfig) -> OutputFormat {
    match matches.get_one::<String>("format") {
        Some(name) => formats::output_format(name).unwrap_or_else(|e| fail(e)),
        None => config.inspect.format,
    }
}

fn handle_tokens_command(matches: &ArgMatches, config: &DevinsConfig) -> String {
    let source = read_source(matches);
    let mut options = InspectOptions::from(&config.inspect);
    options.include_trivia |= matches.get_flag("trivia");

    let tokens = tokenize(&source);
    formats::render_tokens(&tokens, output_format(matches, config), options)
        .unwrap_or_else(|e| fail(e))
}

fn handle_tree_command(matches: &ArgMatches, config: &DevinsConfig) -> String {
    let source = read_source(matches);
    let tokens = tokenize(&source);
    let output = build_document(&source, &tokens);
    for diagnostic in &output.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }
    formats::render_tree(
        &output.document,
        &source,
        output_format(matches, config),
        InspectOptions::from(&config.inspect),
    )
    .unwrap_or_else(|e| fail(e))
}

fn handle_compile_command(matches: &ArgMatches, config: &DevinsConfig) -> String {
    let source = read_source(matches);
    let options = CompileOptions::from_config(config)
        .require_front_matter(matches.get_flag("require-front-matter"));
    let compiled = Pipeline::new(&options)
        .run(&source)
        .unwrap_or_else(|e| fail(e));

    let format = output_format(matches, config);
    let rendered = if matches.get_flag("hobbit-hole") {
        formats::render_hobbit_hole(&compiled.hobbit_hole, format)
    } else {
        formats::render_front_matter(&compiled.front_matter, format)
    };
    rendered.unwrap_or_else(|e| fail(e))
}

fn handle_plan_command(matches: &ArgMatches, config: &DevinsConfig) -> String {
    let source = read_source(matches);
    let sections = parse_plan(&source);
    formats::render_plan(&sections, output_format(matches, config)).unwrap_or_else(|e| fail(e))
}
