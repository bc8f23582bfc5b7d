use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use splice_core::{
    annotate_dependencies, apply_change_set, build_dependency_graph, decode_change_set, dry_run,
    extract_with, find_affected_files, logging, render_outline, Config, EditEncoding, EditSession,
    FileContext, Language, SourceProvider, WorkspaceSource,
};

#[derive(Parser)]
#[command(name = "splice")]
#[command(about = "Apply agent-proposed edits to source files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Workspace root; file arguments are relative to it
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// More log output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the symbol outline of a file
    Outline {
        /// File to scan
        file: String,

        /// Print the full context as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the dependency graph of a set of files
    Deps {
        /// Files to scan
        #[arg(required = true)]
        files: Vec<String>,

        /// Only list files affected by a change to this file
        #[arg(long)]
        target: Option<String>,

        /// Symbol changed in --target
        #[arg(long, requires = "target", default_value = "")]
        symbol: String,
    },

    /// Decode an agent response and apply its edits
    Apply {
        /// Files the response may edit
        #[arg(required = true)]
        files: Vec<String>,

        /// Response file, or `-` for stdin
        #[arg(long, default_value = "-")]
        response: String,

        /// Force one encoding (structured, unified_diff, search_replace)
        #[arg(long)]
        encoding: Option<String>,

        /// Write the result instead of printing a preview
        #[arg(long)]
        write: bool,
    },

    /// Ask the configured agent command to edit a file
    Ask {
        /// File to edit
        file: String,

        /// What to change
        #[arg(long, short)]
        instruction: String,

        /// Save the edited file
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::load(&cli.root).context("failed to load configuration")?;
    let source = WorkspaceSource::open(&cli.root)
        .with_context(|| format!("failed to open workspace {}", cli.root.display()))?;

    match cli.command {
        Commands::Outline { file, json } => outline(&source, &config, &file, json),
        Commands::Deps {
            files,
            target,
            symbol,
        } => deps(&source, &config, &files, target.as_deref(), &symbol),
        Commands::Apply {
            files,
            response,
            encoding,
            write,
        } => apply(&source, &config, &files, &response, encoding.as_deref(), write),
        Commands::Ask {
            file,
            instruction,
            write,
        } => ask(source, config, &file, &instruction, write),
    }
}

fn scan(source: &WorkspaceSource, config: &Config, file: &str) -> Result<(String, FileContext)> {
    let text = source
        .read(file)
        .with_context(|| format!("failed to read {file}"))?;
    let context = extract_with(&text, Language::from_path(file), config.extract_options());
    Ok((text, context))
}

fn outline(source: &WorkspaceSource, config: &Config, file: &str, json: bool) -> Result<()> {
    let (_, context) = scan(source, config, file)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&context)?);
    } else {
        print!("{}", render_outline(file, &context));
    }
    Ok(())
}

fn deps(
    source: &WorkspaceSource,
    config: &Config,
    files: &[String],
    target: Option<&str>,
    symbol: &str,
) -> Result<()> {
    let mut contexts = BTreeMap::new();
    for file in files {
        let (_, context) = scan(source, config, file)?;
        contexts.insert(file.clone(), context);
    }

    if let Some(target) = target {
        for path in find_affected_files(target, symbol, &contexts) {
            println!("{path}");
        }
        return Ok(());
    }

    for (from, targets) in build_dependency_graph(&contexts) {
        for to in targets {
            println!("{from} -> {to}");
        }
    }
    Ok(())
}

fn read_response(response: &str) -> Result<String> {
    if response == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read response from stdin")?;
        return Ok(text);
    }
    fs::read_to_string(Path::new(response))
        .with_context(|| format!("failed to read response file {response}"))
}

fn apply(
    source: &WorkspaceSource,
    config: &Config,
    files: &[String],
    response: &str,
    encoding: Option<&str>,
    write: bool,
) -> Result<()> {
    let order = match encoding {
        Some(name) => vec![EditEncoding::from_name(name)
            .ok_or_else(|| anyhow!("unknown encoding {name:?}"))?],
        None => config.decode.order.clone(),
    };

    let mut originals = BTreeMap::new();
    let mut contexts = BTreeMap::new();
    for file in files {
        let (text, context) = scan(source, config, file)?;
        originals.insert(file.clone(), text);
        contexts.insert(file.clone(), context);
    }

    let text = read_response(response)?;
    let mut change_set = decode_change_set(&text, &originals, &order)
        .context("could not understand the agent response")?;
    if change_set.edit_count() == 0 {
        bail!("the response contains no applicable edits");
    }
    annotate_dependencies(&mut change_set, &contexts);
    for edge in &change_set.dependency_edges_touched {
        eprintln!("touches dependency {edge}");
    }

    if write {
        let outcome = apply_change_set(&change_set, source, config.apply_options())?;
        for (path, report) in &outcome.reports {
            for failed in &report.failed {
                eprintln!("{path}: skipped {}: {}", failed.id, failed.reason);
            }
        }
        for path in &outcome.written {
            println!("wrote {path}");
        }
    } else {
        for preview in dry_run(&change_set, config.apply_options())? {
            for failed in &preview.report.failed {
                eprintln!("{}: skipped {}: {}", preview.path, failed.id, failed.reason);
            }
            print!("{}", preview.patch);
        }
    }
    Ok(())
}

fn ask(
    source: WorkspaceSource,
    config: Config,
    file: &str,
    instruction: &str,
    write: bool,
) -> Result<()> {
    let gateway = config.command_gateway().ok_or_else(|| {
        anyhow!("no agent command configured; set [agent] command or SPLICE_AGENT_CMD")
    })?;

    let mut session = EditSession::open(source, file, config)?;
    let staged = session.request(&gateway, instruction)?;
    if staged.is_empty() {
        bail!("the agent proposed no applicable edits");
    }

    let report = session.accept_all();
    for failed in &report.failed {
        eprintln!("skipped {}: {}", failed.id, failed.reason);
    }
    print!("{}", session.diff()?);

    if write && session.save()? {
        println!("wrote {file}");
    }
    Ok(())
}
