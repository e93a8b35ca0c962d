//! xref CLI - symbol search and dependency analysis from the terminal

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use xref_core::search::display_path;
use xref_core::{
    normalize_path, AnalysisOptions, Config, Evidence, FileAnalysis, MatchType, SearchEngine,
    SearchOutcome, SearchQuery, SearchType, TextQuery, TextSearchOutcome, XrefError,
};

#[derive(Parser)]
#[command(name = "xref")]
#[command(about = "Find definitions, references and dependencies of code symbols", long_about = None)]
struct Cli {
    /// Override project root detection
    #[arg(long, global = true, env = "XREF_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a symbol
    Search {
        symbol: String,

        /// definition, references, usage, dependencies, reverse-dependencies or all
        #[arg(short = 't', long = "type", default_value = "all")]
        search_type: String,

        /// Directory to search (default: project root)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Tolerate typos and casing differences
        #[arg(short, long)]
        fuzzy: bool,

        /// Also match comment-only lines
        #[arg(long)]
        include_comments: bool,

        /// Maximum matches (default from config)
        #[arg(short = 'n', long)]
        max_results: Option<usize>,

        /// List transitive dependencies of the top result files
        #[arg(long)]
        deps: bool,

        /// List importers of the top result files
        #[arg(long)]
        reverse_deps: bool,

        /// List imports and exports of the top result files
        #[arg(long)]
        imports: bool,

        /// Dependency depth, 1-3 (default from config)
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Search file contents for text or a regex
    Grep {
        pattern: String,

        /// Treat the pattern as a regular expression
        #[arg(short = 'e', long)]
        regex: bool,

        /// Match case exactly
        #[arg(short = 's', long)]
        case_sensitive: bool,

        /// Directory to search (default: project root)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Maximum matching lines (default from config)
        #[arg(short = 'n', long)]
        max_results: Option<usize>,
    },

    /// Show imports and exports of a file
    Imports {
        file: PathBuf,

        /// Also list transitive dependencies
        #[arg(long)]
        deps: bool,

        /// Also list files importing this file
        #[arg(long)]
        reverse: bool,

        /// Dependency depth, 1-3 (default from config)
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Show dependency edges of a file, or its importers with --reverse
    Deps {
        file: PathBuf,

        /// Dependency depth, 1-3 (default from config)
        #[arg(long)]
        depth: Option<usize>,

        /// List files importing this file instead
        #[arg(long)]
        reverse: bool,
    },

    /// Resolve an import source to a file
    Resolve {
        source: String,

        /// File containing the import
        #[arg(long)]
        from: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(cli.root, cli.command, cli.json);

    if let Err(e) = result {
        if cli.json {
            let code = if e.is_recoverable() { "not-found" } else { "error" };
            let error_json = serde_json::json!({ "code": code, "message": e.to_string() });
            eprintln!("{}", error_json);
        } else {
            eprintln!("{}: {}", "Error".red(), e);
        }
        std::process::exit(1);
    }
}

fn run(root: Option<PathBuf>, command: Commands, json: bool) -> xref_core::Result<()> {
    let root = normalize_path(&std::path::absolute(detect_repo_root(root)?)?);
    tracing::debug!(root = %root.display(), "project root");
    let config = Config::for_root(&root)?;
    let engine = SearchEngine::new(config);

    match command {
        Commands::Search {
            symbol,
            search_type,
            path,
            fuzzy,
            include_comments,
            max_results,
            deps,
            reverse_deps,
            imports,
            depth,
        } => {
            let defaults = &engine.config().search;
            let mut query = SearchQuery::new(symbol)
                .with_search_type(search_type.parse::<SearchType>()?)
                .with_base_path(base_path(&root, path.as_deref())?)
                .with_fuzzy(fuzzy)
                .with_comments(include_comments)
                .with_max_results(max_results.unwrap_or(defaults.default_max_results));
            query.depth_level = depth.unwrap_or(defaults.default_depth);
            query.include_dependencies = deps;
            query.include_reverse_dependencies = reverse_deps;
            query.analyze_imports = imports;

            let outcome = engine.search(query, &root)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_search(&outcome);
            }
        }
        Commands::Grep {
            pattern,
            regex,
            case_sensitive,
            path,
            max_results,
        } => {
            let mut query = TextQuery::new(pattern);
            query.regex = regex;
            query.case_sensitive = case_sensitive;
            query.base_path = base_path(&root, path.as_deref())?;
            query.max_results =
                max_results.unwrap_or(engine.config().search.default_max_results);

            let outcome = engine.text_search(query, &root)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_text(&outcome);
            }
        }
        Commands::Imports {
            file,
            deps,
            reverse,
            depth,
        } => {
            let depth = depth.unwrap_or(engine.config().search.default_depth);
            let options = AnalysisOptions {
                imports: true,
                dependency_depth: deps.then_some(depth.clamp(1, 3)),
                reverse_dependencies: reverse,
            };
            let analysis = engine.analyze_file(&root_relative(&root, &file)?, &root, options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print_analysis(&analysis);
            }
        }
        Commands::Deps {
            file,
            depth,
            reverse,
        } => {
            let file = root_relative(&root, &file)?;
            if reverse {
                let options = AnalysisOptions {
                    reverse_dependencies: true,
                    ..Default::default()
                };
                let analysis = engine.analyze_file(&file, &root, options)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&analysis)?);
                } else {
                    print_analysis(&analysis);
                }
            } else {
                let depth = depth.unwrap_or(engine.config().search.default_depth);
                let edges = engine.dependency_edges(&file, depth, &root)?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&edges)?);
                } else if edges.is_empty() {
                    println!("{} has no resolvable imports", file);
                } else {
                    for edge in &edges {
                        println!(
                            "{} {} {}",
                            edge.from.display(),
                            "->".dimmed(),
                            edge.to.display().to_string().cyan()
                        );
                    }
                    println!("({} edges)", edges.len());
                }
            }
        }
        Commands::Resolve { source, from } => {
            let from = root_relative(&root, &from)?;
            let resolved = engine.resolve_import(&source, &from, &root)?;
            if json {
                let value = serde_json::json!({
                    "source": source,
                    "fromFile": from,
                    "resolvedPath": resolved,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                match resolved {
                    Some(path) => println!("{}", path.cyan()),
                    None => {
                        println!("{}: {} could not be resolved", "Unresolved".yellow(), source)
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_search(outcome: &SearchOutcome) {
    if outcome.matches.is_empty() {
        println!(
            "No matches for {} ({} files scanned)",
            outcome.query.symbol.bold(),
            outcome.files_scanned
        );
        if !outcome.query.fuzzy_match {
            println!("{}: try --fuzzy", "Hint".yellow());
        }
    }

    let mut current: Option<&str> = None;
    for m in &outcome.matches {
        if current != Some(m.file.as_str()) {
            println!("{}", m.file.cyan().bold());
            current = Some(m.file.as_str());
        }
        println!(
            "  {:>5}  {:<20} {:.2}  {}",
            m.line.to_string().dimmed(),
            colored_type(m.match_type),
            m.confidence,
            m.content.trim()
        );
    }

    if outcome.truncated {
        println!(
            "... ({} showing {} of {} matches)",
            "truncated".yellow(),
            outcome.matches.len(),
            outcome.total_matches
        );
    }
    println!(
        "({} matches, {} files scanned, {} skipped)",
        outcome.matches.len(),
        outcome.files_scanned,
        outcome.files_skipped
    );

    for analysis in &outcome.analyses {
        println!();
        print_analysis(analysis);
    }
}

fn colored_type(match_type: MatchType) -> colored::ColoredString {
    let label = match_type.as_str();
    match match_type {
        MatchType::Definition => label.green(),
        MatchType::References => label.blue(),
        MatchType::Usage => label.normal(),
        MatchType::Dependencies => label.magenta(),
        MatchType::ReverseDependencies => label.yellow(),
    }
}

fn print_text(outcome: &TextSearchOutcome) {
    for m in &outcome.matches {
        println!(
            "{}:{}: {}",
            m.file.cyan(),
            m.line.to_string().dimmed(),
            m.content.trim_end()
        );
    }
    if outcome.truncated {
        println!("... ({})", "truncated".yellow());
    }
    println!(
        "({} lines, {} files scanned, {} skipped)",
        outcome.matches.len(),
        outcome.files_scanned,
        outcome.files_skipped
    );
}

fn print_analysis(analysis: &FileAnalysis) {
    println!("{}", analysis.file.cyan().bold());

    if let Some(imports) = &analysis.imports {
        println!("  {} ({})", "imports".bold(), imports.len());
        for import in imports {
            let target = match &import.resolved_path {
                Some(path) => format!("-> {}", path.display()).green(),
                None => "unresolved".dimmed(),
            };
            let names = if import.imported_names.is_empty() {
                String::new()
            } else {
                format!(" {{{}}}", import.imported_names.join(", "))
            };
            println!(
                "    {:>5}  {}{} [{}] {}",
                import.line.to_string().dimmed(),
                import.source,
                names,
                import.kind.as_str(),
                target
            );
        }
    }

    if let Some(exports) = &analysis.exports {
        println!("  {} ({})", "exports".bold(), exports.len());
        for export in exports {
            println!(
                "    {:>5}  {}{} [{}]",
                export.line.to_string().dimmed(),
                export.name,
                if export.is_default { " (default)" } else { "" },
                export.kind.as_str()
            );
        }
    }

    if let Some(dependencies) = &analysis.dependencies {
        println!(
            "  {} (depth {})",
            "dependencies".bold(),
            analysis.dependency_depth.unwrap_or_default()
        );
        for dep in dependencies {
            println!("    {}", dep);
        }
    }

    if let Some(reverse) = &analysis.reverse_dependencies {
        println!("  {} ({})", "imported by".bold(), reverse.len());
        for rev in reverse {
            let evidence = match rev.evidence {
                Evidence::Resolved => rev.evidence.as_str().green(),
                Evidence::NameMatch => rev.evidence.as_str().yellow(),
            };
            println!(
                "    {}:{} [{}] {}",
                rev.file.display(),
                rev.line,
                evidence,
                rev.content.trim()
            );
        }
    }
}

/// A path given on the command line, relative to the project root
fn root_relative(root: &Path, path: &Path) -> xref_core::Result<String> {
    let absolute = normalize_path(&std::path::absolute(path)?);
    Ok(display_path(&absolute, root))
}

fn base_path(root: &Path, path: Option<&Path>) -> xref_core::Result<String> {
    match path {
        Some(path) => {
            let absolute = normalize_path(&std::path::absolute(path)?);
            if absolute == root {
                return Ok(".".to_string());
            }
            Ok(display_path(&absolute, root))
        }
        None => Ok(".".to_string()),
    }
}

fn detect_repo_root(override_path: Option<PathBuf>) -> Result<PathBuf, XrefError> {
    if let Some(path) = override_path {
        return Ok(path);
    }

    // Walk up from current directory looking for .xref or .git
    let mut current = std::env::current_dir()?;
    loop {
        if current.join(".xref").exists() || current.join(".git").exists() {
            return Ok(current);
        }
        if !current.pop() {
            // No parent, use current directory
            return Ok(std::env::current_dir()?);
        }
    }
}
