use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use docmirror_core::config::{DEFAULT_CONFIG_FILENAME, MirrorSettings, load_config};
use docmirror_core::manifest::load_manifest;
use docmirror_core::menu::{
    DEFAULT_COMMANDS_GROUP, DEFAULT_COMMANDS_PREFIX, DEFAULT_COMMANDS_SUBGROUP,
    DEFAULT_COMMANDS_TAB, DEFAULT_EXCLUDED_FILES, MenuTarget, collect_generated_pages,
    update_manifest_commands,
};
use docmirror_core::nav::build_nav_tree;
use docmirror_core::notion::{NotionClient, NotionClientConfig};
use docmirror_core::resolve::SourceResolver;
use docmirror_core::stamp::RootStamp;
use docmirror_core::sync::{ImportOptions, ImportReport, NodeAction, import_path};
use tracing_subscriber::fmt::layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, registry};

#[derive(Debug, Parser)]
#[command(
    name = "docmirror",
    version,
    about = "Mirror a Mintlify docs tree into a Notion page hierarchy"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(short, long, global = true, help = "Log at debug level unless RUST_LOG is set")]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    config: Option<PathBuf>,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
        }
    }

    fn settings(&self) -> Result<MirrorSettings> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME));
        if self.config.is_some() && !path.exists() {
            bail!("config file not found: {}", normalize_path(&path));
        }
        Ok(load_config(&path)?.settings())
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Replace the destination page tree with the docs at PATH")]
    Export(ExportArgs),
    #[command(about = "Print the navigation tree built from the manifest, without remote calls")]
    Tree(TreeArgs),
    #[command(
        name = "nav-commands",
        about = "Rewrite the CLI command submenu in a docs manifest from generated pages"
    )]
    NavCommands(NavCommandsArgs),
}

#[derive(Debug, Args)]
struct ExportArgs {
    #[arg(
        value_name = "PATH",
        help = "Docs directory containing the manifest, or one markdown file"
    )]
    path: PathBuf,
    #[arg(long, help = "Print the run report as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct TreeArgs {
    #[arg(value_name = "DIR")]
    dir: PathBuf,
}

#[derive(Debug, Args)]
struct NavCommandsArgs {
    #[arg(value_name = "GENERATED_DIR", help = "Directory containing generated .md command pages")]
    generated_dir: PathBuf,
    #[arg(value_name = "MANIFEST", help = "Manifest file to update")]
    manifest: PathBuf,
    #[arg(long, default_value = DEFAULT_COMMANDS_TAB)]
    tab: String,
    #[arg(long, default_value = DEFAULT_COMMANDS_GROUP)]
    group: String,
    #[arg(long, default_value = DEFAULT_COMMANDS_SUBGROUP)]
    subgroup: String,
    #[arg(long, default_value = DEFAULT_COMMANDS_PREFIX)]
    prefix: String,
    #[arg(
        long = "exclude",
        value_name = "FILE",
        help = "File name to leave out (repeatable; replaces the default bl.md)"
    )]
    exclude: Vec<String>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Export(args)) => run_export(&runtime, args),
        Some(Commands::Tree(args)) => run_tree(&runtime, args),
        Some(Commands::NavCommands(args)) => run_nav_commands(args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let directives = match env::var("RUST_LOG") {
        Ok(value) if !value.trim().is_empty() => value,
        _ if verbose => "docmirror=debug,docmirror_core=debug".to_string(),
        _ => "docmirror=info,docmirror_core=info".to_string(),
    };
    registry()
        .with(EnvFilter::builder().parse(directives)?)
        .with(layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn run_export(runtime: &RuntimeOptions, args: ExportArgs) -> Result<()> {
    let settings = runtime.settings()?;
    let token = env::var("NOTION_TOKEN")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow!("NOTION_TOKEN must be set"))?;
    let Some(root_page) = settings.root_page.clone() else {
        bail!("NOTION_ROOT_PAGE must be set (or [notion].root_page in the config file)");
    };

    let stamp_dir = if args.path.is_dir() {
        args.path.clone()
    } else {
        args.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };
    let options = ImportOptions::from_settings(&settings, RootStamp::capture(&stamp_dir));
    let mut client = NotionClient::new(NotionClientConfig::from_settings(&settings, &token))?;

    let report = import_path(&mut client, &root_page, &args.path, &options)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_import_report(&report);
    }
    Ok(())
}

fn print_import_report(report: &ImportReport) {
    let counters = &report.rebuild.counters;
    println!("export complete");
    println!("source: {}", report.source.replace('\\', "/"));
    println!("root_page: {}", report.root_page_id);
    println!("archived: {}", report.wipe.archived);
    if !report.wipe.failed.is_empty() {
        println!("archive_failures: {}", report.wipe.failed.len());
        for failure in &report.wipe.failed {
            println!("  - {failure}");
        }
    }
    println!("updated_at: {}", report.stamp.updated_at);
    println!("commit: {}", report.stamp.revision);
    if !counters.per_group.is_empty() {
        println!("pages_per_group:");
        for (group, count) in &counters.per_group {
            println!("  {group}: {count}");
        }
    }
    println!("total_pages: {}", counters.total_pages);

    let skipped = report
        .rebuild
        .nodes
        .iter()
        .filter(|outcome| outcome.action == NodeAction::Skipped)
        .collect::<Vec<_>>();
    if !skipped.is_empty() {
        println!("skipped: {}", skipped.len());
        for outcome in skipped {
            println!(
                "  - [{}] {} ({} below): {}",
                outcome.kind.as_str(),
                outcome.title,
                outcome.descendants_skipped,
                outcome.detail.as_deref().unwrap_or("-")
            );
        }
    }
    if !report.unresolved.is_empty() {
        println!("unresolved: {}", report.unresolved.len());
        for slug in &report.unresolved {
            println!("  - {slug}");
        }
    }
    println!("requests: {}", report.request_count);
}

fn run_tree(runtime: &RuntimeOptions, args: TreeArgs) -> Result<()> {
    let settings = runtime.settings()?;
    let root = args
        .dir
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", normalize_path(&args.dir)))?;
    let manifest = load_manifest(&root, &settings.manifest_name)?;
    let resolver = SourceResolver::new(&root, settings.ignored_dirs.iter().cloned());
    let tree = build_nav_tree(&manifest, &resolver);

    print!("{}", tree.render(&root));
    println!();
    println!("content_pages: {}", tree.content_count());
    print_list("unresolved", &tree.unresolved);
    print_list("ignored", &tree.ignored);
    print_list("dropped_groups", &tree.dropped_groups);
    print_list("dropped_tabs", &tree.dropped_tabs);
    Ok(())
}

fn run_nav_commands(args: NavCommandsArgs) -> Result<()> {
    let excluded = if args.exclude.is_empty() {
        DEFAULT_EXCLUDED_FILES
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    } else {
        args.exclude
    };
    let pages = collect_generated_pages(&args.generated_dir, &args.prefix, &excluded)?;
    let target = MenuTarget {
        tab: args.tab,
        group: args.group,
        subgroup: args.subgroup,
    };
    update_manifest_commands(&args.manifest, &pages, &target)?;

    println!(
        "Updated {} with {} pages under '{}' -> '{}' -> '{}'.",
        normalize_path(&args.manifest),
        pages.len(),
        target.tab,
        target.group,
        target.subgroup
    );
    Ok(())
}

fn print_list(label: &str, values: &[String]) {
    println!("{label}: {}", values.len());
    for value in values {
        println!("  - {value}");
    }
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
