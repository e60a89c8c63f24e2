mod config;
mod logging;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use config::{CliOverrides, ConfigMerger, MergedConfig};
use fs_err as fs;
use projfix_domain::{
    AddPropertyIfAbsent, AddTestProperties, ApplyLookup, BatchOptions, FixUnitTestHintPath,
    FrameworkVersion, Patch, PatchError, SetFrameworkVersion, StripVersion, apply_to_all,
};
use projfix_lookup::{LookupStore, RemapRule};
use std::process::ExitCode;
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(
    name = "projfix",
    version,
    about = "Batch fixes for C# project files and their reference hint paths."
)]
struct Cli {
    /// Root directory to search for project files.
    #[arg(short = 'r', long, default_value = ".", global = true)]
    root: Utf8PathBuf,

    /// Show what would change as a unified diff; write nothing.
    #[arg(long, default_value_t = false, global = true)]
    dry_run: bool,

    /// Append logs to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<Utf8PathBuf>,

    /// Write the per-file batch report as JSON to this file.
    #[arg(long, global = true)]
    report: Option<Utf8PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add the CLS-compliance property where it is missing.
    Cls,
    /// Fix hint paths to Microsoft.VisualStudio.QualityTools.UnitTestFramework.
    Unittest,
    /// Update the target .NET framework version.
    Dotnetver(DotnetverArgs),
    /// Add QTest properties to all test projects.
    Qtest,
    /// Strip version information from reference names.
    Versionless(VersionlessArgs),
    /// Replace hint paths with the ones recorded in a lookup file.
    Pathfix(MapArgs),
    /// Record every reference's current hint path in a lookup file.
    Initlookup(OutArgs),
    /// Rewrite package hint paths in a lookup file to $(Pkg<name>) form.
    Remaplookup(RemapArgs),
}

#[derive(Debug, clap::Args)]
struct DotnetverArgs {
    /// New TargetFrameworkVersion, such as v4.5.2.
    #[arg(short = 'v', long)]
    version: Option<String>,
}

#[derive(Debug, clap::Args)]
struct VersionlessArgs {
    /// Also strip references whose hint path is under an External folder.
    #[arg(long, default_value_t = false)]
    include_external: bool,
}

#[derive(Debug, clap::Args)]
struct MapArgs {
    /// Reference-to-hint-path JSON lookup file.
    #[arg(short = 'm', long)]
    map: Option<Utf8PathBuf>,
}

#[derive(Debug, clap::Args)]
struct OutArgs {
    /// Output JSON file (default: refs_old.json).
    #[arg(short = 'o', long)]
    out: Option<Utf8PathBuf>,
}

#[derive(Debug, clap::Args)]
struct RemapArgs {
    /// Lookup file to remap.
    #[arg(short = 'm', long)]
    map: Option<Utf8PathBuf>,

    /// Output JSON file (default: overwrite the input).
    #[arg(short = 'o', long)]
    out: Option<Utf8PathBuf>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let mut overrides = CliOverrides {
            log_file: self.log_file.clone(),
            ..CliOverrides::default()
        };
        match &self.cmd {
            Command::Dotnetver(args) => overrides.version = args.version.clone(),
            Command::Versionless(args) => overrides.include_external = args.include_external,
            Command::Pathfix(args) => overrides.map = args.map.clone(),
            Command::Initlookup(args) => overrides.out = args.out.clone(),
            Command::Remaplookup(args) => overrides.map = args.map.clone(),
            Command::Cls | Command::Unittest | Command::Qtest => {}
        }
        overrides
    }
}

/// What every batch command needs besides its patch.
struct RunContext {
    root: Utf8PathBuf,
    dry_run: bool,
    report: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match real_main(cli) {
        Ok(code) => code,
        Err(e) => {
            debug!("{e:?}");
            eprintln!("projfix: {e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Precondition failures exit 2; anything else 1.
fn exit_code(e: &anyhow::Error) -> u8 {
    e.downcast_ref::<PatchError>()
        .map_or(1, PatchError::exit_code)
}

fn real_main(cli: Cli) -> anyhow::Result<ExitCode> {
    let file_config = config::load_or_default(&cli.root).context("load projfix.toml config")?;
    let merged = ConfigMerger::new(file_config, &cli.root).merge(&cli.overrides());
    logging::init(merged.log_filter.as_deref(), merged.log_file.as_deref())?;
    debug!(?merged, "merged config");

    let ctx = RunContext {
        root: cli.root,
        dry_run: cli.dry_run,
        report: cli.report,
    };

    match cli.cmd {
        Command::Cls => run_patch(&ctx, &AddPropertyIfAbsent::cls_compliant()),
        Command::Unittest => run_patch(&ctx, &FixUnitTestHintPath),
        Command::Dotnetver(_) => {
            let version = required(merged.dotnet_version.as_deref(), "dotnetver", "--version")?;
            let version: FrameworkVersion = version.parse()?;
            run_patch(&ctx, &SetFrameworkVersion::new(version))
        }
        Command::Qtest => run_patch(&ctx, &AddTestProperties),
        Command::Versionless(_) => run_patch(&ctx, &StripVersion::new(!merged.include_external)),
        Command::Pathfix(_) => {
            let map = required(merged.map.as_deref(), "pathfix", "--map")?;
            let store = load_lookup(map)?;
            run_patch(&ctx, &ApplyLookup::new(store))
        }
        Command::Initlookup(_) => cmd_initlookup(&ctx, &merged),
        Command::Remaplookup(args) => cmd_remaplookup(&ctx, &merged, args.out),
    }
}

fn required<'a, T: ?Sized>(
    value: Option<&'a T>,
    action: &str,
    flag: &str,
) -> Result<&'a T, PatchError> {
    value.ok_or_else(|| PatchError::validation(format!("{action} requires {flag}")))
}

fn load_lookup(path: &Utf8Path) -> Result<LookupStore, PatchError> {
    Ok(LookupStore::load(path)?)
}

fn run_patch(ctx: &RunContext, patch: &dyn Patch) -> anyhow::Result<ExitCode> {
    let opts = BatchOptions {
        dry_run: ctx.dry_run,
    };
    let (report, diff) = apply_to_all(&ctx.root, patch.file_pattern(), patch, &opts)
        .with_context(|| format!("{} under {}", patch.id(), ctx.root))?;

    if ctx.dry_run {
        print!("{diff}");
    }
    if let Some(path) = &ctx.report {
        write_json(path, &report)?;
    }

    info!(
        "{}: {} changed, {} unchanged, {} failed",
        patch.id(),
        report.summary.changed,
        report.summary.unchanged,
        report.summary.failed
    );
    if report.has_failures() {
        warn!("some project files could not be patched; see the log above");
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_initlookup(ctx: &RunContext, merged: &MergedConfig) -> anyhow::Result<ExitCode> {
    let store = LookupStore::aggregate(&ctx.root)
        .with_context(|| format!("collect hint paths under {}", ctx.root))?;
    let out = merged
        .lookup_out
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(config::DEFAULT_LOOKUP_OUT));
    emit_lookup(ctx, &store, &out)?;
    Ok(ExitCode::SUCCESS)
}

/// Remap package hint paths; the input file is overwritten unless `out` is given.
fn cmd_remaplookup(
    ctx: &RunContext,
    merged: &MergedConfig,
    out: Option<Utf8PathBuf>,
) -> anyhow::Result<ExitCode> {
    let map = required(merged.map.as_deref(), "remaplookup", "--map")?;
    let store = load_lookup(map)?;
    let remapped = store.remap_path_pattern(&RemapRule::package_lib());
    info!(
        kept = remapped.len(),
        dropped = store.len() - remapped.len(),
        "remapped lookup"
    );

    let out = out.unwrap_or_else(|| map.to_path_buf());
    emit_lookup(ctx, &remapped, &out)?;
    Ok(ExitCode::SUCCESS)
}

fn emit_lookup(ctx: &RunContext, store: &LookupStore, out: &Utf8Path) -> anyhow::Result<()> {
    if ctx.dry_run {
        println!("{}", store.to_json());
        return Ok(());
    }
    store
        .persist(out)
        .with_context(|| format!("write lookup {}", out))?;
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Utf8Path, v: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(v).context("serialize json")?;
    fs::write(path, s).with_context(|| format!("write {}", path))?;
    Ok(())
}
