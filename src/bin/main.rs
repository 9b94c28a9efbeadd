//! Thin CLI surface over the reconciler (spec.md §6 "CLI surface").
//!
//! The CLI is explicitly out-of-core: it exists to exercise
//! `Reconciler`/`PackageContainer` end to end, not to implement fetching.
//! A real front end would replace [`load_registry`]'s `MemoryContainer`
//! with one backed by an HTTP/Git-backed container and drop `--registry`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use pkgresolve::container::{MemoryContainer, PinPoint};
use pkgresolve::error::ResolverError;
use pkgresolve::identity::PackageIdentity;
use pkgresolve::mirrors::Mirrors;
use pkgresolve::reconciler::{MemoryCheckouts, Reconciler};
use pkgresolve::reference::PackageReference;
use pkgresolve::resolver::CancellationToken;
use pkgresolve::version::{parse_version, Requirement, VersionSetSpecifier};

#[derive(Parser)]
#[command(name = "pkgresolve", about = "Dependency resolver and pinned-graph workflow")]
struct Cli {
    /// Path to the pins (lockfile) file.
    #[arg(long, global = true, default_value = "pins.json")]
    pins: PathBuf,

    /// Path to a JSON registry fixture describing available packages.
    /// Stands in for the real container provider, which is out of core.
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve against the current pins, treating them as hints.
    Resolve {
        /// Root requirements, e.g. `foo=^1.0.0` or `bar=branch:main`.
        #[arg(long = "require", value_name = "NAME=REQUIREMENT")]
        requirements: Vec<String>,
    },
    /// Re-resolve, discarding existing pins as hints.
    Update {
        #[arg(long = "require", value_name = "NAME=REQUIREMENT")]
        requirements: Vec<String>,
    },
    /// Print the current pins without resolving.
    Pin { identity: String },
    /// Remove a pin.
    Unpin { identity: String },
    /// Enter edit mode for a dependency, on a branch, at a revision, or
    /// (if neither is given) on whatever's currently checked out.
    Edit {
        identity: String,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        revision: Option<String>,
    },
    /// Leave edit mode for a dependency.
    Unedit {
        identity: String,
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Deserialize)]
struct RegistryFixture {
    packages: Vec<RegistryPackage>,
}

#[derive(Debug, Deserialize)]
struct RegistryPackage {
    identity: String,
    versions: Vec<String>,
    #[serde(default)]
    dependencies: Vec<RegistryDependency>,
}

#[derive(Debug, Deserialize)]
struct RegistryDependency {
    at: String,
    identity: String,
    requirement: String,
}

fn load_registry(path: &PathBuf) -> Result<MemoryContainer> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading registry fixture '{}'", path.display()))?;
    let fixture: RegistryFixture = serde_json::from_str(&text).context("parsing registry fixture")?;
    let mut container = MemoryContainer::new();
    for pkg in fixture.packages {
        let identity = PackageIdentity::from_raw(&pkg.identity);
        for v in &pkg.versions {
            container.add_version(identity.clone(), parse_version(v)?);
        }
        for dep in pkg.dependencies {
            let at = if let Ok(v) = parse_version(&dep.at) {
                PinPoint::Version(v)
            } else {
                PinPoint::Revision(dep.at.clone())
            };
            let dep_identity = PackageIdentity::from_raw(&dep.identity);
            let requirement = parse_requirement(&dep.requirement)?;
            container.add_dependency(
                identity.clone(),
                at,
                PackageReference::Registry { identity: dep_identity },
                requirement,
            );
        }
    }
    Ok(container)
}

fn parse_requirement(s: &str) -> Result<Requirement> {
    if let Some(branch) = s.strip_prefix("branch:") {
        return Ok(Requirement::Branch(branch.to_string()));
    }
    if let Some(rev) = s.strip_prefix("rev:") {
        return Ok(Requirement::Revision(rev.to_string()));
    }
    if s == "*" {
        return Ok(Requirement::Unversioned);
    }
    if let Some(exact) = s.strip_prefix('=') {
        return Ok(Requirement::Exact(parse_version(exact)?));
    }
    // A minimal caret-range parser: `^X.Y.Z` means `[X.Y.Z, (X+1).0.0)`.
    if let Some(base) = s.strip_prefix('^') {
        let lo = parse_version(base)?;
        let mut hi = lo.clone();
        hi.major += 1;
        hi.minor = 0;
        hi.patch = 0;
        hi.pre = semver::Prerelease::EMPTY;
        return Ok(Requirement::Range(VersionSetSpecifier::from_ranges(
            pkgresolve::version::RangeSet::half_open(lo, hi),
        )));
    }
    anyhow::bail!("unrecognized requirement syntax '{s}'")
}

fn parse_roots(requirements: &[String]) -> Result<Vec<(PackageReference, Requirement)>> {
    requirements
        .iter()
        .map(|r| {
            let (name, req) = r
                .split_once('=')
                .with_context(|| format!("requirement '{r}' is not of the form NAME=REQUIREMENT"))?;
            let identity = PackageIdentity::from_raw(name);
            Ok((PackageReference::Registry { identity }, parse_requirement(req)?))
        })
        .collect()
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Pin { identity } => {
            let mut reconciler = build_reconciler(&cli, Vec::new())?;
            reconciler.load()?;
            match reconciler.pins().get(&PackageIdentity::from_raw(&identity)) {
                Some(pin) => println!("{identity}: {:?}", pin.state),
                None => println!("{identity}: not pinned"),
            }
        }
        Command::Unpin { identity } => {
            let dir = cli.pins.parent().unwrap_or_else(|| std::path::Path::new("."));
            let lock = pkgresolve::pins::PinsLock::acquire(dir)?;
            let mut store = pkgresolve::pins::PinsStore::load(&cli.pins, &lock)?;
            store.unpin(&PackageIdentity::from_raw(&identity));
            store.save(&cli.pins, &Mirrors::new(), &lock)?;
            println!("'{identity}' unpinned");
        }
        Command::Resolve { requirements } => {
            let roots = parse_roots(&requirements)?;
            let mut reconciler = build_reconciler(&cli, roots)?;
            resolve_and_apply(&mut reconciler, false)?;
        }
        Command::Update { requirements } => {
            let roots = parse_roots(&requirements)?;
            let mut reconciler = build_reconciler(&cli, roots)?;
            resolve_and_apply(&mut reconciler, true)?;
        }
        Command::Edit { identity, branch, revision } => {
            let mut reconciler = build_reconciler(&cli, Vec::new())?;
            reconciler.load()?;
            reconciler.enter_edit(&PackageIdentity::from_raw(&identity), branch.as_deref(), revision.as_deref())?;
            match (&branch, &revision) {
                (Some(b), _) => println!("'{identity}' is now in edit mode on branch '{b}'"),
                (None, Some(r)) => println!("'{identity}' is now in edit mode at revision '{r}'"),
                (None, None) => println!("'{identity}' is now in edit mode"),
            }
        }
        Command::Unedit { identity, force } => {
            let mut reconciler = build_reconciler(&cli, Vec::new())?;
            reconciler.load()?;
            reconciler.leave_edit(&PackageIdentity::from_raw(&identity), force)?;
            println!("'{identity}' left edit mode");
        }
    }
    Ok(())
}

fn resolve_and_apply(reconciler: &mut Reconciler<'_>, update: bool) -> Result<()> {
    reconciler.load()?;
    if update {
        reconciler.update(&CancellationToken::new())?;
    } else {
        reconciler.resolve(&CancellationToken::new())?;
    }
    for diagnostic in reconciler.diagnostics() {
        tracing::warn!(target: "pkgresolve::cli", "{diagnostic}");
    }
    reconciler.apply()?;
    for pin in reconciler.pins().iter() {
        println!("{}: {:?}", pin.identity, pin.state);
    }
    Ok(())
}

// `build_reconciler` leaks its container/checkouts with `Box::leak` so the
// `Reconciler<'a>` borrow can outlive this function without threading
// lifetimes through `run`; acceptable for a process-lifetime CLI command.
fn build_reconciler(cli: &Cli, roots: Vec<(PackageReference, Requirement)>) -> Result<Reconciler<'static>> {
    let container: &'static MemoryContainer = Box::leak(Box::new(match &cli.registry {
        Some(path) => load_registry(path)?,
        None => MemoryContainer::new(),
    }));
    let checkouts: &'static MemoryCheckouts = Box::leak(Box::new(MemoryCheckouts::default()));
    Ok(Reconciler::new(cli.pins.clone(), Mirrors::new(), container, checkouts, roots))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(resolver_err) = err.downcast_ref::<ResolverError>() {
                eprintln!("error: {resolver_err}");
            } else {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
