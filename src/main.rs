use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};

use gitloom::conflict::Resolution;
use gitloom::engine::Engine;
use gitloom::graph::GraphQuery;
use gitloom::model::MergeOutcome;
use gitloom::ops::MergeMode;
use gitloom::stash::TempStash;
use gitloom::telemetry;

mod format;

use format::OutputFormat;

/// Repository state inspector with conflict-safe stash reapplication
///
/// Shows the labeled commit graph, the repository's in-progress state and
/// its conflicts, and reapplies stash entries onto a dirty working tree
/// without losing either side.
///
/// Set GITLOOM_TRACE=pretty (or stderr for JSON) to see what runs.
#[derive(Parser)]
#[command(name = "gitloom")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', global = true, default_value = ".")]
    dir: PathBuf,

    /// Configuration file (default: <git-dir>/gitloom.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the labeled commit graph, newest first
    Log {
        /// Commits to skip from the top
        #[arg(long, default_value_t = 0)]
        skip: usize,
        /// Commits to show (default: graph.page_size)
        #[arg(long, short = 'n')]
        count: Option<usize>,
        /// Only history reachable from this branch (`main`, `origin/main`)
        #[arg(long)]
        branch: Option<String>,
    },

    /// Show what the repository is in the middle of
    State,

    /// List conflicting paths with the sides the index holds
    Conflicts,

    /// Settle one conflicting path
    Resolve(ResolveArgs),

    /// Browse and reapply stash entries
    #[command(subcommand)]
    Stash(StashCommands),

    /// Merge a branch into the current branch
    Merge {
        branch: String,
        /// Refuse anything but a fast-forward
        #[arg(long, conflicts_with = "squash")]
        ff_only: bool,
        /// Stage the combined changes without committing
        #[arg(long)]
        squash: bool,
    },

    /// Apply the change a commit introduces
    CherryPick { rev: String },

    /// Replay the current branch onto another
    Rebase { upstream: String },

    /// Abandon the stopped merge, rebase or cherry-pick
    Abort,
}

#[derive(Args)]
#[command(group(ArgGroup::new("side").required(true).multiple(false)))]
struct ResolveArgs {
    path: String,
    /// Take our side
    #[arg(long, group = "side")]
    ours: bool,
    /// Take their side
    #[arg(long, group = "side")]
    theirs: bool,
    /// Keep the working-tree file as edited
    #[arg(long, group = "side")]
    mark: bool,
}

#[derive(Subcommand)]
enum StashCommands {
    /// List stash entries
    List,
    /// Reapply an entry onto the working tree and drop it
    Pop {
        /// Position in the stash list
        #[arg(default_value_t = 0)]
        index: usize,
    },
    /// Drop the temporary entry a conflicted pop left behind
    Release {
        /// Object id printed by `stash pop`
        id: String,
    },
    /// Reapply the temporary entry onto a clean tree and drop it
    Restore {
        /// Object id printed by `stash pop`
        id: String,
    },
}

fn main() -> Result<ExitCode> {
    telemetry::init();
    let cli = Cli::parse();
    let engine = Engine::open(&cli.dir, cli.config.as_deref())
        .with_context(|| format!("opening repository at {}", cli.dir.display()))?;
    let fmt = cli.format;

    match cli.command {
        Commands::Log {
            skip,
            count,
            branch,
        } => {
            let query = GraphQuery {
                skip,
                count,
                branch,
            };
            let commits = engine.graph().build(&query)?;
            print!("{}", fmt.render(&commits, |c| format::commits_text(c))?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::State => {
            let state = engine.tracker().state()?;
            print!("{}", fmt.render(&state, format::state_text)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Conflicts => {
            let records = engine.tracker().records()?;
            print!("{}", fmt.render(&records, |r| format::conflicts_text(r))?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Resolve(args) => {
            let resolution = if args.ours {
                Resolution::Ours
            } else if args.theirs {
                Resolution::Theirs
            } else {
                Resolution::MarkResolved
            };
            engine.tracker().resolve(&args.path, resolution)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Stash(cmd) => run_stash(&engine, cmd, fmt),
        Commands::Merge {
            branch,
            ff_only,
            squash,
        } => {
            let mode = if ff_only {
                MergeMode::FastForwardOnly
            } else if squash {
                MergeMode::Squash
            } else {
                MergeMode::Normal
            };
            report(fmt, &engine.ops().merge_branch(&branch, mode)?)
        }
        Commands::CherryPick { rev } => report(fmt, &engine.ops().cherry_pick(&rev)?),
        Commands::Rebase { upstream } => report(fmt, &engine.ops().rebase_onto(&upstream)?),
        Commands::Abort => {
            let aborted = engine.ops().abort()?;
            print!("{}", fmt.render(&aborted, |s| format!("aborted: {s}\n"))?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_stash(engine: &Engine, cmd: StashCommands, fmt: OutputFormat) -> Result<ExitCode> {
    let stash = engine.stash();
    match cmd {
        StashCommands::List => {
            let entries = stash.list()?;
            print!("{}", fmt.render(&entries, |e| format::stash_list_text(e))?);
            Ok(ExitCode::SUCCESS)
        }
        StashCommands::Pop { index } => {
            let pop = stash.pop(index)?;
            print!("{}", fmt.render(&pop, format::stash_pop_text)?);
            Ok(exit_code(&pop.outcome))
        }
        StashCommands::Release { id } => {
            stash.release_temp(&parse_temp(&id)?)?;
            Ok(ExitCode::SUCCESS)
        }
        StashCommands::Restore { id } => report(fmt, &stash.restore_temp(&parse_temp(&id)?)?),
    }
}

fn parse_temp(id: &str) -> Result<TempStash> {
    let oid = id
        .parse()
        .with_context(|| format!("'{id}' is not a full 40-character object id"))?;
    Ok(TempStash::from_id(oid))
}

fn report(fmt: OutputFormat, outcome: &MergeOutcome) -> Result<ExitCode> {
    print!("{}", fmt.render(outcome, format::outcome_text)?);
    Ok(exit_code(outcome))
}

fn exit_code(outcome: &MergeOutcome) -> ExitCode {
    match outcome {
        MergeOutcome::Success => ExitCode::SUCCESS,
        MergeOutcome::Conflicts(_) => ExitCode::from(1),
        MergeOutcome::UnrelatedHistories | MergeOutcome::Failure(_) => ExitCode::from(2),
    }
}
