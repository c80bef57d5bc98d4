// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use bingo_registry::{
    AccessGrants, Board, BingoError, LogNotifier, NotifyError, Services, Settings, TeamId,
    Verification,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Signup registry and team bingo boards
#[derive(Parser, Debug)]
#[command(name = "bingo")]
#[command(about = "Signup verification and item bingo for two teams")]
#[command(version)]
struct Cli {
    /// TOML settings file
    #[arg(long, global = true, env = "BINGO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import paid signups from a form export (default: configured CSV)
    Sync { csv: Option<PathBuf> },

    /// Claim a username for a caller
    Verify {
        username: String,
        caller: String,
        /// Caller already holds the team's access role
        #[arg(long)]
        holds_role: bool,
    },

    /// Approve a caller's pending verification
    ApproveUser {
        caller: String,
        #[arg(long, default_value = "admin")]
        admin: String,
    },

    /// Reject a caller's pending verification
    RejectUser {
        caller: String,
        #[arg(long, default_value = "admin")]
        admin: String,
    },

    /// Submit an obtained item
    Submit {
        caller: String,
        attachment: String,
        #[arg(required = true, num_args = 1..)]
        item: Vec<String>,
    },

    /// Approve a submission by id
    Approve {
        submission_id: String,
        #[arg(long, default_value = "admin")]
        admin: String,
    },

    /// List unapproved submissions
    Pending,

    /// Board progress for a team
    Progress { team: String },

    /// Search a team's board for an item
    Search {
        team: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Signup counts per team
    Breakdown,

    /// Validate and install a board definition
    InstallBoard { team: String, file: PathBuf },

    /// Terminal board viewer
    Ui,
}

/// Access roles live on the chat platform; the CLI takes the answer as a flag
struct FlagGrants {
    holds: bool,
}

impl AccessGrants for FlagGrants {
    fn holds(&self, _caller: &str, _team: &TeamId) -> bool {
        self.holds
    }

    fn grant(&self, caller: &str, team: &TeamId) -> std::result::Result<(), NotifyError> {
        println!("🔑 Grant the {} role to {}", team.title(), caller);
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("bingo_registry=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    let holds = matches!(cli.command, Some(Command::Verify { holds_role: true, .. }));
    let services = Services::new(settings, Arc::new(FlagGrants { holds }), Arc::new(LogNotifier))
        .context("Failed to open data directory")?;

    match run(&services, cli.command.unwrap_or(Command::Ui)) {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast_ref::<BingoError>() {
            Some(domain) if domain.is_domain() => {
                eprintln!("❌ {}", domain);
                std::process::exit(1);
            }
            _ => Err(e),
        },
    }
}

fn run(services: &Services, command: Command) -> Result<()> {
    let roster = services.registry.roster();

    match command {
        Command::Sync { csv } => {
            let report = match csv {
                Some(path) => services.signups.sync(&services.csv_feed(&path))?,
                None => services.signups.sync_configured()?,
            };
            println!("🔄 Sync complete");
            println!("   Imported:       {}", report.imported);
            println!("   Already known:  {}", report.already_known);
            println!("   Unpaid:         {}", report.unpaid);
            println!("   No team:        {}", report.unknown_team);
            println!("   Invalid:        {}", report.invalid);
            for signup in &report.new_signups {
                println!("   📥 {} ({})", signup.username, signup.team.title());
            }
        }

        Command::Verify { username, caller, .. } => match services.signups.verify(&username, &caller)? {
            Verification::Pending(entry) => {
                println!("⏳ {} is pending approval for team {}", entry.username, entry.team.title());
                println!("   Approve with: bingo approve-user {}", entry.external_id);
            }
            Verification::ReapprovalNeeded(entry) => {
                println!("🔧 {} was approved but lacks the team role; re-approval needed", entry.username);
                println!("   Approve with: bingo approve-user {}", entry.external_id);
            }
        },

        Command::ApproveUser { caller, admin } => {
            let record = services.signups.approve_user(&caller, &admin)?;
            println!("✅ {} approved for team {}", record.username, record.team.title());
        }

        Command::RejectUser { caller, admin } => {
            let entry = services.signups.reject_user(&caller, &admin)?;
            println!("🚫 Rejected {}'s claim on {}", caller, entry.username);
        }

        Command::Submit { caller, attachment, item } => {
            let receipt = services.workflow.submit(&caller, &item.join(" "), &attachment)?;
            println!("📸 Submission {} recorded", receipt.submission.id);
            println!("   Tile:     {} ({} pts) {}", receipt.coordinate, receipt.tile_points, receipt.tile_description);
            println!("   Item:     {}", receipt.submission.item_name);
            println!("   Progress: {}", receipt.progress.description);
            if receipt.needs_review() {
                println!(
                    "   ⚠️  Fuzzy match ({:.0}%) for \"{}\", please confirm",
                    receipt.submission.similarity * 100.0,
                    receipt.submission.original_input
                );
                for alt in &receipt.alternates {
                    println!("      or {} on {} ({:.0}%)", alt.item, alt.key, alt.similarity * 100.0);
                }
            }
        }

        Command::Approve { submission_id, admin } => {
            let outcome = services.workflow.approve(&submission_id, &admin)?;
            println!(
                "✅ Approved {} on {} {} ({})",
                outcome.result.submission.item_name,
                outcome.team.title(),
                outcome.coordinate,
                outcome.result.progress.description
            );
            if outcome.result.tile_completed {
                println!("🎉 Tile completed! +{} points", outcome.points_delta);
            }
            println!("   Team total: {} points", outcome.result.new_total_points);
        }

        Command::Pending => {
            let pending = services.workflow.pending()?;
            if pending.is_empty() {
                println!("✅ No pending submissions");
            }
            for p in pending {
                println!(
                    "⏳ {}  {} {}  {} by {} ({:.0}%)",
                    p.submission.id,
                    p.team.title(),
                    p.coordinate,
                    p.submission.item_name,
                    p.submission.submitter_rsn,
                    p.submission.similarity * 100.0
                );
            }
        }

        Command::Progress { team } => {
            let team = roster.parse(&team)?;
            let summary = services.engine.board_summary(&team)?;
            println!(
                "🎯 Team {}: {} points, {}/{} tiles ({}%)",
                roster.display_name(&team),
                summary.total_points,
                summary.completed.len(),
                summary.tile_count(),
                summary.percent_complete()
            );
            for (label, lines) in [
                ("✅ Completed", &summary.completed),
                ("🔄 In progress", &summary.in_progress),
                ("⬜ Remaining", &summary.remaining),
            ] {
                if lines.is_empty() {
                    continue;
                }
                println!("\n{}", label);
                for line in lines {
                    let by = if line.contributors.is_empty() {
                        String::new()
                    } else {
                        format!("  by {}", line.contributors.join(", "))
                    };
                    println!("   {:<4} {:>3} pts  {:<6} {}{}", line.coordinate, line.points, line.progress, line.description, by);
                }
            }
        }

        Command::Search { team, text } => {
            let team = roster.parse(&team)?;
            let text = text.join(" ");
            let hits = services.engine.search(&team, &text)?;
            if hits.is_empty() {
                println!("🔍 No items matching \"{}\"", text);
            }
            for hit in hits {
                let done = if hit.completed { " ✅" } else { "" };
                let hint = hit.hint.map(|h| format!(" ({})", h)).unwrap_or_default();
                println!(
                    "🔍 {:<4} {:<30} {:>3.0}%  {} pts{}{}",
                    hit.coordinate,
                    hit.item,
                    hit.similarity * 100.0,
                    hit.points,
                    hint,
                    done
                );
            }
        }

        Command::Breakdown => {
            let report = services.registry.breakdown()?;
            for team in &report.teams {
                println!("👥 Team {}", roster.display_name(&team.team));
                println!("   Approved ({}): {}", team.approved.len(), team.approved.join(", "));
                println!("   Pending ({}): {}", team.pending.len(), team.pending.join(", "));
                println!("   Unprocessed ({}): {}", team.unprocessed.len(), team.unprocessed.join(", "));
            }
            println!(
                "📊 {} approved, {} pending, {} unprocessed",
                report.total_approved, report.total_pending, report.total_unprocessed
            );
        }

        Command::InstallBoard { team, file } => {
            let team = roster.parse(&team)?;
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read board file {}", file.display()))?;
            let board: Board = serde_json::from_str(&text)
                .with_context(|| format!("Invalid board file {}", file.display()))?;
            services.engine.install_board(&team, &board)?;
            println!("✅ Installed {} tiles for team {}", board.tiles.len(), roster.display_name(&team));
        }

        Command::Ui => run_ui_mode(services)?,
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(services: &Services) -> Result<()> {
    let roster = services.registry.roster();

    let mut boards = Vec::new();
    for team in roster.ids() {
        match services.engine.load_board(&team) {
            Ok(board) => boards.push(ui::TeamBoard {
                display_name: roster.display_name(&team),
                team,
                board,
            }),
            Err(BingoError::NotFound(what)) => tracing::warn!(%what, "no board installed"),
            Err(e) => return Err(e.into()),
        }
    }

    let pending = services.workflow.pending()?;
    let breakdown = services.registry.breakdown()?;

    let mut app = ui::App::new(boards, pending, breakdown);
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_services: &Services) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin bingo-server --features server");
    std::process::exit(1);
}
