use std::io::Write;

use async_trait::async_trait;
use colored::Colorize;
use istate_provider::{Candidate, ConflictChoice, ConflictPrompt, ConflictResolver};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Asks on the terminal which of two candidate states to open with.
///
/// Anything other than `2` picks the first candidate.
pub struct StdinResolver;

#[async_trait]
impl ConflictResolver for StdinResolver {
    async fn choose(&self, prompt: &ConflictPrompt) -> ConflictChoice {
        println!("{}", "Two saved states are available.".bold());
        print_candidate("1", &prompt.candidate_a);
        print_candidate("2", &prompt.candidate_b);
        if prompt.own_state_available {
            println!("  (choosing 1 discards this activity's own state)");
        }
        print!("Open which state? [1/2] ");
        if let Err(e) = std::io::stdout().flush() {
            warn!(error = %e, "failed to flush prompt");
        }

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(_) if line.trim() == "2" => ConflictChoice::CandidateB,
            Ok(_) => ConflictChoice::CandidateA,
            Err(e) => {
                warn!(error = %e, "failed to read answer; using the first state");
                ConflictChoice::CandidateA
            }
        }
    }
}

fn print_candidate(label: &str, candidate: &Candidate) {
    let owner = candidate
        .instance_id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "this activity".into());
    let when = candidate
        .updated_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "unknown".into());
    println!("  {} {} (updated {})", format!("[{label}]").yellow(), owner.cyan(), when.dimmed());
}

pub fn fixed(choice: crate::cli::Choice) -> ConflictChoice {
    match choice {
        crate::cli::Choice::First => ConflictChoice::CandidateA,
        crate::cli::Choice::Second => ConflictChoice::CandidateB,
    }
}
