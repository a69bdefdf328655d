//! Terminal Walkthrough for the Matrix Tutor Lessons
//!
//! Inspect lessons, check answers and replay recorded sessions without a UI.
//!
//! ## Usage
//!
//! ```bash
//! # Every step of a lesson with its grading and prerequisites
//! cargo run --bin walkthrough -- list self-attention
//!
//! # Full catalog entry for one step, as JSON
//! cargo run --bin walkthrough -- show multi-head-attention calc-scores-head1
//!
//! # Check an answer
//! cargo run --bin walkthrough -- check self-attention calc-q '[[10,0,0,0],[0,0,0,0],[0,0,0,0],[0,0,0,0],[0,0,0,0]]'
//!
//! # Replay a recorded script
//! RUST_LOG=info cargo run --bin walkthrough -- replay session.json
//!
//! # Solve a lesson with the expected answers
//! cargo run --bin walkthrough -- solve neural-network
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use matrix_tutor::config::load_script;
use matrix_tutor::lessons::word2vec;
use matrix_tutor::{Grading, Lesson, LessonKind, Session, StepId};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "walkthrough",
    version,
    about = "Step through attention, backprop and word2vec arithmetic"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every step of a lesson.
    List {
        /// self-attention, multi-head-attention, neural-network or word2vec
        lesson: LessonKind,
    },

    /// Print one step's catalog entry as JSON.
    Show {
        lesson: LessonKind,
        /// Step id, e.g. "calc-q" or "calc-scores-head2"
        step: String,
    },

    /// Validate a matrix (JSON rows) against a step.
    Check {
        lesson: LessonKind,
        step: String,
        /// e.g. '[[1, 0], [0, 1]]'
        matrix: String,
    },

    /// Replay a JSON script of learner actions.
    Replay {
        script: PathBuf,
    },

    /// Complete a lesson using the expected answers.
    Solve {
        lesson: LessonKind,
    },
}

fn list(lesson: &Lesson) {
    println!("{} ({} steps)", lesson.title(), lesson.step_count());
    println!("{}", "=".repeat(60));
    if let Some(intro) = lesson.intro() {
        println!("{}: {}", intro.step_number, intro.explanation);
        println!();
    }
    for meta in lesson.steps() {
        let grading = match meta.grading {
            Grading::Manual => "manual",
            Grading::Auto => "auto",
        };
        let prereqs: Vec<String> = meta.prerequisites.iter().map(StepId::to_string).collect();
        let seed = if lesson.seed().contains(&meta.id) { " [seed]" } else { "" };
        println!(
            "{:<22} {:<7} {:<32} after: {}{}",
            meta.id,
            grading,
            meta.result_name,
            if prereqs.is_empty() { "-".to_string() } else { prereqs.join(", ") },
            seed
        );
    }
}

fn solve(lesson: &Lesson) -> Result<()> {
    let mut session = Session::new(lesson);
    println!("Solving {}", lesson.title());

    for revealed in session.reveal_unlocked() {
        println!("  shown     {}", revealed);
    }

    for id in lesson.solve_order() {
        let meta = lesson.metadata(id)?;
        if meta.grading == Grading::Auto || session.is_completed(id) {
            continue;
        }
        let result = session.submit(id, &meta.expected.to_rows())?;
        println!("  {:<9} {}  {}", "solved", id, meta.formula);
        print!("{}", indent(&meta.expected.to_string()));
        for unlocked in result.unlocked {
            println!("  unlocked  {}", unlocked);
        }
        for revealed in session.reveal_unlocked() {
            println!("  shown     {}", revealed);
        }
    }

    if lesson.kind() == LessonKind::Word2Vec {
        let y_pred = lesson.compute_expected(&StepId::new("activate-y-pred"))?;
        if let Some(word) = word2vec::predicted_word(y_pred) {
            println!("Predicted word before the update: {}", word);
        }
    }

    let (done, total) = session.progress();
    println!("Progress: {}/{}", done, total);
    Ok(())
}

fn indent(text: &str) -> String {
    text.lines().map(|l| format!("            {}\n", l)).collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::List { lesson } => {
            list(&Lesson::load(lesson)?);
        }
        Command::Show { lesson, step } => {
            let lesson = Lesson::load(lesson)?;
            let id = lesson.step_id(&step)?;
            println!("{}", serde_json::to_string_pretty(lesson.metadata(&id)?)?);
        }
        Command::Check {
            lesson,
            step,
            matrix,
        } => {
            let lesson = Lesson::load(lesson)?;
            let id = lesson.step_id(&step)?;
            let candidate: Vec<Vec<f64>> =
                serde_json::from_str(&matrix).context("matrix must be a JSON list of rows")?;
            let validation = lesson.validate(&id, &candidate)?;
            println!("{}", serde_json::to_string_pretty(&validation)?);
        }
        Command::Replay { script } => {
            let loaded = load_script(&script)
                .with_context(|| format!("failed to load {}", script.display()))?;
            let lesson = Lesson::load(loaded.lesson)?;
            let mut session = Session::new(&lesson);
            for event in loaded.replay(&mut session)? {
                println!("{}", serde_json::to_string(&event)?);
            }
            let (done, total) = session.progress();
            println!("Progress: {}/{}", done, total);
        }
        Command::Solve { lesson } => {
            solve(&Lesson::load(lesson)?)?;
        }
    }

    Ok(())
}
