//! CLI module - Command-line interface for Shiori
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

use crate::constants::limits::DEFAULT_HISTORY_LIMIT;
use crate::domain::AnimeId;

/// Shiori - Anime watch tracker
/// Detects what you watch and keeps your list up to date
#[derive(Parser)]
#[command(name = "shiori")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the detection pipeline, player watcher and loopback server
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Parse a filename or window title into title and episode
    #[command(alias = "p")]
    Parse {
        /// Raw title
        #[arg(required = true)]
        raw: Vec<String>,
    },

    /// Show the season number a title refers to
    Season {
        /// Title to inspect
        #[arg(required = true)]
        title: Vec<String>,
    },

    /// Show the franchise timeline containing an anime
    #[command(alias = "t")]
    Timeline {
        /// `AniList` media ID
        id: AnimeId,
    },

    /// Map an absolute episode number onto a season of the franchise
    Resolve {
        /// `AniList` media ID of any season in the franchise
        id: AnimeId,
        /// Absolute (franchise-global) episode number
        absolute: u32,
    },

    /// List library entries
    #[command(alias = "ls", alias = "l")]
    List,

    /// Add an anime to the library
    #[command(alias = "a")]
    Add {
        /// `AniList` media ID
        id: AnimeId,
        /// Initial status
        #[arg(long, default_value = "plan-to-watch")]
        status: String,
    },

    /// Remove an anime from the library (watch history is kept)
    #[command(alias = "rm", alias = "r")]
    Remove {
        /// `AniList` media ID
        id: AnimeId,
    },

    /// Set progress, may move backwards
    Progress {
        /// `AniList` media ID
        id: AnimeId,
        /// Last watched episode
        episode: u32,
    },

    /// Set the watch status of an entry
    Status {
        /// `AniList` media ID
        id: AnimeId,
        /// watching, plan-to-watch, completed, on-hold or dropped
        status: String,
    },

    /// Map a detected title to an anime
    Map {
        /// Title as detected
        raw_title: String,
        /// `AniList` media ID
        id: AnimeId,
    },

    /// Remove a title mapping
    Unmap {
        /// Title as detected
        #[arg(required = true)]
        raw_title: Vec<String>,
    },

    /// List title mappings
    Mappings,

    /// Show recent watch history
    #[command(alias = "h")]
    History {
        /// Number of entries to show
        #[arg(default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: u64,
    },

    /// Merge a user's remote list into the library
    Import {
        /// `AniList` user name; defaults to the owner of the access token
        user: Option<String>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
