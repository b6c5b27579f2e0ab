//! Command-line definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use memoria_core::{defaults, EmotionTag, MemoryType};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "memoria")]
#[command(author, version, about = "Encrypted personal memory journal")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Journal directory (overrides MEMORIA_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Master password used to unlock sealed entries for this command
    #[arg(short, long, global = true, env = "MEMORIA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the journal directory and report its state
    Init,

    /// Set the master password for a new journal
    SetPassword {
        /// The new master password
        new_password: String,
    },

    /// Check a password against the stored master password
    UnlockCheck {
        /// Password to check
        candidate: String,
    },

    /// Score a password (0-100)
    Strength {
        /// Password to score
        candidate: String,
    },

    /// Generate a random password
    GenPassword {
        /// Number of characters
        #[arg(short, long, default_value_t = defaults::GENERATED_PASSWORD_LENGTH)]
        length: usize,
    },

    /// Write a new entry
    Add {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        content: String,

        /// text, image, audio or mixed
        #[arg(long = "type", default_value = "text")]
        memory_type: MemoryType,

        /// Emotion tag (repeatable)
        #[arg(short, long = "emotion")]
        emotions: Vec<EmotionTag>,

        /// Free-form tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Seal the title and content under the master password
        #[arg(long)]
        encrypt: bool,
    },

    /// List every entry, newest first
    List,

    /// Show one entry
    Show { id: Uuid },

    /// Change an entry
    Edit {
        id: Uuid,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        content: Option<String>,

        #[arg(long = "type")]
        memory_type: Option<MemoryType>,

        /// Replace emotion tags (repeatable)
        #[arg(short, long = "emotion")]
        emotions: Vec<EmotionTag>,

        /// Replace free-form tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Seal (true) or unseal (false) the entry
        #[arg(long)]
        encrypt: Option<bool>,
    },

    /// Delete an entry and its attachments
    Delete { id: Uuid },

    /// Search entries
    Search {
        /// Case-insensitive text in title or content
        #[arg(short, long)]
        keyword: Option<String>,

        #[arg(long = "type")]
        memory_type: Option<MemoryType>,

        /// Match any of these emotion tags (repeatable)
        #[arg(short, long = "emotion")]
        emotions: Vec<EmotionTag>,

        /// Match any of these free-form tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// First day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day, inclusive (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Journal statistics
    Stats,

    /// Resurface a past entry (Dream Echo)
    Echo {
        /// Number of entries to recall in a row (at most 1000)
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Change the master password and re-encrypt everything sealed
    ChangePassword {
        /// Current master password
        #[arg(long)]
        old: String,

        /// New master password
        #[arg(long)]
        new: String,
    },

    /// Attach a file to an entry
    Attach {
        id: Uuid,

        /// File to attach
        file: PathBuf,

        /// MIME type (default: application/octet-stream)
        #[arg(long = "mime")]
        file_type: Option<String>,
    },

    /// Write an attachment's contents to a file
    Extract {
        id: Uuid,

        attachment: Uuid,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Remove an attachment from an entry
    Detach { id: Uuid, attachment: Uuid },

    /// Copy the sealed journal into an empty directory
    Backup { dest: PathBuf },
}

impl Commands {
    /// Whether the command takes the global password as the one to unlock with.
    pub fn unlocks_with_password(&self) -> bool {
        !matches!(
            self,
            Commands::Init
                | Commands::SetPassword { .. }
                | Commands::UnlockCheck { .. }
                | Commands::Strength { .. }
                | Commands::GenPassword { .. }
                | Commands::ChangePassword { .. }
        )
    }
}
