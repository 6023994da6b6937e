//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--project <dir>`: Project root (default: current directory)
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::types::{AssetPath, ManagedKind, ObjectId};

/// ef - object-graph staging and event templating for audio projects
#[derive(Parser, Debug)]
#[command(name = "ef")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project root directory (the one containing Metadata/)
    #[arg(long, global = true, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// A `--media <source>=<target>` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaArg {
    pub source: PathBuf,
    pub target: AssetPath,
}

impl std::str::FromStr for MediaArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, target) = s
            .rsplit_once('=')
            .ok_or_else(|| format!("expected <source>=<target>, got '{s}'"))?;
        if source.is_empty() {
            return Err(format!("missing media source in '{s}'"));
        }
        let target = AssetPath::new(target).map_err(|e| e.to_string())?;
        Ok(Self {
            source: PathBuf::from(source),
            target,
        })
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the project's serialization model, masters and object counts
    #[command(
        name = "info",
        long_about = "Show a summary of the project.\n\n\
            Prints the serialization model from Workspace.xml, the ids of the \
            master folders and the master bus, and how many objects of each \
            managed kind are committed. Operations that did not finish cleanly \
            are listed at the end."
    )]
    Info,

    /// Print folder, bank, bus and asset hierarchies
    #[command(
        name = "tree",
        after_help = "\
EXAMPLES:
    # Every hierarchy
    ef tree

    # Only buses
    ef tree --kind bus"
    )]
    Tree {
        /// Limit output to one kind (event-folder, asset-folder, bank, bus)
        #[arg(long)]
        kind: Option<ManagedKind>,
    },

    /// List the events in a folder and its subfolders
    #[command(name = "events")]
    Events {
        /// Event folder id
        folder: ObjectId,
    },

    /// Create a new event from a template event
    #[command(
        name = "instantiate",
        long_about = "Create a new event by copying a template event.\n\n\
            The template's whole subgraph is copied under fresh ids. The copy \
            is named, filed in the given folder, assigned to the given bank and \
            routed to the given bus. Each --media file is copied into the \
            project's asset tree and attached as a sound of a single multi \
            sound. Nothing is written if any input fails to resolve.",
        after_help = "\
EXAMPLES:
    # Copy a template with two sounds under Characters/Boss
    ef instantiate --template '{5e2a...}' --name Boss_Attack \\
        --folder '{...}' --bank '{...}' --bus '{...}' \\
        --media ./atk1.wav=Characters/Boss --media ./atk2.wav=Characters/Boss

    # Show what would be created without writing
    ef instantiate ... --dry-run"
    )]
    Instantiate {
        /// Template event id
        #[arg(long)]
        template: ObjectId,

        /// Name of the new event
        #[arg(long)]
        name: String,

        /// Event folder for the new event
        #[arg(long)]
        folder: ObjectId,

        /// Bank the new event is assigned to
        #[arg(long)]
        bank: ObjectId,

        /// Bus the new event routes to
        #[arg(long)]
        bus: ObjectId,

        /// Media file and target asset folder, as <source>=<target>
        #[arg(long = "media", value_name = "SOURCE=TARGET")]
        media: Vec<MediaArg>,

        /// Use this id for the new event instead of minting one
        #[arg(long)]
        event_id: Option<ObjectId>,

        /// Show what would be done without making changes
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply a batch plan of folders, banks, buses and events
    #[command(
        name = "apply",
        long_about = "Apply a TOML batch plan.\n\n\
            The plan's [[event_folder]], [[bank_folder]], [[bank]], [[bus]] and \
            [[asset_folder]] tables are staged and committed parents first. \
            Its [[event]] tables are then instantiated in order. A table's \
            `key` names the object inside the plan; any reference that is not \
            a plan key must be the id of an existing object.",
        after_help = "\
EXAMPLE PLAN:
    [[event_folder]]
    key = \"boss\"
    name = \"Boss\"

    [[bank]]
    key = \"boss_bank\"
    name = \"Boss\"

    [[asset_folder]]
    path = \"Characters/Boss\"

    [[event]]
    template = \"{5e2a...}\"
    name = \"Boss_Attack\"
    folder = \"boss\"
    bank = \"boss_bank\"
    bus = \"{...}\"
    media = [\"./atk1.wav=Characters/Boss\"]"
    )]
    Apply {
        /// Path to the plan file
        plan: PathBuf,

        /// Stage and report, then discard without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn media_arg_splits_on_last_equals() {
        let arg: MediaArg = "./a=b.wav=Sfx/Hits".parse().unwrap();
        assert_eq!(arg.source, PathBuf::from("./a=b.wav"));
        assert_eq!(arg.target.as_str(), "Sfx/Hits/");
    }

    #[test]
    fn media_arg_empty_target_is_root() {
        let arg: MediaArg = "hit.wav=".parse().unwrap();
        assert!(arg.target.is_root());
    }

    #[test]
    fn media_arg_rejects_bad_input() {
        assert!("hit.wav".parse::<MediaArg>().is_err());
        assert!("=Sfx".parse::<MediaArg>().is_err());
        assert!("hit.wav=../up".parse::<MediaArg>().is_err());
    }

    #[test]
    fn parses_instantiate() {
        let cli = Cli::try_parse_from([
            "ef",
            "--project",
            "/p",
            "instantiate",
            "--template",
            "T",
            "--name",
            "N",
            "--folder",
            "F",
            "--bank",
            "B",
            "--bus",
            "X",
            "--media",
            "a.wav=Sfx",
            "--media",
            "b.wav=Sfx",
        ])
        .unwrap();
        assert_eq!(cli.project, Some(PathBuf::from("/p")));
        match cli.command {
            Command::Instantiate { media, dry_run, .. } => {
                assert_eq!(media.len(), 2);
                assert!(!dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_tree_kind() {
        let cli = Cli::try_parse_from(["ef", "tree", "--kind", "asset-folder"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Tree {
                kind: Some(ManagedKind::AssetFolder)
            }
        ));
        assert!(Cli::try_parse_from(["ef", "tree", "--kind", "group"]).is_err());
    }
}
