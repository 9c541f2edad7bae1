use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "plonk", version, about = "Manage packages and dotfiles declaratively")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Output format for structured commands
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the reconciliation state of packages and dotfiles
    Status {
        /// Show only packages
        #[arg(long)]
        packages: bool,
        /// Show only dotfiles
        #[arg(long)]
        dotfiles: bool,
        /// Show only untracked resources
        #[arg(long)]
        unmanaged: bool,
    },

    /// Install missing packages and deploy missing or drifted dotfiles
    Apply {
        /// Report what would change without changing anything
        #[arg(long, visible_alias = "dryrun")]
        dry_run: bool,
        /// Apply only the package domain
        #[arg(long, conflicts_with = "dotfiles")]
        packages: bool,
        /// Apply only the dotfile domain
        #[arg(long)]
        dotfiles: bool,
    },

    /// Install packages and record them in the lock file
    Install {
        /// Package specs: [manager:]name[@version]
        #[arg(required = true, value_name = "SPEC")]
        specs: Vec<String>,
        #[arg(long, visible_alias = "dryrun")]
        dry_run: bool,
    },

    /// Uninstall packages and drop them from the lock file
    Uninstall {
        #[arg(required = true, value_name = "SPEC")]
        specs: Vec<String>,
        #[arg(long, visible_alias = "dryrun")]
        dry_run: bool,
    },

    /// Upgrade managed packages (all of them when no spec is given)
    Upgrade {
        #[arg(value_name = "SPEC")]
        specs: Vec<String>,
    },

    /// Start managing dotfiles from $HOME
    Add {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<String>,
        /// Overwrite an already-managed source with the current
        /// destination content
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Stop managing dotfiles; deployed files are left in place
    Rm {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<String>,
    },

    /// Diff drifted dotfiles (destination against source)
    Diff {
        #[arg(value_name = "PATH")]
        path: Option<String>,
    },

    /// Search a package manager's repository
    Search {
        /// [manager:]query
        #[arg(value_name = "QUERY")]
        query: String,
    },

    /// Show detailed information about a package
    Info {
        #[arg(value_name = "SPEC")]
        spec: String,
    },

    /// Check the health of plonk's environment and package managers
    Doctor,

    /// List registered package managers and their availability
    Managers {
        /// Bootstrap a manager through its own installer
        #[arg(long, value_name = "MANAGER")]
        install: Option<String>,
    },
}
