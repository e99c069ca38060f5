//! Command line arguments.

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::api::DEFAULT_URL;

const ABOUT: &str = "Visual data exploration.\n\nA command line interface for managing collections, datasets and imagesets.";

#[derive(Parser, Debug)]
#[command(name = "zeg", author, version, about = ABOUT, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a resource
    Create(ResourceArgs),
    /// Get a resource
    Get(ResourceArgs),
    /// Update a resource
    Update(ResourceArgs),
    /// Delete a resource
    Delete(ResourceArgs),
    /// Publish a resource
    Publish(ResourceArgs),
    /// Authenticate against the API and store a long lived token
    Login(StandardArgs),
}

impl Command {
    pub fn standard(&self) -> &StandardArgs {
        match self {
            Command::Login(standard) => standard,
            Command::Create(args)
            | Command::Get(args)
            | Command::Update(args)
            | Command::Delete(args)
            | Command::Publish(args) => &args.standard,
        }
    }

    /// The action and its arguments, for everything but `login`.
    pub fn resource_action(&self) -> Option<(Action, &ResourceArgs)> {
        match self {
            Command::Create(args) => Some((Action::Create, args)),
            Command::Get(args) => Some((Action::Get, args)),
            Command::Update(args) => Some((Action::Update, args)),
            Command::Delete(args) => Some((Action::Delete, args)),
            Command::Publish(args) => Some((Action::Publish, args)),
            Command::Login(_) => None,
        }
    }
}

/// Flags shared by every command.
#[derive(Args, Debug, Clone)]
pub struct StandardArgs {
    /// Authentication token.
    #[arg(short, long, env = "ZEG_TOKEN")]
    pub token: Option<String>,

    /// Server address.
    #[arg(short, long, env = "ZEG_URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ResourceArgs {
    /// The name of the resource type.
    #[arg(value_enum)]
    pub resource: Resource,

    /// Resource identifier.
    pub id: Option<String>,

    /// Path to command configuration yaml.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// The id of the project.
    #[arg(short, long)]
    pub project: Option<String>,

    #[command(flatten)]
    pub standard: StandardArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Get,
    Update,
    Delete,
    Publish,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Create => "create",
            Action::Get => "get",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Publish => "publish",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum Resource {
    #[value(alias = "collection")]
    Collections,
    #[value(alias = "datasets")]
    Dataset,
    #[value(alias = "imagesets")]
    Imageset,
    #[value(alias = "project")]
    Projects,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => write!(f, "{:?}", self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resource_command() {
        let cli = Cli::try_parse_from([
            "zeg", "update", "imageset", "ims1", "-c", "job.yaml", "-p", "proj", "-v",
        ])
        .unwrap();
        let (action, args) = cli.command.resource_action().unwrap();
        assert_eq!(action, Action::Update);
        assert_eq!(args.resource, Resource::Imageset);
        assert_eq!(args.id.as_deref(), Some("ims1"));
        assert_eq!(args.config, Some(PathBuf::from("job.yaml")));
        assert_eq!(args.project.as_deref(), Some("proj"));
        assert!(args.standard.verbose);
    }

    #[test]
    fn login_takes_standard_flags() {
        let cli = Cli::try_parse_from(["zeg", "login", "-u", "https://example.com"]).unwrap();
        assert!(cli.command.resource_action().is_none());
        assert_eq!(cli.command.standard().url, "https://example.com");
    }

    #[test]
    fn singular_alias_is_accepted() {
        let cli = Cli::try_parse_from(["zeg", "publish", "collection", "c1"]).unwrap();
        let (_, args) = cli.command.resource_action().unwrap();
        assert_eq!(args.resource, Resource::Collections);
        assert_eq!(args.resource.to_string(), "collections");
    }

    #[test]
    fn unknown_resource_is_rejected() {
        assert!(Cli::try_parse_from(["zeg", "get", "widgets"]).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
