//! Command line and environment configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;

use crate::error::ConfigError;
use crate::expander::{DEFAULT_SCRIPTURE_API, DEFAULT_TRANSLATION};
use crate::save_data::default_state_dir;
use crate::speech::Voice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Catechism {
    /// Children's Catechism flashcards
    Children,
    /// Westminster Shorter Catechism flashcards and study
    Shorter,
}

impl Catechism {
    pub fn title(self) -> &'static str {
        match self {
            Catechism::Children => "Children's Catechism",
            Catechism::Shorter => "Westminster Shorter Catechism",
        }
    }

    pub fn default_data_path(self) -> PathBuf {
        match self {
            Catechism::Children => PathBuf::from("data/children.json"),
            Catechism::Shorter => PathBuf::from("data/shorter.json"),
        }
    }

    pub fn voice(self) -> Voice {
        match self {
            Catechism::Children => Voice::CHILDREN,
            Catechism::Shorter => Voice::ADULT,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "catechism", version)]
#[command(about = "Catechism flashcard trainers for the terminal")]
pub struct Cli {
    /// Which catechism to study (asks when omitted)
    #[arg(value_enum)]
    pub catechism: Option<Catechism>,

    /// Question data file
    #[arg(long, env = "CATECHISM_DATA")]
    pub data: Option<PathBuf>,

    /// Directory for saved progress and the log file
    #[arg(long, env = "CATECHISM_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Scripture text service
    #[arg(long, env = "CATECHISM_SCRIPTURE_API", default_value = DEFAULT_SCRIPTURE_API)]
    pub scripture_api: String,

    /// Translation requested from the scripture service
    #[arg(long, default_value = DEFAULT_TRANSLATION)]
    pub translation: String,

    /// espeak-compatible program used to read cards aloud
    #[arg(long, env = "CATECHISM_TTS", default_value = "espeak")]
    pub tts_command: String,

    /// Disable speech entirely
    #[arg(long)]
    pub mute: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub catechism: Catechism,
    pub data_path: PathBuf,
    pub state_dir: PathBuf,
    pub scripture_api: String,
    pub translation: String,
    pub tts_command: String,
    pub mute: bool,
}

impl Config {
    /// Fill in defaults, prompting for the catechism when none was given.
    pub fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let catechism = match cli.catechism {
            Some(catechism) => catechism,
            None => pick_catechism()?,
        };
        Self::with_catechism(cli, catechism)
    }

    fn with_catechism(cli: Cli, catechism: Catechism) -> Result<Self, ConfigError> {
        let state_dir = match cli.state_dir {
            Some(dir) => dir,
            None => default_state_dir().ok_or(ConfigError::NoStateDir)?,
        };
        Ok(Self {
            catechism,
            data_path: cli.data.unwrap_or_else(|| catechism.default_data_path()),
            state_dir,
            scripture_api: cli.scripture_api,
            translation: cli.translation,
            tts_command: cli.tts_command,
            mute: cli.mute,
        })
    }
}

fn pick_catechism() -> Result<Catechism, ConfigError> {
    let choices = [Catechism::Children, Catechism::Shorter];
    let labels: Vec<&str> = choices.iter().map(|c| c.title()).collect();
    let picked = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which catechism?")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(choices[picked])
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, FromArgMatches};

    use super::*;

    /// Parse as if no `CATECHISM_*` variable were set.
    fn parse_without_env(args: &[&str]) -> Cli {
        let matches = Cli::command()
            .mut_args(|arg| arg.env(None::<&'static str>))
            .try_get_matches_from(args)
            .unwrap();
        Cli::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn explicit_arguments_win() {
        let cli = parse_without_env(&[
            "catechism",
            "shorter",
            "--data",
            "/tmp/wsc.json",
            "--state-dir",
            "/tmp/state",
            "--translation",
            "kjv",
            "--mute",
        ]);
        let config = Config::resolve(cli).unwrap();
        assert_eq!(config.catechism, Catechism::Shorter);
        assert_eq!(config.data_path, PathBuf::from("/tmp/wsc.json"));
        assert_eq!(config.state_dir, PathBuf::from("/tmp/state"));
        assert_eq!(config.translation, "kjv");
        assert!(config.mute);
    }

    #[test]
    fn data_path_defaults_per_catechism() {
        let cli = parse_without_env(&["catechism", "children", "--state-dir", "/tmp/state"]);
        let config = Config::resolve(cli).unwrap();
        assert_eq!(config.data_path, PathBuf::from("data/children.json"));
        assert_eq!(config.scripture_api, DEFAULT_SCRIPTURE_API);
        assert_eq!(config.tts_command, "espeak");
        assert_eq!(config.catechism.voice(), Voice::CHILDREN);
    }

    #[test]
    fn unknown_catechism_is_rejected() {
        assert!(Cli::try_parse_from(["catechism", "heidelberg"]).is_err());
    }
}
