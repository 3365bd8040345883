use std::{error::Error, io};

use error_set::error_set;
use lexopt::prelude::*;
use tracing::Level;

error_set! {
    ConfigError := {
        ArgumentError(Box<dyn Error + Send + Sync + 'static>),

        #[display("Missing argument: {name}")]
        ArgumentMissing { name: &'static str },
        #[display("Invalid log level: {level}")]
        InvalidLogLevel { level: String },
        IoError(io::Error),
    }
}

impl From<lexopt::Error> for ConfigError {
    fn from(error: lexopt::Error) -> Self {
        Self::ArgumentError(Box::new(error))
    }
}

#[derive(Debug)]
pub struct Settings {
    /// Statement to plan
    pub sql: String,
    /// Client bind arguments; `args[0]` is `$1`, `None` is SQL NULL
    pub args: Vec<Option<String>>,
    pub log_level: Level,
}

const NULL_ARG: &str = "NULL";

const USAGE: &str = "--sql SQL [--arg VALUE]... [--log_level LEVEL]\n\n\
    --sql SQL          statement to plan\n\
    --arg VALUE        bind argument for the next $N placeholder; NULL binds SQL NULL\n\
    --log_level LEVEL  trace, debug, info, warn or error (default info)";

impl Settings {
    pub fn from_args() -> Result<Settings, ConfigError> {
        Self::parse(lexopt::Parser::from_env())
    }

    fn parse(mut parser: lexopt::Parser) -> Result<Settings, ConfigError> {
        let mut sql: Option<String> = None;
        let mut args: Vec<Option<String>> = Vec::new();
        let mut log_level = Level::INFO;

        while let Some(arg) = parser.next()? {
            match arg {
                Long("sql") => sql = Some(parser.value()?.string()?),
                Long("arg") => {
                    let value = parser.value()?.string()?;
                    args.push((value != NULL_ARG).then_some(value));
                }
                Long("log_level") => {
                    let level = parser.value()?.string()?;
                    log_level = level
                        .parse()
                        .map_err(|_| ConfigError::InvalidLogLevel { level })?;
                }
                Long("help") => {
                    println!(
                        "Usage: {} {USAGE}",
                        parser.bin_name().unwrap_or_default()
                    );
                    std::process::exit(1);
                }
                _ => return Err(ConfigError::ArgumentError(Box::new(arg.unexpected()))),
            }
        }

        Ok(Settings {
            sql: sql.ok_or(ConfigError::ArgumentMissing { name: "sql" })?,
            args,
            log_level,
        })
    }
}
