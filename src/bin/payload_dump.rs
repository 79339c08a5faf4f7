use anyhow::{Context, Result, bail, format_err};
use clap::{Arg, ArgAction, ArgMatches, Command};
use dialoguer::Confirm;
use indoc::indoc;
use log::{LevelFilter, info};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use ota_payload::{ParsedPayload, ParserSettings, PayloadParser};

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PayloadOutputFormat {
    Json,
    JsonLines,
    Header,
    Stats,
}

struct PayloadDump {
    parser_settings: ParserSettings,
    input: PathBuf,
    output_format: PayloadOutputFormat,
    output: Box<dyn Write>,
    verbosity_level: Option<LevelFilter>,
}

impl PayloadDump {
    pub fn from_cli_matches(matches: &ArgMatches) -> Result<Self> {
        let input = PathBuf::from(
            matches
                .get_one::<String>("INPUT")
                .expect("This is a required argument"),
        );

        let output_format = match matches
            .get_one::<String>("output-format")
            .map(String::as_str)
            .unwrap_or("json")
        {
            "jsonl" => PayloadOutputFormat::JsonLines,
            "header" => PayloadOutputFormat::Header,
            "stats" => PayloadOutputFormat::Stats,
            _ => PayloadOutputFormat::Json,
        };

        let verbosity_level = match matches.get_count("verbose") {
            0 => None,
            1 => Some(LevelFilter::Info),
            2 => Some(LevelFilter::Debug),
            3 => Some(LevelFilter::Trace),
            _ => {
                eprintln!("using more than -vvv does not affect verbosity level");
                Some(LevelFilter::Trace)
            }
        };

        let output: Box<dyn Write> = match matches.get_one::<String>("output-target") {
            Some(path) => Box::new(Self::create_output_file(
                Path::new(path),
                !matches.get_flag("no-confirm-overwrite"),
            )?),
            None => Box::new(io::stdout()),
        };

        let parser_settings = ParserSettings::new()
            .allow_unsupported_versions(matches.get_flag("allow-unsupported-versions"))
            .decode_metadata_signature(!matches.get_flag("skip-signature-decode"));

        Ok(PayloadDump {
            parser_settings,
            input,
            output_format,
            output,
            verbosity_level,
        })
    }

    pub fn run(&mut self) -> Result<()> {
        self.try_to_initialize_logging();

        let data = self.read_input()?;
        info!("read {} bytes from {}", data.len(), self.input.display());

        let payload = PayloadParser::from_buffer(&data)
            .with_configuration(self.parser_settings.clone())
            .parse()
            .with_context(|| format!("Failed to parse payload at {}", self.input.display()))?;

        self.dump_payload(&payload)?;
        self.output.flush()?;

        Ok(())
    }

    fn read_input(&self) -> Result<Vec<u8>> {
        if self.input.as_os_str() == "-" {
            let mut data = vec![];
            io::stdin()
                .lock()
                .read_to_end(&mut data)
                .context("Failed to read payload from stdin")?;
            return Ok(data);
        }

        fs::read(&self.input)
            .with_context(|| format!("Failed to read payload at {}", self.input.display()))
    }

    fn dump_payload(&mut self, payload: &ParsedPayload) -> Result<()> {
        match self.output_format {
            PayloadOutputFormat::Json => {
                serde_json::to_writer_pretty(&mut self.output, payload)?;
                writeln!(self.output)?;
            }
            PayloadOutputFormat::JsonLines => {
                serde_json::to_writer(&mut self.output, payload)?;
                writeln!(self.output)?;
            }
            PayloadOutputFormat::Header => {
                serde_json::to_writer_pretty(&mut self.output, &payload.header)?;
                writeln!(self.output)?;
            }
            PayloadOutputFormat::Stats => {
                let stats = payload.statistics();
                write!(self.output, "{stats}")?;
                writeln!(
                    self.output,
                    "Total : {} Operations, {} Blocks",
                    stats.total_operations, stats.total_blocks
                )?;
            }
        }

        Ok(())
    }

    /// If `prompt` is passed, will display a confirmation prompt before overwriting files.
    fn create_output_file(path: impl AsRef<Path>, prompt: bool) -> Result<File> {
        let p = path.as_ref();

        if p.is_dir() {
            bail!(
                "There is a directory at {}, refusing to overwrite",
                p.display()
            );
        }

        if p.exists() {
            if prompt {
                match Confirm::new()
                    .with_prompt(format!(
                        "Are you sure you want to override output file at {}",
                        p.display()
                    ))
                    .default(false)
                    .interact()
                {
                    Ok(true) => Ok(File::create(p)?),
                    Ok(false) => bail!("Cancelled"),
                    Err(e) => Err(format_err!(e).context("Failed to write confirmation prompt")),
                }
            } else {
                Ok(File::create(p)?)
            }
        } else {
            // Ok to assume p is not an existing directory
            match p.parent() {
                Some(parent) => {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        fs::create_dir_all(parent)?;
                    }
                    Ok(File::create(p)?)
                }
                None => bail!("Output file cannot be root."),
            }
        }
    }

    fn try_to_initialize_logging(&self) {
        if let Some(level) = self.verbosity_level {
            if let Err(e) = TermLogger::init(
                level,
                Config::default(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ) {
                eprintln!("Failed to initialize logging: {e:?}");
            }
        }
    }
}

fn cli() -> Command {
    Command::new("payload_dump")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Utility to parse Android OTA payload.bin files")
        .arg(
            Arg::new("INPUT")
                .required(true)
                .help("Path to a payload.bin file, or `-` to read it from stdin"),
        )
        .arg(
            Arg::new("output-format")
                .short('o')
                .long("output-format")
                .value_parser(["json", "jsonl", "header", "stats"])
                .default_value("json")
                .help("Sets the output format")
                .long_help(indoc!(
                    r#"Sets the output format:
                        "json"   - pretty prints the header, manifest and metadata signature.
                        "jsonl"  - same as json, on a single line.
                        "header" - prints only the fixed size container header.
                        "stats"  - prints the number of blocks written by each operation type.
                    "#
                )),
        )
        .arg(
            Arg::new("output-target")
                .long("output")
                .short('f')
                .action(ArgAction::Set)
                .help(indoc!(
                    "Writes output to the file specified instead of stdout, errors will still be printed to stderr.
                     Will ask for confirmation before overwriting files, to allow overwriting, pass `--no-confirm-overwrite`
                     Will create parent directories if needed."
                )),
        )
        .arg(
            Arg::new("no-confirm-overwrite")
                .long("no-confirm-overwrite")
                .action(ArgAction::SetTrue)
                .help("When set, will not ask for confirmation before overwriting files, useful for automation"),
        )
        .arg(
            Arg::new("allow-unsupported-versions")
                .long("allow-unsupported-versions")
                .action(ArgAction::SetTrue)
                .help("Parse payloads with a major version other than 1 or 2 using the version 1 layout"),
        )
        .arg(
            Arg::new("skip-signature-decode")
                .long("skip-signature-decode")
                .action(ArgAction::SetTrue)
                .help("Bounds check the metadata signature block without decoding it"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help(indoc!(
                    "Sets debug prints level for the application:
                        -v   - info
                        -vv  - debug
                        -vvv - trace
                    NOTE: trace output is only available in debug builds, as it is extremely verbose."
                )),
        )
}

fn main() {
    let matches = cli().get_matches();

    let result = PayloadDump::from_cli_matches(&matches).and_then(|mut dump| dump.run());

    if let Err(e) = result {
        eprintln!("{e:?}");
        exit(1);
    }
}
