//! Thrust CLI
//!
//! Builds, packages and spec-tests an iOS project described by `thrust.yml`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use thrust::commands::xcode::{DEVICE_PLATFORM, SIMULATOR_PLATFORM};
use thrust::{
    BuildRequest, Configuration, Orchestrator, Overrides, RawConfig, Release, Result, SpecRun,
    Validate, DEFAULT_CONFIG_FILE,
};

#[derive(Parser, Debug)]
#[command(name = "thrust")]
#[command(about = "Build, package and spec-test iOS projects", long_about = None)]
#[command(version)]
struct Cli {
    /// Project root containing the Xcode project
    #[arg(long, global = true, default_value = ".")]
    project_root: PathBuf,

    /// Configuration file (defaults to <project-root>/thrust.yml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Release granularity accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReleaseArg {
    /// Increment major, reset minor and patch
    Major,
    /// Increment minor, reset patch
    Minor,
    /// Increment patch
    Patch,
    /// Reapply the current version unchanged
    Clear,
}

impl From<ReleaseArg> for Release {
    fn from(arg: ReleaseArg) -> Self {
        match arg {
            ReleaseArg::Major => Release::Major,
            ReleaseArg::Minor => Release::Minor,
            ReleaseArg::Patch => Release::Patch,
            ReleaseArg::Clear => Release::Clear,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clean build products
    Clean {
        #[arg(short, long, default_value = "Debug")]
        configuration: String,

        /// Target, or scheme in workspace mode (all targets when omitted)
        #[arg(short, long)]
        target: Option<String>,

        #[arg(long)]
        sdk: Option<String>,
    },

    /// Clean and build
    Build {
        #[arg(short, long, default_value = "Debug")]
        configuration: String,

        /// Target, or scheme in workspace mode (all targets when omitted)
        #[arg(short, long)]
        target: Option<String>,

        #[arg(long)]
        sdk: Option<String>,
    },

    /// Sign and package the device build into an .ipa
    Package {
        #[arg(short, long, default_value = "Release")]
        configuration: String,

        /// Build for the device before packaging
        #[arg(long)]
        build: bool,
    },

    /// Run a spec bundle in the simulator
    Specs {
        /// Spec target listed in spec_targets
        target: String,

        #[arg(short, long, default_value = "Debug")]
        configuration: String,

        /// Simulator SDK version
        #[arg(long)]
        sdk: String,

        /// Build the spec target for the simulator first
        #[arg(long)]
        build: bool,

        /// Print the result as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// List the project's build configurations
    Configurations {
        /// Print the list as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Bump the version, commit and push
    Bump {
        #[arg(value_enum)]
        release: ReleaseArg,
    },

    /// Print the marketing version, or set it when a version is given
    MarketingVersion { version: Option<String> },

    /// Force-kill the simulator and debugger processes
    KillSimulator,

    /// Remove the simulator's installed apps and settings
    ResetSimulator {
        #[arg(long, env = "HOME")]
        home: PathBuf,
    },

    /// Print the active Xcode developer directory
    DeveloperDir,

    /// Validate the configuration and print any issues
    Check,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn config_path(cli: &Cli) -> PathBuf {
    cli.config
        .clone()
        .unwrap_or_else(|| cli.project_root.join(DEFAULT_CONFIG_FILE))
}

fn load(cli: &Cli) -> Result<Configuration> {
    Configuration::from_file(&cli.project_root, config_path(cli), Overrides::from_env())
}

/// Runs the selected command. `Ok(false)` means the command ran but failed.
fn run(cli: Cli) -> Result<bool> {
    let orchestrator = match cli.command {
        Commands::Check => return check(&cli),
        _ => Orchestrator::new(load(&cli)?),
    };

    match &cli.command {
        Commands::Clean {
            configuration,
            target,
            sdk,
        } => {
            orchestrator.clean(&request(configuration, target.as_deref(), sdk.as_deref()))?;
        }
        Commands::Build {
            configuration,
            target,
            sdk,
        } => {
            orchestrator.build(&request(configuration, target.as_deref(), sdk.as_deref()))?;
        }
        Commands::Package {
            configuration,
            build,
        } => {
            if *build {
                orchestrator.build(&BuildRequest::new(configuration).with_sdk(DEVICE_PLATFORM))?;
            }
            orchestrator.package(configuration)?;
        }
        Commands::Specs {
            target,
            configuration,
            sdk,
            build,
            json,
        } => {
            if *build {
                let request = BuildRequest::new(configuration)
                    .with_target(target)
                    .with_sdk(SIMULATOR_PLATFORM);
                orchestrator.build(&request)?;
            }

            let result = orchestrator.run_specs(&SpecRun {
                target,
                configuration,
                sdk,
            })?;

            if *json {
                println!("{}", to_json(&result)?);
            } else if let Some(path) = result.artifact_path() {
                eprintln!("Spec output: {}", path.display());
            }
            if !result.is_success() {
                eprintln!("Specs failed for {}", target);
                return Ok(false);
            }
        }
        Commands::Configurations { json } => {
            let configurations = orchestrator.build_configurations()?;
            if *json {
                println!("{}", to_json(&configurations)?);
            } else {
                for configuration in configurations {
                    println!("{}", configuration);
                }
            }
        }
        Commands::Bump { release } => {
            let version = orchestrator.bump_version((*release).into())?;
            println!("{}", version);
        }
        Commands::MarketingVersion { version } => match version {
            Some(version) => {
                orchestrator.set_marketing_version(version)?;
                println!("{}", version.trim());
            }
            None => println!("{}", orchestrator.marketing_version()?),
        },
        Commands::KillSimulator => orchestrator.kill_simulator()?,
        Commands::ResetSimulator { home } => {
            if !orchestrator.reset_simulator(home)? {
                tracing::info!("no simulator data to remove");
            }
        }
        Commands::DeveloperDir => println!("{}", orchestrator.developer_dir()?),
        // Runs without an orchestrator, see above.
        Commands::Check => {}
    }

    Ok(true)
}

fn request<'a>(
    configuration: &'a str,
    target: Option<&'a str>,
    sdk: Option<&'a str>,
) -> BuildRequest<'a> {
    BuildRequest {
        configuration,
        sdk,
        target,
    }
}

/// Prints every validation issue. Load failures are reported as errors.
fn check(cli: &Cli) -> Result<bool> {
    let path = config_path(cli);
    let raw = RawConfig::read(&path)?;

    let config = match Configuration::load(&cli.project_root, raw, Overrides::from_env()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(false);
        }
    };

    let result = config.validate();
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }
    for error in &result.errors {
        eprintln!("error: {}", error);
    }
    if result.warnings.is_empty() && result.errors.is_empty() {
        println!("{} is valid", path.display());
    }
    Ok(result.is_valid())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| thrust::Error::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_args_map_to_library_granularity() {
        assert_eq!(Release::from(ReleaseArg::Major), Release::Major);
        assert_eq!(Release::from(ReleaseArg::Minor), Release::Minor);
        assert_eq!(Release::from(ReleaseArg::Patch), Release::Patch);
        assert_eq!(Release::from(ReleaseArg::Clear), Release::Clear);
    }

    #[test]
    fn bump_parses_lowercase_granularity() {
        let cli = Cli::try_parse_from(["thrust", "bump", "minor"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Bump {
                release: ReleaseArg::Minor
            }
        ));
        assert!(Cli::try_parse_from(["thrust", "bump", "huge"]).is_err());
    }
}
