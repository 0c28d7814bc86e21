//! # golicense CLI entry point
//!
//! Reads the module listing of one or more Go binaries (the executables
//! themselves, or the text `go version -m` prints), resolves every
//! dependency's license and reports to the terminal plus any requested
//! report files.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use golicense::engine::DEFAULT_CONCURRENCY;
use golicense::finder::github::DEFAULT_API;
use golicense::finder::{FinderChain, GithubFinder, OverrideFinder};
use golicense::module::read_modules;
use golicense::report::{FileOutput, ReportFormat, TerminalOutput};
use golicense::translate::{GolangTranslator, GopkgTranslator, MapTranslator, TranslatorChain, VcsResolver};
use golicense::{Cancellation, Config, ModuleSet, MultiOutput, Output, Resolver};

const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
const ENV_LOG: &str = "GOLICENSE_LOG";

/// Analyze the licenses of the dependencies compiled into Go binaries.
///
/// Give one or more Go binaries or build-info listings (the output of
/// `go version -m`), or `-` for stdin. When more than one path is given, the first is the
/// configuration file (.toml or .json) with allow/deny rules, overrides and
/// translations.
#[derive(Parser, Debug)]
#[command(name = "golicense", version, about, long_about = None)]
struct Cli {
    /// [CONFIG] BINARY...
    #[arg(required = true, value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// List dependencies without looking up their licenses.
    #[arg(long)]
    no_license: bool,

    /// Plain terminal output: no colors or live updates.
    #[arg(long)]
    plain: bool,

    /// Print every status update (plain output only).
    #[arg(long)]
    verbose: bool,

    /// Maximum license lookups in flight.
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// GitHub API root URL.
    #[arg(long, default_value = DEFAULT_API)]
    github_api: String,

    /// Write a Markdown report to this path.
    #[arg(long, value_name = "PATH")]
    out_md: Option<PathBuf>,

    /// Write a JSON report to this path.
    #[arg(long, value_name = "PATH")]
    out_json: Option<PathBuf>,

    /// Write a CycloneDX SBOM to this path.
    #[arg(long, value_name = "PATH")]
    out_sbom: Option<PathBuf>,

    /// Write all license texts, concatenated, to this path.
    #[arg(long, value_name = "PATH")]
    out_license_file: Option<PathBuf>,

    /// Write an Excel workbook to this path.
    #[arg(long, value_name = "PATH")]
    out_xlsx: Option<PathBuf>,

    /// Write the report rendered through --template to this path.
    #[arg(long, value_name = "PATH", requires = "template")]
    out_template: Option<PathBuf>,

    /// Handlebars template used by --out-template.
    #[arg(long, value_name = "FILE", requires = "out_template")]
    template: Option<PathBuf>,
}

impl Cli {
    /// Config path, if any, and the build-info inputs.
    fn split_paths(&self) -> (Option<&Path>, &[PathBuf]) {
        match self.paths.as_slice() {
            [only] => (None, std::slice::from_ref(only)),
            [config, inputs @ ..] => (Some(config.as_path()), inputs),
            [] => (None, &[]),
        }
    }

    fn reports(&self) -> Vec<(PathBuf, ReportFormat)> {
        [
            (&self.out_md, ReportFormat::Markdown),
            (&self.out_json, ReportFormat::Json),
            (&self.out_sbom, ReportFormat::CycloneDxSbom),
            (&self.out_license_file, ReportFormat::LicenseText),
            (&self.out_xlsx, ReportFormat::Xlsx),
        ]
        .into_iter()
        .chain(
            self.template
                .clone()
                .map(|template| (&self.out_template, ReportFormat::Template(template))),
        )
        .filter_map(|(path, format)| path.clone().map(|p| (p, format)))
        .collect()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("❗️ Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    let (config_path, inputs) = cli.split_paths();

    let config = match config_path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("parsing configuration {}", path.display()))?,
        None => Config::default(),
    };
    let config = Arc::new(config);

    let mut modules = ModuleSet::new();
    for input in inputs {
        let raw = read_input(input)?;
        let parsed = read_modules(&raw).with_context(|| format!("reading dependencies of {}", input.display()))?;
        if parsed.is_empty() {
            bail!(
                "{} lists no module dependencies; the binary was built without Go modules or has none",
                input.display()
            );
        }
        modules.extend(parsed);
    }
    let modules = modules.into_sorted();
    tracing::info!("Resolving {} modules", modules.len());

    let cancel = Cancellation::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling outstanding lookups");
                cancel.cancel();
            }
        });
    }

    let terminal = Arc::new(TerminalOutput::stdout(Arc::clone(&config), &modules, cli.plain, cli.verbose));
    let mut output = MultiOutput::default();
    output.push(terminal.clone());
    for (path, format) in cli.reports() {
        output.push(Arc::new(FileOutput::new(path, format, Arc::clone(&config))));
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("golicense/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()
        .context("building HTTP client")?;

    let mut translators = TranslatorChain::default();
    translators.push(MapTranslator::new(&config.translate)?);
    translators.push(VcsResolver::new(client.clone()));
    translators.push(GolangTranslator);
    translators.push(GopkgTranslator);

    let mut finders = FinderChain::default();
    if !cli.no_license {
        finders.push(OverrideFinder::new(config.overrides.clone()));
        finders.push(
            GithubFinder::new(client, cancel.clone())
                .with_api(cli.github_api.as_str())
                .with_token(std::env::var(ENV_GITHUB_TOKEN).ok()),
        );
    }

    let resolver = Resolver::builder()
        .translators(translators)
        .finders(finders)
        .concurrency(cli.concurrency)
        .cancellation(cancel.clone())
        .build();

    let output: Arc<dyn Output> = Arc::new(output);
    resolver.run(modules, output).await.context("writing reports")?;

    if cancel.is_cancelled() {
        bail!("interrupted");
    }
    Ok(u8::try_from(terminal.exit_code()).unwrap_or(1))
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut raw = Vec::new();
        std::io::stdin()
            .read_to_end(&mut raw)
            .context("reading build info from stdin")?;
        return Ok(raw);
    }
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_single_path_is_build_info() {
        let cli = Cli::try_parse_from(["golicense", "deps.txt"]).unwrap();
        let (config, inputs) = cli.split_paths();
        assert!(config.is_none());
        assert_eq!(inputs, &[PathBuf::from("deps.txt")]);
        assert_eq!(cli.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(cli.github_api, DEFAULT_API);
    }

    #[test]
    fn cli_first_of_many_paths_is_config() {
        let cli = Cli::try_parse_from(["golicense", "config.toml", "a.txt", "b.txt"]).unwrap();
        let (config, inputs) = cli.split_paths();
        assert_eq!(config, Some(Path::new("config.toml")));
        assert_eq!(inputs.len(), 2);
    }

    #[test]
    fn cli_requires_a_path() {
        assert!(Cli::try_parse_from(["golicense"]).is_err());
    }

    #[test]
    fn cli_reports() {
        let cli = Cli::try_parse_from([
            "golicense",
            "--out-md",
            "licenses.md",
            "--out-sbom",
            "bom.json",
            "--no-license",
            "--concurrency",
            "2",
            "deps.txt",
        ])
        .unwrap();
        assert!(cli.no_license);
        assert_eq!(cli.concurrency, 2);
        assert_eq!(
            cli.reports(),
            vec![
                (PathBuf::from("licenses.md"), ReportFormat::Markdown),
                (PathBuf::from("bom.json"), ReportFormat::CycloneDxSbom),
            ]
        );
    }

    #[test]
    fn cli_spreadsheet_and_template_reports() {
        let cli = Cli::try_parse_from([
            "golicense",
            "--out-xlsx",
            "licenses.xlsx",
            "--out-template",
            "NOTICE",
            "--template",
            "notice.hbs",
            "deps.txt",
        ])
        .unwrap();
        assert_eq!(
            cli.reports(),
            vec![
                (PathBuf::from("licenses.xlsx"), ReportFormat::Xlsx),
                (PathBuf::from("NOTICE"), ReportFormat::Template(PathBuf::from("notice.hbs"))),
            ]
        );
    }

    #[test]
    fn cli_template_output_needs_a_template() {
        assert!(Cli::try_parse_from(["golicense", "--out-template", "NOTICE", "deps.txt"]).is_err());
        assert!(Cli::try_parse_from(["golicense", "--template", "notice.hbs", "deps.txt"]).is_err());
    }
}
