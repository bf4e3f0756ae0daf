use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;

use siteinfo::config::ExtractorConfig;
use siteinfo::errors::SiteInfoError;
use siteinfo::observability::{init_logging, LogFormat};
use siteinfo::request::InfoRequestSpec;
use siteinfo::response::Credential;
use siteinfo::SiteInfoExtractor;

#[derive(Parser)]
#[command(name = "siteinfo", about = "Extract business metadata from a website")]
struct Cli {
    /// Website to extract from
    #[arg(required_unless_present = "print_template")]
    url: Option<String>,

    /// How many link hops to follow from the url (0-2)
    #[arg(long, short, default_value_t = 0, env = "SITEINFO_DEPTH")]
    depth: u64,

    /// Info request as JSON, or @path to a JSON file. Defaults to every field
    #[arg(long, short)]
    request: Option<String>,

    /// Caller credential; enables email verification
    #[arg(long, env = "SITEINFO_CREDENTIAL", hide_env_values = true)]
    credential: Option<String>,

    /// Email verification endpoint
    #[arg(long, env = "SITEINFO_VERIFY_ENDPOINT")]
    verify_endpoint: Option<String>,

    /// Extractor configuration as a JSON file
    #[arg(long, env = "SITEINFO_CONFIG")]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print the info-request template and exit
    #[arg(long)]
    print_template: bool,
}

fn read_request(raw: Option<&str>) -> Result<Value> {
    let Some(raw) = raw else {
        return Ok(serde_json::to_value(InfoRequestSpec::template())?);
    };
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {path}"))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).context("Info request is not valid JSON")
}

fn load_config(cli: &Cli) -> Result<ExtractorConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ExtractorConfig::default(),
    };
    if let Some(endpoint) = &cli.verify_endpoint {
        config.verification = config.verification.with_endpoint(endpoint.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    });

    if cli.print_template {
        println!(
            "{}",
            serde_json::to_string_pretty(&InfoRequestSpec::template())?
        );
        return Ok(ExitCode::SUCCESS);
    }

    let config = load_config(&cli)?;
    let extractor = SiteInfoExtractor::http(config).context("Failed to build extractor")?;

    let body = json!({
        "web_url": cli.url,
        "max_search_depth": cli.depth,
        "info_request": read_request(cli.request.as_deref())?,
    });
    let credential = cli.credential.map(Credential::new);

    match extractor.extract_json(&body, credential.as_ref()).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(SiteInfoError::Validation(err)) => {
            eprintln!("{}", serde_json::to_string_pretty(&err.to_dict())?);
            Ok(ExitCode::from(2))
        }
        Err(err) => Err(err).context("Extraction failed"),
    }
}
