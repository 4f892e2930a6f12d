#![allow(missing_docs)]
use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use mirthbridge_core::config::OPENAPI_PATH_VAR;
use mirthbridge_core::tools::{LIST_ACTIONS_TOOL, LIST_DOMAINS_TOOL};
use mirthbridge_core::{
    ApiClientBuilder, BridgeConfig, Dispatcher, OpenApiRegistry, ToolHost, TracingProgress,
};

const HELP: &str = "\
mirthbridge: call the NextGen Connect REST API through its OpenAPI document

USAGE:
  mirthbridge [--openapi <path>] <COMMAND>

COMMANDS:
  domains                    List the API domains
  actions <domain>           List the actions of a domain
  call <domain> <json-args>  Dispatch one action, e.g.
                             call channels '{\"action\":\"getChannels\"}'
  tools                      Describe the tools offered to an agent runtime

OPTIONS:
  --openapi <path>  OpenAPI document, overrides MIRTH_OPENAPI_PATH
  -h, --help        Print this help

The connection is configured through MIRTH_BASE_URL, MIRTH_USERNAME,
MIRTH_PASSWORD, MIRTH_VERIFY_SSL and MIRTH_TIMEOUT_SECONDS.
";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let Some(AppArgs { openapi, command }) = AppArgs::parse().context("parsing arguments")?
    else {
        print_help()?;
        return Ok(());
    };

    let config = BridgeConfig::from_lookup(|name| {
        if name == OPENAPI_PATH_VAR && openapi.is_some() {
            return openapi.clone();
        }
        env::var(name).ok()
    })
    .context("reading configuration")?;
    info!(
        base_url = %config.base_url,
        transport = %config.transport,
        openapi = %config.openapi_path.display(),
        "configuration loaded"
    );

    let registry =
        OpenApiRegistry::load(&config.openapi_path).context("loading OpenAPI document")?;
    let client = ApiClientBuilder::from_config(&config)
        .build()
        .context("building HTTP client")?;
    let host = ToolHost::new(Dispatcher::new(Arc::new(registry), client));

    let output = match command {
        Command::Domains => host.call(LIST_DOMAINS_TOOL, json!({})).await?,
        Command::Actions { domain } => {
            host.call(LIST_ACTIONS_TOOL, json!({ "domain": domain }))
                .await?
        }
        Command::Call { domain, arguments } => {
            let arguments: Value =
                serde_json::from_str(&arguments).context("parsing tool arguments as JSON")?;
            let envelope = host
                .call_domain_tool_with_progress(&domain, arguments, &TracingProgress)
                .await?;
            debug!(status = envelope.status, "dispatch finished");
            serde_json::to_value(envelope).context("serializing envelope")?
        }
        Command::Tools => serde_json::to_value(host.descriptors()).context("serializing tools")?,
    };

    print_json(&output)
}

#[derive(Debug)]
enum Command {
    Domains,
    Actions { domain: String },
    Call { domain: String, arguments: String },
    Tools,
}

#[derive(Debug)]
struct AppArgs {
    openapi: Option<String>,
    command: Command,
}

impl AppArgs {
    fn parse() -> Result<Option<Self>> {
        let mut pargs = pico_args::Arguments::from_env();

        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let openapi = pargs
            .opt_value_from_str("--openapi")
            .context("parsing openapi argument")?;

        let Some(command) = pargs.subcommand().context("parsing command")? else {
            return Ok(None);
        };

        let command = match command.as_str() {
            "domains" => Command::Domains,
            "actions" => Command::Actions {
                domain: pargs.free_from_str().context("missing <domain>")?,
            },
            "call" => Command::Call {
                domain: pargs.free_from_str().context("missing <domain>")?,
                arguments: pargs.free_from_str().context("missing <json-args>")?,
            },
            "tools" => Command::Tools,
            other => bail!("unknown command '{other}', see --help"),
        };

        let remaining: Vec<OsString> = pargs.finish();
        if !remaining.is_empty() {
            warn!(?remaining, "Warning: unused arguments left");
        }
        Ok(Some(Self { openapi, command }))
    }
}

fn print_help() -> Result<()> {
    io::stdout()
        .write_all(HELP.as_bytes())
        .context("writing help")
}

fn print_json(value: &Value) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("writing output")?;
    writeln!(stdout).context("writing output")
}
