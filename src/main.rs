//! Command-line front end for the documentation explorer core.
//! Talks to the backend configured in `{config_dir}/doclens/config.json`
//! (or `DOCLENS_BASE_URL`) and prints results as JSON on stdout.
use anyhow::{anyhow, bail, Context};
use serde_json::{json, Value};

use doclens_lib::{logging, CapabilityStatus, Explorer, ExplorerConfig, Resolution};

const USAGE: &str = "\
usage: doclens <command> [args]

commands:
  groups                 list documentation groups
  resolve <group> [file] resolve a group (and file) with its business-flow tags
  refresh                reload the hierarchy and select the first group
  rescan                 ask the backend to rescan its sources, then refresh
  plugins                list installed plugins
  check <plugin>         poll until the plugin is registered and running
  verify <plugin>        probe the plugin once
  start <plugin>         start the plugin and wait for it to become ready
  stop <plugin>          stop the plugin and re-verify its status
  config                 print the effective configuration";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Groups,
    Resolve { group: String, file: Option<String> },
    Refresh,
    Rescan,
    Plugins,
    Check(String),
    Verify(String),
    Start(String),
    Stop(String),
    Config,
    Help,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut it = args.iter().map(String::as_str);
        let name = it.next().unwrap_or("help");
        let rest: Vec<&str> = it.collect();

        let plugin_id = |rest: &[&str]| match rest {
            [id] => Ok(id.to_string()),
            _ => Err(format!("'{name}' takes exactly one plugin id")),
        };
        let no_args = |cmd: Command| {
            if rest.is_empty() {
                Ok(cmd)
            } else {
                Err(format!("'{name}' takes no arguments"))
            }
        };

        match name {
            "groups" => no_args(Command::Groups),
            "refresh" => no_args(Command::Refresh),
            "rescan" => no_args(Command::Rescan),
            "plugins" => no_args(Command::Plugins),
            "config" => no_args(Command::Config),
            "help" | "-h" | "--help" => Ok(Command::Help),
            "resolve" => match rest.as_slice() {
                [group] => Ok(Command::Resolve {
                    group: group.to_string(),
                    file: None,
                }),
                [group, file] => Ok(Command::Resolve {
                    group: group.to_string(),
                    file: Some(file.to_string()),
                }),
                _ => Err("'resolve' takes <group> [file]".into()),
            },
            "check" => plugin_id(&rest).map(Command::Check),
            "verify" => plugin_id(&rest).map(Command::Verify),
            "start" => plugin_id(&rest).map(Command::Start),
            "stop" => plugin_id(&rest).map(Command::Stop),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

/// Plugin status line; `settled` is false while a check is still running.
fn status_json(id: &str, status: CapabilityStatus) -> Value {
    json!({ "id": id, "status": status, "settled": status.is_terminal() })
}

/// Selection as JSON, or `null` when the hierarchy is empty.
fn selection_json(resolution: Resolution) -> anyhow::Result<Value> {
    match resolution {
        Resolution::Applied(selection) => Ok(serde_json::to_value(selection)?),
        Resolution::Empty => Ok(Value::Null),
        Resolution::Superseded => bail!("navigation was superseded by a newer request"),
        Resolution::Failed(message) => Err(anyhow!(message)),
    }
}

async fn run(explorer: &Explorer, command: Command) -> anyhow::Result<Value> {
    let nav = &explorer.navigation;
    let output = match command {
        Command::Groups => json!(explorer.docs.list_groups().await?),
        Command::Resolve { group, file } => selection_json(nav.resolve(&group, file.as_deref()).await)?,
        Command::Refresh => selection_json(nav.reload().await)?,
        Command::Rescan => selection_json(nav.rescan().await)?,
        Command::Plugins => json!(explorer.plugins.list_plugins().await),
        Command::Check(id) => {
            explorer.poller.check_ready(&id).await;
            status_json(&id, explorer.store.get_status(&id))
        }
        Command::Verify(id) => status_json(&id, explorer.poller.verify(&id).await),
        Command::Start(id) => {
            explorer.plugins.start(&id).await.map_err(|e| anyhow!(e))?;
            status_json(&id, explorer.store.get_status(&id))
        }
        Command::Stop(id) => {
            let status = explorer.plugins.stop(&id).await.map_err(|e| anyhow!(e))?;
            status_json(&id, status)
        }
        Command::Config => serde_json::to_value(&explorer.config)?,
        Command::Help => Value::String(USAGE.to_string()),
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(Command::Help) => {
            println!("{USAGE}");
            return Ok(());
        }
        Ok(c) => c,
        Err(e) => {
            eprintln!("doclens: {e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = ExplorerConfig::load();
    logging::init(config.log_filter.as_deref());

    let explorer = Explorer::new(config).context("invalid backend configuration")?;
    let output = run(&explorer, command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
