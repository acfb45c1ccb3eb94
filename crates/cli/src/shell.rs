//! Interactive dashboard shell.

use std::time::Duration;

use {
    anyhow::Result,
    fimoney_client::{CapabilityState, Dashboard},
    fimoney_config::FiMoneyConfig,
    tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        task::JoinHandle,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

use crate::render;

const HELP: &str = "\
Commands:
  connect [url]        connect to a Fi Money server (default from config)
  disconnect           end the session
  status               ask the gateway whether the session is alive
  session              show the local session state
  tools                list tools offered by the server
  resources            list resources offered by the server
  call <tool> [json]   call a tool with a JSON object of arguments
  read <uri>           read a resource
  ask <question>       ask a free-text question
  suggest              show example questions
  help                 show this help
  quit                 leave the shell";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Connect(Option<&'a str>),
    Disconnect,
    Status,
    Session,
    Tools,
    Resources,
    Call { tool: &'a str, arguments: &'a str },
    Read(&'a str),
    Ask(&'a str),
    Suggest,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

fn parse(line: &str) -> Command<'_> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word {
        "" => Command::Empty,
        "connect" => Command::Connect(Some(rest).filter(|r| !r.is_empty())),
        "disconnect" => Command::Disconnect,
        "status" => Command::Status,
        "session" => Command::Session,
        "tools" => Command::Tools,
        "resources" => Command::Resources,
        "call" if rest.is_empty() => Command::Invalid("usage: call <tool> [json]".into()),
        "call" => {
            let (tool, arguments) = rest
                .split_once(char::is_whitespace)
                .unwrap_or((rest, ""));
            Command::Call { tool, arguments }
        },
        "read" if rest.is_empty() => Command::Invalid("usage: read <uri>".into()),
        "read" => Command::Read(rest),
        // blank questions go through so the coordinator reports them
        "ask" => Command::Ask(rest),
        "suggest" => Command::Suggest,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Invalid(format!("unknown command '{other}', try 'help'")),
    }
}

/// Run the shell until `quit` or end of input.
pub async fn run(dashboard: Dashboard, config: &FiMoneyConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    let poll = dashboard.start_status_poll(
        Duration::from_secs(config.session.status_poll_secs),
        cancel.clone(),
    );
    let watcher = spawn_session_watcher(&dashboard, cancel.clone());

    println!("Fi Money dashboard. Type 'help' for commands.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"fimoney> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if !execute(&dashboard, config, parse(&line)).await {
            break;
        }
    }

    cancel.cancel();
    if let Some(poll) = poll {
        reap("status poll", poll).await;
    }
    reap("session watcher", watcher).await;
    if dashboard.snapshot().is_connected()
        && let Err(e) = dashboard.disconnect().await
    {
        debug!(error = %e, "disconnect on exit failed");
    }
    dashboard.shutdown().await;
    info!("shell closed");
    Ok(())
}

/// Wait for a background task, logging a panic instead of propagating it.
async fn reap(task: &str, handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            debug!(task, error = %e, "background task ended abnormally");
            false
        },
    }
}

/// Report session changes the user did not cause, such as a lost session.
fn spawn_session_watcher(
    dashboard: &Dashboard,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut handle = dashboard.watch();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                session = handle.changed() => {
                    if session.last_error.as_deref() == Some(fimoney_client::session::SESSION_LOST) {
                        println!("\n{}", render::session(&session, None));
                    }
                },
            }
        }
    })
}

async fn session_line(dashboard: &Dashboard) -> String {
    let registry = dashboard.registry();
    let counts = match registry.state().await {
        CapabilityState::Fresh => Some((
            registry.get_tools().await.len(),
            registry.get_resources().await.len(),
        )),
        CapabilityState::Empty | CapabilityState::Stale(_) => None,
    };
    render::session(&dashboard.snapshot(), counts)
}

/// Returns `false` when the shell should exit.
async fn execute(dashboard: &Dashboard, config: &FiMoneyConfig, command: Command<'_>) -> bool {
    match command {
        Command::Empty => {},
        Command::Quit => return false,
        Command::Help => println!("{HELP}"),
        Command::Invalid(message) => println!("{message}"),
        Command::Connect(url) => {
            let url = url.unwrap_or(config.session.server_url.as_str());
            if let Err(e) = dashboard.connect(url).await {
                println!("connect failed: {e}");
            }
            println!("{}", session_line(dashboard).await);
        },
        Command::Disconnect => {
            if let Err(e) = dashboard.disconnect().await {
                println!("disconnect failed: {e}");
            }
            println!("{}", session_line(dashboard).await);
        },
        Command::Status => match dashboard.session().status().await {
            Ok(report) => println!("{}", render::status_report(&report)),
            Err(e) => println!("status failed: {e}"),
        },
        Command::Session => println!("{}", session_line(dashboard).await),
        Command::Tools => {
            let registry = dashboard.registry();
            println!(
                "{}",
                render::tools(&registry.get_tools().await, &registry.state().await)
            );
        },
        Command::Resources => {
            let registry = dashboard.registry();
            println!(
                "{}",
                render::resources(&registry.get_resources().await, &registry.state().await)
            );
        },
        Command::Call { tool, arguments } => {
            println!("{}", render::invocation(&dashboard.invoke(tool, arguments).await));
        },
        Command::Read(uri) => println!("{}", render::resource(&dashboard.read(uri).await)),
        Command::Ask(question) => println!("{}", render::query(&dashboard.ask(question).await)),
        Command::Suggest => println!("{}", render::suggestions(dashboard.queries().suggestions())),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_call_with_json_arguments() {
        assert_eq!(
            parse(r#"call fetch_net_worth {"currency": "INR"}"#),
            Command::Call {
                tool: "fetch_net_worth",
                arguments: r#"{"currency": "INR"}"#,
            }
        );
        assert_eq!(parse("call fetch_epf"), Command::Call {
            tool: "fetch_epf",
            arguments: "",
        });
    }

    #[test]
    fn connect_url_is_optional() {
        assert_eq!(parse("connect"), Command::Connect(None));
        assert_eq!(
            parse("  connect   http://localhost:3000 "),
            Command::Connect(Some("http://localhost:3000"))
        );
    }

    #[test]
    fn ask_keeps_the_whole_question() {
        assert_eq!(
            parse("ask List my bank transactions"),
            Command::Ask("List my bank transactions")
        );
        assert_eq!(parse("ask"), Command::Ask(""));
    }

    #[tokio::test]
    async fn panicked_task_is_reaped_without_propagating() {
        let finished = tokio::spawn(async {});
        assert!(reap("finished", finished).await);

        let panicked = tokio::spawn(async { panic!("poll blew up") });
        assert!(!reap("panicked", panicked).await);
    }

    #[test]
    fn missing_operands_and_unknown_words_are_invalid() {
        assert!(matches!(parse("call"), Command::Invalid(_)));
        assert!(matches!(parse("read"), Command::Invalid(_)));
        assert!(matches!(parse("networth"), Command::Invalid(_)));
        assert_eq!(parse("   "), Command::Empty);
        assert_eq!(parse("exit"), Command::Quit);
    }
}
