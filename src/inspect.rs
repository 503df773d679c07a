//! One-shot inspection: launch a program under an adapter, stop on
//! entry and render the variables, watch and hover trees.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::process::Child;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use vartree_config::Config;
use vartree_dap::{DapClient, Event, LaunchRequestArguments};
use vartree_tree::{ExpressionTree, TreeOptions};

use crate::cli::CliArgs;
use crate::render::render_tree;

/// How long to wait for the adapter process to exit after disconnect.
const ADAPTER_EXIT_GRACE: Duration = Duration::from_secs(2);

/// What to render once the debuggee has stopped.
#[derive(Debug, Clone, Default)]
pub struct InspectRequest {
    /// Levels shown below each root.
    pub depth: usize,
    /// Watch expressions, in order.
    pub watches: Vec<String>,
    /// Hover expression.
    pub hover: Option<String>,
    /// Arguments for the `launch` request.
    pub launch: LaunchRequestArguments,
}

/// Drive a connected adapter through launch, render the trees of the
/// top stack frame and disconnect.
///
/// `timeout` bounds every wait for an adapter event.
pub async fn run_session(
    client: Arc<DapClient>,
    mut events: UnboundedReceiver<Event>,
    adapter_id: &str,
    request: &InspectRequest,
    options: TreeOptions,
    timeout: Duration,
) -> Result<String> {
    client
        .initialize(adapter_id)
        .await
        .context("initialize request failed")?;

    // Some adapters only answer `launch` after configuration is done.
    let (launched, configured) = tokio::join!(client.launch(&request.launch), async {
        wait_for_event(&client, &mut events, "initialized", timeout).await?;
        client
            .configuration_done()
            .await
            .context("configurationDone request failed")
    });
    launched.context("launch request failed")?;
    configured?;

    wait_for_event(&client, &mut events, "stopped", timeout).await?;

    let thread_id = match client.stopped_thread() {
        Some(id) => id,
        None => client
            .threads()
            .await
            .context("threads request failed")?
            .first()
            .map(|t| t.id)
            .context("debuggee has no threads")?,
    };
    let frames = client
        .stack_trace(thread_id)
        .await
        .context("stackTrace request failed")?;
    let frame = frames.into_iter().next().context("debuggee has no stack frames")?;
    info!(thread = thread_id, frame = %frame.name, "inspecting top frame");
    client.select_frame(Some(frame.id));

    let mut out = String::new();
    let location = match &frame.source {
        Some(source) => format!(
            "{}:{}",
            source.name.as_deref().or(source.path.as_deref()).unwrap_or("?"),
            frame.line
        ),
        None => format!("line {}", frame.line),
    };
    let _ = writeln!(out, "frame {} at {location}", frame.name);

    let mut variables = ExpressionTree::variables(Some(Arc::clone(&client)), options.clone());
    variables.set_source(frame.source.clone(), Some(frame.line));
    let _ = writeln!(out, "\n[variables]");
    out.push_str(&render_tree(&mut variables, request.depth).await);

    if !request.watches.is_empty() {
        let mut watch = ExpressionTree::watch(Some(Arc::clone(&client)), options.clone());
        for expression in &request.watches {
            watch.add_watch(expression.as_str())?;
        }
        watch.refresh_watches().await?;
        let _ = writeln!(out, "\n[watch]");
        out.push_str(&render_tree(&mut watch, request.depth).await);
    }

    if let Some(expression) = &request.hover {
        let mut hover = ExpressionTree::hover(Some(Arc::clone(&client)), options, expression.as_str());
        let root = hover.root();
        if let Err(e) = hover.evaluate(root, None).await {
            warn!("hover evaluation failed: {e}");
        }
        let _ = writeln!(out, "\n[hover]");
        out.push_str(&render_tree(&mut hover, request.depth).await);
    }

    if let Err(e) = client.disconnect(Some(true)).await {
        warn!(session = %client.id(), "disconnect failed: {e}");
    }
    Ok(out)
}

/// Feed events to the client until one named `name` arrives.
async fn wait_for_event(
    client: &DapClient,
    events: &mut UnboundedReceiver<Event>,
    name: &str,
    timeout: Duration,
) -> Result<()> {
    loop {
        let event = tokio::time::timeout(timeout, events.recv())
            .await
            .with_context(|| format!("timed out waiting for '{name}' event"))?;
        let Some(event) = event else {
            bail!("adapter closed the connection while waiting for '{name}' event");
        };
        debug!(event = %event.event, "adapter event");
        client.handle_event(&event)?;
        if event.event == name {
            return Ok(());
        }
        if client.is_terminated() {
            bail!("debug session ended while waiting for '{name}' event");
        }
    }
}

/// Spawn the configured adapter, inspect `cli.program` and return the
/// rendered text.
pub async fn inspect_program(config: &Config, cli: &CliArgs) -> Result<String> {
    let command = cli
        .adapter
        .clone()
        .or_else(|| config.adapter.command.clone())
        .context("no debug adapter configured (set adapter.command or pass --adapter)")?;
    let timeout = Duration::from_secs(config.adapter.request_timeout_secs);

    let (client, events, mut child) =
        DapClient::spawn_adapter(command.as_str(), &command, &config.adapter.args, timeout)
            .with_context(|| format!("failed to start debug adapter '{command}'"))?;
    info!(adapter = %command, program = %cli.program, "adapter started");

    let cwd = std::env::current_dir()
        .ok()
        .map(|dir| dir.to_string_lossy().into_owned());
    let request = InspectRequest {
        depth: cli.depth,
        watches: cli.watches.clone(),
        hover: cli.hover.clone(),
        launch: LaunchRequestArguments {
            program: Some(cli.program.clone()),
            args: Some(cli.program_args.clone()),
            cwd,
            stop_on_entry: Some(true),
            ..LaunchRequestArguments::default()
        },
    };

    let output = run_session(
        Arc::new(client),
        events,
        &config.adapter.adapter_id,
        &request,
        TreeOptions::from(&config.tree),
        timeout,
    )
    .await;

    reap_adapter(&mut child, ADAPTER_EXIT_GRACE).await;
    output
}

/// Wait up to `grace` for the adapter to exit, then kill it.
async fn reap_adapter(child: &mut Child, grace: Duration) {
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => debug!(%status, "adapter exited"),
        Ok(Err(e)) => warn!("failed to wait for adapter: {e}"),
        Err(_) => {
            debug!("adapter still running, killing it");
            if let Err(e) = child.kill().await {
                warn!("failed to kill adapter: {e}");
            }
        }
    }
}
