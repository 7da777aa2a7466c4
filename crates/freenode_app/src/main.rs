// SPDX-License-Identifier: MIT OR Apache-2.0
//! Headless freenode host.
//!
//! Loads editor settings (RON) and a graph document (JSON), drives the
//! runner for a fixed number of simulated frames and prints the resulting
//! document.
//!
//! ```text
//! freenode [GRAPH.json] [--config FILE.ron] [--frames N] [--frame-ms MS] [--output FILE.json]
//! ```
//!
//! Without a graph path a small demo graph is built instead.

use clap::Parser;
use freenode_graph::builtin::{ADD, CONSTANT, COUNTER, LOG, NOTE};
use freenode_graph::{
    ConfigError, DocumentError, EditorConfig, EventKind, GraphDocument, GraphEditor, GraphError, GraphEvent,
    NodeOverrides, RegistryError,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Host failure
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Parser)]
#[command(name = "freenode")]
#[command(version, about = "Run a freenode graph headlessly", long_about = None)]
struct Args {
    /// Graph document to load (JSON); a demo graph is built when omitted
    graph: Option<PathBuf>,

    /// Editor settings file (RON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the resulting document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of simulated frames
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// Simulated frame interval in milliseconds
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
}

fn build_demo(editor: &mut GraphEditor) -> Result<(), AppError> {
    let note = editor.add_node(NOTE, NodeOverrides::default().at(40.0, 40.0))?;
    let constant = editor.add_node(CONSTANT, NodeOverrides::default().at(40.0, 180.0))?;
    let counter = editor.add_node(COUNTER, NodeOverrides::default().at(40.0, 280.0))?;
    let add = editor.add_node(ADD, NodeOverrides::default().at(300.0, 220.0))?;
    let log = editor.add_node(LOG, NodeOverrides::default().at(560.0, 220.0))?;

    if let Some(node) = editor.graph_mut().node_mut(constant) {
        node.state.insert("value".into(), 10.into());
    }
    if let Some(node) = editor.graph_mut().node_mut(note) {
        node.state.insert("text".into(), "freenode demo".into());
    }

    let graph = editor.graph();
    let port = |node, output: bool, index: usize| {
        graph.node(node).and_then(|n| if output { n.output(index) } else { n.input(index) }).map(|p| p.id)
    };
    let wires = [
        (constant, port(constant, true, 0), add, port(add, false, 0)),
        (counter, port(counter, true, 0), add, port(add, false, 1)),
        (add, port(add, true, 0), log, port(log, false, 0)),
    ];
    for (from, from_port, to, to_port) in wires {
        if let (Some(from_port), Some(to_port)) = (from_port, to_port) {
            editor.graph_mut().add_edge(from, from_port, to, to_port)?;
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<(), AppError> {

    let config = match &args.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let mut editor = GraphEditor::new(config)?;

    editor.hooks().on(EventKind::Error, |event| {
        if let GraphEvent::Error(err) = event {
            tracing::error!("{err}");
        }
    });

    match &args.graph {
        Some(path) => {
            let document = GraphDocument::load(path)?;
            editor.load_document(&document)?;
        }
        None => build_demo(&mut editor)?,
    }

    editor.start();
    let frame = Duration::from_millis(args.frame_ms);
    for i in 0..args.frames {
        if let Some(tick) = editor.frame(frame * i) {
            tracing::trace!(time = ?tick.time, dt = tick.dt, "frame");
        }
    }
    editor.stop();

    let document = editor.to_document();
    match &args.output {
        Some(path) => {
            document.save(path)?;
            tracing::info!(path = %path.display(), "wrote document");
        }
        None => println!("{}", serde_json::to_string_pretty(&document)?),
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("freenode_graph=info,freenode_app=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting freenode v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args) {
        tracing::error!("freenode failed: {e}");
        std::process::exit(1);
    }
}
