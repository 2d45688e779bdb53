//! mongoscan
//!
//! Streams a MongoDB collection to JSON Lines, resuming transparently when
//! the server loses the cursor during a long scan.
//!
//! # Usage
//!
//! ```bash
//! mongoscan mongodb://localhost:27017/shop --collection orders \
//!     --filter '{"status": "open"}' --sort '{"createdAt": 1}' --bar -o orders.jsonl
//! ```

use std::pin::pin;

use futures::TryStreamExt;
use tokio::io::AsyncWrite;
use tracing::{debug, info};

use mongoscan::cli::CliInterface;
use mongoscan::connection::{ConnectionManager, sanitize_uri};
use mongoscan::error::Result;
use mongoscan::export::JsonLinesWriter;
use mongoscan::scan::{
    BarProgress, LogProgress, MongoCollection, ProgressReporter, ResilientCursor,
};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle subcommands or run the scan
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli);

    if cli.handle_subcommand()? {
        return Ok(());
    }

    run_scan(&cli).await
}

/// Connect, scan the collection and write every document
async fn run_scan(cli: &CliInterface) -> Result<()> {
    let collection = cli.collection()?;
    let database = cli.database();
    let spec = cli.scan_spec()?;
    let options = cli.scan_options();

    let uri = cli.connection_uri();
    info!("Connecting to {}", sanitize_uri(&uri));
    let mut manager = ConnectionManager::new(uri, cli.config().connection.clone());
    manager.connect().await?;

    let source = MongoCollection::new(manager.get_collection(&database, &collection)?);
    debug!("Scanning {} with {:?}", source.namespace(), spec);

    let progress: Box<dyn ProgressReporter> = if cli.args().bar {
        Box::new(BarProgress::new(true))
    } else {
        Box::new(LogProgress)
    };
    let scan = ResilientCursor::open(source, spec, options, progress).await?;

    let written = match &cli.args().output {
        Some(path) => write_all(scan, JsonLinesWriter::create(path).await?).await?,
        None => write_all(scan, JsonLinesWriter::new(tokio::io::stdout())).await?,
    };
    info!("Wrote {} documents", written);

    manager.disconnect().await
}

/// Drain the scan into the writer, returning the number of documents written
async fn write_all<W>(
    scan: ResilientCursor<MongoCollection>,
    mut writer: JsonLinesWriter<W>,
) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut docs = pin!(scan.into_stream());
    while let Some(doc) = docs.try_next().await? {
        writer.write_document(&doc).await?;
    }
    writer.finalize().await?;
    Ok(writer.written())
}

/// Initialize logging on stderr so stdout carries only documents
fn initialize_logging(cli: &CliInterface) {
    let logging = &cli.config().logging;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(logging.level.to_tracing_level())
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
