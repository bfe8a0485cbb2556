use clap::Parser;
use jobpay::application::engine::LedgerEngine;
use jobpay::config::LedgerConfig;
use jobpay::domain::ports::LedgerStoreBox;
use jobpay::error::{LedgerError, Result as LedgerResult};
use jobpay::infrastructure::in_memory::InMemoryLedger;
use jobpay::interfaces::csv::operation_reader::{Operation, OperationReader, OperationType};
use jobpay::interfaces::csv::profile_writer::ProfileWriter;
use jobpay::interfaces::seed::LedgerSeed;
use jobpay::logging;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Operations CSV file (`op, profile, target, amount`)
    input: PathBuf,

    /// JSON file with profiles, contracts and jobs to load before processing
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// How long an operation may wait for a busy account, in milliseconds
    #[arg(long, default_value_t = 5000)]
    lock_timeout_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(cli: &Cli) -> Result<LedgerStoreBox> {
    use jobpay::infrastructure::rocksdb::RocksDBLedger;

    match &cli.db_path {
        Some(db_path) => Ok(Box::new(RocksDBLedger::open(db_path).into_diagnostic()?)),
        None => Ok(Box::new(InMemoryLedger::new())),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(_cli: &Cli) -> Result<LedgerStoreBox> {
    Ok(Box::new(InMemoryLedger::new()))
}

async fn run_operation(engine: &LedgerEngine, operation: Operation) -> LedgerResult<()> {
    let acting = engine.authenticate(&operation.profile).await?;
    match operation.op {
        OperationType::Pay => {
            engine.pay_job(operation.target, &acting).await?;
        }
        OperationType::Deposit => {
            let amount = operation.amount.ok_or_else(|| {
                LedgerError::ValidationError("Deposit missing amount".to_string())
            })?;
            engine.deposit(operation.target, &acting, amount).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = LedgerConfig::default().with_lock_timeout(Duration::from_millis(cli.lock_timeout_ms));
    let engine = LedgerEngine::new(open_store(&cli)?, config);

    if let Some(seed_path) = &cli.seed {
        let seed = LedgerSeed::from_reader(File::open(seed_path).into_diagnostic()?)
            .into_diagnostic()?;
        seed.install(engine.store()).await.into_diagnostic()?;
        info!(path = %seed_path.display(), "seed loaded");
    }

    // Process operations
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);
    for (line, op_result) in reader.operations().enumerate() {
        match op_result {
            Ok(operation) => {
                if let Err(e) = run_operation(&engine, operation).await {
                    let kind = e.kind();
                    debug!(line = line + 1, code = kind.code(), status = kind.status_code(), "operation rejected");
                    eprintln!("Operation rejected [{}]: {}", kind.code(), e);
                }
            }
            Err(e) => {
                eprintln!("Error reading operation: {}", e);
            }
        }
    }

    // Output final state
    let profiles = engine.profiles().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = ProfileWriter::new(stdout.lock());
    writer.write_profiles(profiles).into_diagnostic()?;

    Ok(())
}
