mod cli;
mod render;

use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Commands, NetworkOptions, StatusArgs, WriteArgs};
use stacks_counter::tracker::TxStatus;
use stacks_counter::{
    devnet_wallets, format_stx_address, ClientConfig, CounterApp, CounterFunction, NetworkType,
    StacksApiClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG=debug for request-level output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli.network)?;

    match cli.command {
        Commands::Watch => watch(config).await,
        Commands::Accounts => accounts(),
        Commands::Increment(args) => write(config, CounterFunction::Increment, args).await,
        Commands::Decrement(args) => write(config, CounterFunction::Decrement, args).await,
        Commands::Status(args) => status(config, args).await,
        Commands::Height => height(config).await,
    }
}

fn load_config(options: &NetworkOptions) -> Result<ClientConfig> {
    if let Some(network) = options.network {
        std::env::set_var("STACKS_NETWORK", NetworkType::from(network).as_str());
    }
    if let Some(ref url) = options.api_url {
        std::env::set_var("STACKS_API_URL", url);
    }
    ClientConfig::from_env().context("Failed to load configuration")
}

async fn watch(config: ClientConfig) -> Result<()> {
    let app = CounterApp::new(config, None).await?;
    println!("{} {}", render::network_badge(app.network()), app.config().contract);
    println!("{}", render::session_line(&app.session().snapshot()));

    let mut counter = app.counter().subscribe();
    let mut height = app.block_height().subscribe();
    let mut notices = app.notices();

    loop {
        tokio::select! {
            changed = counter.changed() => {
                changed?;
                let state = counter.borrow_and_update().clone();
                if !state.is_fetching {
                    println!("{}", render::counter_line(&state));
                }
            }
            changed = height.changed() => {
                changed?;
                let state = height.borrow_and_update().clone();
                if !state.is_fetching {
                    println!("{}", render::height_line(&state));
                }
            }
            Ok(notice) = notices.recv() => {
                println!("{}", render::notice_line(&notice));
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted");
                return Ok(());
            }
        }
    }
}

fn accounts() -> Result<()> {
    for account in devnet_wallets() {
        println!(
            "{:<9} {:<9} {}  ({})",
            account.name,
            account.label,
            account.stx_address,
            format_stx_address(&account.stx_address)
        );
    }
    Ok(())
}

async fn write(config: ClientConfig, function: CounterFunction, args: WriteArgs) -> Result<()> {
    let app = CounterApp::new(config, None).await?;
    let mut notices = app.notices();

    app.session()
        .select_devnet_account(&args.account)
        .await
        .with_context(|| format!("Cannot use account '{}'", args.account))?;
    println!("{}", render::session_line(&app.session().snapshot()));

    let txid = match function {
        CounterFunction::Increment => app.increment().await,
        CounterFunction::Decrement => app.decrement().await,
    }
    .with_context(|| format!("{} failed", function))?;
    println!("Submitted {}: {}", function, txid);

    if args.no_wait {
        return Ok(());
    }

    app.wait_idle().await?;
    if let Some(tracked) = app.tracked().await {
        let tx = tracked.borrow().clone();
        println!("{}", render::transaction_line(&tx));
        if tx.status == TxStatus::Success {
            // the call returns the new count
            if let Some(count) = tx.result.and_then(|r| r.into_response().ok()?.ok()?.as_uint()) {
                println!("Counter: {}", count);
            }
        }
    }
    while let Ok(notice) = notices.try_recv() {
        println!("{}", render::notice_line(&notice));
    }
    Ok(())
}

async fn status(config: ClientConfig, args: StatusArgs) -> Result<()> {
    let api = StacksApiClient::new(&config)?;
    let txid = stacks_counter::counter::write::normalize_txid(&args.txid);
    let info = api.get_transaction(&txid).await?;
    let status = TxStatus::from_api(&info.tx_status);

    print!("{} {}", info.tx_id, status);
    if let Some(height) = info.block_height {
        print!(" (block {})", height);
    }
    if let Some(result) = info.tx_result {
        print!(" -> {}", result.repr);
    }
    println!();
    Ok(())
}

async fn height(config: ClientConfig) -> Result<()> {
    let api = StacksApiClient::new(&config)?;
    let block = api.get_latest_block().await?;
    println!("Stacks block {} / Bitcoin block {}", block.height, block.burn_block_height);
    Ok(())
}
