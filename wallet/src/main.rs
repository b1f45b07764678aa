use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};

use sepolia_wallet_lib::{
    Action, Address, ConfigStore, HistoryClient, HttpWalletProvider, NoticeLevel, WalletConfig,
    WalletContext, WalletProvider, WalletView,
};

/// Send Sepolia ETH through a node's JSON-RPC endpoint.
#[derive(Parser)]
#[command(name = "sepolia-wallet", version, about = "Sepolia ETH transfer wallet")]
struct Args {
    /// Wallet configuration file (JSON)
    #[arg(long, env = "SEPOLIA_WALLET_CONFIG", default_value = "wallet.json")]
    config: PathBuf,

    /// Override the JSON-RPC endpoint from the configuration
    #[arg(long)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show configuration and the connected account, if any
    Status,
    /// Request account access and move to the configured network
    Connect,
    /// Show the connected account's balance
    Balance,
    /// Send ETH to another address and wait for confirmation
    Send {
        /// Recipient address (0x...)
        #[arg(long)]
        to: String,

        /// Amount in ETH, e.g. 0.01
        #[arg(long)]
        amount: String,
    },
    /// List transactions from the history API
    History {
        /// Address to look up instead of the connected account
        #[arg(long)]
        address: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = load_config(&args)?;
    let provider = HttpWalletProvider::connect(
        &config.rpc_endpoint,
        Duration::from_millis(config.confirmation_poll_ms),
    )?;
    let provider: Arc<dyn WalletProvider> = Arc::new(provider);
    let ctx = WalletContext::initialize(config, Some(provider))?;

    match args.command {
        Command::Status => status(&ctx).await,
        Command::Connect => {
            let view = connect(&ctx).await?;
            print_notices(&view);
            Ok(())
        }
        Command::Balance => balance(&ctx).await,
        Command::Send { to, amount } => send(&ctx, to, amount).await,
        Command::History { address } => history(&ctx, address).await,
    }
}

fn load_config(args: &Args) -> anyhow::Result<WalletConfig> {
    let store = ConfigStore::new(&args.config);
    let mut config = store
        .load_effective()
        .with_context(|| format!("loading {}", store.path().display()))?;
    if let Some(rpc_url) = &args.rpc_url {
        config.rpc_endpoint = rpc_url.clone();
        config.validate()?;
    }
    log::debug!("Using configuration {:?}", config);
    Ok(config)
}

/// Restore an authorized account, or ask for one
async fn connect(ctx: &WalletContext) -> anyhow::Result<WalletView> {
    ctx.dispatch(Action::Started).await;
    if !ctx.view().is_connected() {
        ctx.dispatch(Action::ConnectRequested).await;
    }

    let view = ctx.view();
    if !view.is_connected() {
        print_notices(&view);
        bail!("wallet is not connected");
    }
    Ok(view)
}

async fn status(ctx: &WalletContext) -> anyhow::Result<()> {
    let config = ctx.config();
    println!("Environment: {}", config.environment);
    println!(
        "Network:     {} ({})",
        config.network.chain_name,
        config.network.chain_id_hex()
    );
    println!("RPC:         {}", config.rpc_endpoint);
    println!("History API: {}", config.history_api_url);

    ctx.dispatch(Action::Started).await;
    let view = ctx.view();
    match view.address {
        Some(address) => {
            println!("Account:     {}", address);
            print_balance(&view);
        }
        None => println!("Account:     not connected"),
    }
    print_notices(&view);
    Ok(())
}

async fn balance(ctx: &WalletContext) -> anyhow::Result<()> {
    let view = connect(ctx).await?;
    print_balance(&view);
    match view.balance_error {
        Some(error) => Err(anyhow!(error)),
        None => Ok(()),
    }
}

async fn send(ctx: &WalletContext, to: String, amount: String) -> anyhow::Result<()> {
    connect(ctx).await?;

    ctx.dispatch(Action::TransferOpened).await;
    ctx.dispatch(Action::RecipientChanged(to)).await;
    ctx.dispatch(Action::AmountChanged(amount)).await;
    ctx.dispatch(Action::TransferSubmitted).await;

    let view = ctx.view();
    print_notices(&view);
    if let Some(error) = view.transfer.as_ref().and_then(|form| form.error.clone()) {
        bail!(error);
    }
    print_balance(&view);
    Ok(())
}

async fn history(ctx: &WalletContext, address: Option<String>) -> anyhow::Result<()> {
    let view = match address {
        Some(raw) => {
            let address = Address::parse(&raw)?;
            let client = HistoryClient::new(ctx.config().history_api_url.clone())?;
            let history = sepolia_wallet_lib::load_history(&client, &address).await;
            let mut view = WalletView::default();
            view.address = Some(address);
            view.history = history;
            view
        }
        None => connect(ctx).await?,
    };

    if view.history.is_empty() {
        println!("No transactions");
    }
    for entry in &view.history.entries {
        println!(
            "{}  {} -> {}  {} ETH  {}",
            entry.display_time(),
            entry.from,
            entry.to,
            entry.amount,
            entry.tx_hash
        );
    }
    match view.history.error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

fn print_balance(view: &WalletView) {
    match (view.balance_text(), &view.balance_error) {
        (Some(balance), _) => println!("Balance:     {}", balance),
        (None, Some(error)) => println!("Balance:     unavailable ({})", error),
        (None, None) => println!("Balance:     unknown"),
    }
}

fn print_notices(view: &WalletView) {
    for notice in &view.notices {
        let marker = match notice.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        };
        println!("[{}] {}: {}", marker, notice.title, notice.description);
    }
}
