use alloy::primitives::{
    Address,
    U256,
};
use anyhow::{
    Context,
    anyhow,
};
use clap::{
    ArgGroup,
    Parser,
    Subcommand,
};
use deployments::{
    DEPLOYMENTS_ROOT,
    DeploymentEnv,
    DeploymentStore,
    record_contract,
};
use std::str::FromStr;
use url::Url;
use vnft_scanner::{
    app::{
        App,
        RunState,
        actix_query_api::ActixQueryApi,
        alloy_chain_query::AlloyChainQuery,
        init_tracing,
        retrying_chain_query::RetryingChainQuery,
        scanner::{
            Scanner,
            Session,
        },
    },
    config::{
        DEFAULT_AVG_BLOCK_SECS,
        DEFAULT_SAFETY_MARGIN_SECS,
        DEFAULT_UNFED_GRACE_SECS,
        RetryPolicy,
        ScanConfig,
    },
    records::{
        DerivedTokenRecord,
        display_reward,
    },
};

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = None,
    group(
        ArgGroup::new("network")
            .args(["mainnet", "local"])
            .required(true)
    )
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[arg(long)]
    mainnet: bool,

    #[arg(long)]
    local: bool,

    #[arg(short, long)]
    rpc_url: Option<Url>,

    #[arg(short, long)]
    contract_address: Option<String>,

    #[arg(long)]
    creation_block: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_AVG_BLOCK_SECS)]
    avg_block_seconds: u64,

    #[arg(long, default_value_t = DEFAULT_UNFED_GRACE_SECS)]
    grace_period_secs: u64,

    #[arg(long, default_value_t = DEFAULT_SAFETY_MARGIN_SECS)]
    safety_margin_secs: u64,

    /// Also classify the most recently minted token.
    #[arg(long)]
    include_newest: bool,

    /// Attempts per block-number or log query.
    #[arg(long, default_value_t = 3)]
    retries: u32,

    #[arg(short, long, default_value = "false")]
    tracing: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dashboard of the tokens an account holds.
    Owned {
        account: String,
        #[arg(long)]
        json: bool,
    },
    /// Market-wide risk scan.
    Market {
        #[arg(long)]
        json: bool,
    },
    /// Serve both scans over HTTP until interrupted.
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Store the resolved contract, RPC URL and creation block for this network.
    Record,
}

/// Contract and chain endpoint a run talks to.
#[derive(Debug)]
struct Target {
    rpc_url: Url,
    contract_address: Address,
    creation_block: u64,
}

async fn handle_interupt() {
    let res = tokio::signal::ctrl_c().await;
    match res {
        Ok(_) => {
            tracing::info!("Received interrupt, exiting");
        }
        Err(_) => {
            tracing::warn!("Received interrupt error, exiting anyway");
        }
    }
}

fn parse_address(raw: &str) -> anyhow::Result<Address> {
    Address::from_str(raw.trim()).map_err(|e| anyhow!("Failed to parse address '{raw}': {e}"))
}

fn resolve_target(args: &Args, env: DeploymentEnv) -> anyhow::Result<Target> {
    let store = DeploymentStore::new(env);
    let record = store
        .load_or_builtin()
        .with_context(|| format!("loading deployment from {}", store.path().display()))?;
    if let Some(ref record) = record {
        tracing::info!(
            "Using {env} deployment {} (creation block {}, recorded at {:?})",
            record.contract_address,
            record.creation_block,
            record.recorded_at
        );
    }

    let contract_address = match (&args.contract_address, &record) {
        (Some(raw), _) => parse_address(raw).context("parsing --contract-address")?,
        (None, Some(record)) => parse_address(&record.contract_address)
            .context("parsing contract address from deployment record")?,
        (None, None) => {
            return Err(anyhow!(
                "No deployment record found for {env}; provide --contract-address"
            ));
        }
    };
    let creation_block = args
        .creation_block
        .or_else(|| record.as_ref().map(|record| record.creation_block))
        .ok_or_else(|| {
            anyhow!("No creation block known for {contract_address}; supply --creation-block")
        })?;
    let rpc_url = match (&args.rpc_url, &record) {
        (Some(url), _) => url.clone(),
        (None, Some(record)) => Url::parse(&record.network_url)
            .with_context(|| format!("parsing network url {}", record.network_url))?,
        (None, None) => Url::parse(env.default_rpc_url()).context("parsing default RPC url")?,
    };
    Ok(Target {
        rpc_url,
        contract_address,
        creation_block,
    })
}

fn print_record(record: &DerivedTokenRecord) {
    let marker = if record.urgent { "!" } else { " " };
    println!(
        "{marker} #{:<8} lvl {:<4} score {:<8} reward {:>12}  starving {:<24} mine {}",
        record.token_id.to_string(),
        record.level,
        record.score,
        display_reward(record.expected_reward),
        record.starving_at_display,
        record.mine_at_display
    );
}

fn print_total(label: &str, total: U256) {
    println!("{label}: {}", display_reward(total));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.tracing {
        init_tracing();
    }
    let env = if args.local {
        DeploymentEnv::Local
    } else {
        DeploymentEnv::Mainnet
    };
    let target = resolve_target(&args, env)?;

    if matches!(args.command, Command::Record) {
        let record = record_contract(
            DEPLOYMENTS_ROOT,
            env,
            target.contract_address.to_string(),
            target.rpc_url.as_str(),
            target.creation_block,
        )?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let config = ScanConfig {
        creation_block: target.creation_block,
        avg_block_secs: args.avg_block_seconds,
        unfed_grace_secs: args.grace_period_secs,
        safety_margin_secs: args.safety_margin_secs,
        include_newest: args.include_newest,
    };
    let policy = RetryPolicy {
        max_attempts: args.retries,
        ..RetryPolicy::default()
    };
    let chain = RetryingChainQuery::new(
        AlloyChainQuery::connect(target.rpc_url, target.contract_address),
        policy,
    );
    let scanner = Scanner::new(config);

    match args.command {
        Command::Owned { account, json } => {
            let account = parse_address(&account).context("parsing account")?;
            let session = Session::new(&chain).with_account(account);
            let dashboard = scanner.owned_records(&session).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                println!("{} tokens owned by {account}", dashboard.total_owned);
                dashboard.records.iter().for_each(print_record);
                print_total("Total expected reward", dashboard.total_expected_reward);
            }
        }
        Command::Market { json } => {
            let session = Session::new(&chain);
            let report = scanner.market_risk(&session).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} minted, {} fed, {} alive, {} dead, {} live reads",
                    report.total_minted,
                    report.total_consumed,
                    report.alive_count,
                    report.dead_count,
                    report.live_reads
                );
                println!("{} dying soon:", report.total_dying_soon());
                report.dying_soon.iter().for_each(print_record);
            }
        }
        Command::Serve { port } => {
            let api = ActixQueryApi::new(port).await?;
            let mut app = App::new(chain, api, scanner);
            tracing::info!("Starting scanner service");
            loop {
                let interrupt = handle_interupt();
                match app.run(interrupt).await? {
                    RunState::Continue => continue,
                    RunState::Exit => {
                        tracing::info!("Exiting scanner service");
                        break;
                    }
                }
            }
        }
        Command::Record => {}
    }
    Ok(())
}
