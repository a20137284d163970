// love - command-line host for a LoveCoin ledger
//
// Acts as the trusted caller: `--caller` is taken as already authenticated.
// State lives in a sled database between invocations.

use clap::{Parser, Subcommand};
use lovecoin::identity::Address;
use lovecoin::ledger::{Amount, GenesisConfig, Ledger, LedgerEvent, SystemClock};
use lovecoin::storage::LedgerStore;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "love", version, about = "LoveCoin ledger")]
struct Cli {
    /// Path to the ledger database
    #[arg(long, default_value = "love.db", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new ledger; the deployer receives the supply and becomes admin
    Init {
        #[arg(long)]
        deployer: Address,
        #[arg(long, default_value = lovecoin::ledger::DEFAULT_NAME)]
        name: String,
        #[arg(long, default_value = lovecoin::ledger::DEFAULT_SYMBOL)]
        symbol: String,
        #[arg(long, default_value_t = lovecoin::ledger::DEFAULT_DECIMALS)]
        decimals: u8,
        /// Initial supply in whole tokens
        #[arg(long, default_value_t = lovecoin::ledger::DEFAULT_INITIAL_SUPPLY)]
        supply: u128,
        /// Seconds between two mints to the same account
        #[arg(long, default_value_t = lovecoin::ledger::DEFAULT_MINT_DELAY_SECS)]
        mint_delay: u64,
    },
    /// Show token metadata, supply and issuance settings
    Info,
    /// Show the balance of an account
    Balance { account: Address },
    /// Show how much `spender` may move out of `owner`
    Allowance { owner: Address, spender: Address },
    /// Transfer base units from the caller
    Transfer {
        #[arg(long)]
        caller: Address,
        to: Address,
        amount: Amount,
    },
    /// Allow `spender` to move up to `amount` of the caller's balance
    Approve {
        #[arg(long)]
        caller: Address,
        spender: Address,
        amount: Amount,
    },
    /// Spend the caller's allowance over `from`
    TransferFrom {
        #[arg(long)]
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    },
    /// Set the amount credited per mint (admin only, 0 disables minting)
    SetMintAmount {
        #[arg(long)]
        caller: Address,
        amount: Amount,
    },
    /// Set the per-account mint cooldown in seconds (admin only)
    SetMintDelay {
        #[arg(long)]
        caller: Address,
        secs: u64,
    },
    /// Mint the configured amount to `to`
    Mint {
        #[arg(long)]
        caller: Address,
        to: Address,
    },
    /// Print the event log, optionally filtered by account
    Events {
        #[arg(long)]
        account: Option<Address>,
    },
    /// Print a fresh random address
    NewAddress,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Command::NewAddress => {
            println!("{}", Address::generate());
            Ok(())
        }
        Command::Init {
            deployer,
            name,
            symbol,
            decimals,
            supply,
            mint_delay,
        } => {
            let config = GenesisConfig::new()
                .with_name(name)
                .with_symbol(symbol)
                .with_decimals(decimals)
                .with_initial_supply(supply)
                .with_mint_delay_secs(mint_delay);
            init(&cli.db, &config, deployer)
        }
        command => execute(&cli.db, command),
    }
}

fn init(db: &Path, config: &GenesisConfig, deployer: Address) -> Result<(), Box<dyn Error>> {
    let store = LedgerStore::open(db)?;
    if store.load_state()?.is_some() {
        return Err(format!("ledger already initialized at {}", db.display()).into());
    }

    let ledger = Ledger::new(config, deployer)?;
    store.save_state(ledger.state())?;
    store.flush()?;
    print_info(&ledger);
    Ok(())
}

fn execute(db: &Path, command: Command) -> Result<(), Box<dyn Error>> {
    let store = LedgerStore::open(db)?;
    let state = store
        .load_state()?
        .ok_or_else(|| format!("no ledger at {}; run `love init` first", db.display()))?;
    let mut ledger = Ledger::from_state(state, Arc::new(SystemClock))?;
    let decimals = ledger.decimals();

    let mutated = match command {
        Command::Info => {
            print_info(&ledger);
            false
        }
        Command::Balance { account } => {
            let balance = ledger.balance_of(&account);
            println!("{} ({} {})", balance, balance.format_units(decimals), ledger.symbol());
            false
        }
        Command::Allowance { owner, spender } => {
            println!("{}", ledger.allowance(&owner, &spender));
            false
        }
        Command::Transfer { caller, to, amount } => {
            ledger.transfer(&caller, &to, amount)?;
            true
        }
        Command::Approve {
            caller,
            spender,
            amount,
        } => {
            ledger.approve(&caller, &spender, amount)?;
            true
        }
        Command::TransferFrom {
            caller,
            from,
            to,
            amount,
        } => {
            ledger.transfer_from(&caller, &from, &to, amount)?;
            true
        }
        Command::SetMintAmount { caller, amount } => {
            ledger.set_mint_amount(&caller, amount)?;
            true
        }
        Command::SetMintDelay { caller, secs } => {
            ledger.set_mint_delay(&caller, secs)?;
            true
        }
        Command::Mint { caller, to } => {
            let minted = ledger.mint(&caller, &to)?;
            println!("minted {} to {}", minted, to);
            true
        }
        Command::Events { account } => {
            for event in store.load_events()? {
                if account.map_or(true, |a| event.involves(&a)) {
                    print_event(&event);
                }
            }
            false
        }
        Command::Init { .. } | Command::NewAddress => false,
    };

    if mutated {
        let events = ledger.drain_events();
        store.commit(ledger.state(), &events)?;
        store.flush()?;
    }
    Ok(())
}

fn print_info(ledger: &Ledger) {
    let decimals = ledger.decimals();
    println!("name:         {}", ledger.name());
    println!("symbol:       {}", ledger.symbol());
    println!("decimals:     {}", decimals);
    println!(
        "total supply: {} ({})",
        ledger.total_supply(),
        ledger.total_supply().format_units(decimals)
    );
    println!("admin:        {}", ledger.admin());
    println!("mint amount:  {}", ledger.mint_amount());
    println!("mint delay:   {}s", ledger.mint_delay());
    println!("holders:      {}", ledger.holders().len());
}

fn print_event(event: &LedgerEvent) {
    match event {
        LedgerEvent::Transfer { from, to, amount } => {
            println!("transfer  {} -> {} {}", from, to, amount)
        }
        LedgerEvent::Approval {
            owner,
            spender,
            amount,
        } => println!("approval  {} -> {} {}", owner, spender, amount),
        LedgerEvent::Mint {
            caller,
            to,
            amount,
            timestamp,
        } => {
            let when = chrono::DateTime::from_timestamp(*timestamp as i64, 0)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| timestamp.to_string());
            println!("mint      {} -> {} {} at {}", caller, to, amount, when)
        }
        LedgerEvent::MintAmountChanged { amount } => println!("config    mint amount {}", amount),
        LedgerEvent::MintDelayChanged { delay_secs } => {
            println!("config    mint delay {}s", delay_secs)
        }
    }
}
