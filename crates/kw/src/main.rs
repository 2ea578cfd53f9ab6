#![forbid(unsafe_code)]

mod prompt;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use keyward_core::claims::{AccountBody, OperatorBody, UserBody};
use keyward_core::permissions::PermissionLists;
use keyward_core::types::EntityKind;
use keyward_engine::actions::add_account::AddAccountParams;
use keyward_engine::actions::add_operator::AddOperatorParams;
use keyward_engine::actions::add_user::AddUserParams;
use keyward_engine::actions::edit_user::EditUserParams;
use keyward_engine::actions::load_claims;
use keyward_engine::config::{resolve_home, ToolConfig};
use keyward_engine::prompt::{NoPrompt, Prompter};
use keyward_engine::store::{EntityStore, EntryRef, FsKeyStore, FsStore};
use keyward_engine::time_window::TimeParams;
use keyward_engine::{run_action, ActionCtx, ActionError, ActionReport, EntityLifecycle};
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::prompt::DialoguerPrompter;

#[derive(Parser)]
#[command(
    name = "kw",
    version,
    about = "Operators, accounts and users as signed claims. Unix-friendly."
)]
struct Cli {
    /// Tool home directory (default: $KEYWARD_HOME, then ~/.keyward).
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Log more (-v debug, -vv trace). RUST_LOG is honoured otherwise.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Print the command result as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Add an operator, account or user.
    Add {
        #[command(subcommand)]
        what: AddCmd,
    },

    /// Edit an existing entity.
    Edit {
        #[command(subcommand)]
        what: EditCmd,
    },

    /// Print a stored claim as JSON.
    Describe {
        #[command(subcommand)]
        what: DescribeCmd,
    },

    /// List stored entities.
    List {
        #[command(subcommand)]
        what: ListCmd,
    },

    /// Show or change the tool configuration.
    Env {
        /// Select the default account.
        #[arg(short, long)]
        account: Option<String>,

        /// Forget the selected account.
        #[arg(long, conflicts_with = "account")]
        clear_account: bool,
    },
}

#[derive(Subcommand)]
enum AddCmd {
    /// Create the store's operator (self-signed).
    Operator {
        /// Operator name.
        #[arg(short, long)]
        name: Option<String>,

        /// Public key, seed, or seed file for the operator (default: generate).
        #[arg(short = 'k', long)]
        public_key: Option<String>,

        /// Account server URL recorded in the claim.
        #[arg(long)]
        account_server_url: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Add an account signed by the operator.
    Account {
        /// Account name.
        #[arg(short, long)]
        name: Option<String>,

        /// Public key, seed, or seed file for the account (default: generate).
        #[arg(short = 'k', long)]
        public_key: Option<String>,

        /// Operator key, seed, or seed file to sign with.
        #[arg(short = 'K', long)]
        operator_key: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Add a user signed by its account.
    User {
        /// User name.
        #[arg(short, long)]
        name: Option<String>,

        /// Owning account (default: selected or only account).
        #[arg(short, long)]
        account: Option<String>,

        /// Public key, seed, or seed file for the user (default: generate).
        #[arg(short = 'k', long)]
        public_key: Option<String>,

        /// Account key, seed, or seed file to sign with.
        #[arg(short = 'K', long)]
        account_key: Option<String>,

        #[command(flatten)]
        permissions: PermissionArgs,

        /// Source networks the user may connect from (CIDR).
        #[arg(long, value_delimiter = ',')]
        source_network: Vec<String>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Subcommand)]
enum EditCmd {
    /// Change permissions, tags, networks or validity of a user.
    User {
        /// User name.
        #[arg(short, long)]
        name: Option<String>,

        /// Owning account (default: selected or only account).
        #[arg(short, long)]
        account: Option<String>,

        /// Account key, seed, or seed file to sign with.
        #[arg(short = 'K', long)]
        account_key: Option<String>,

        #[command(flatten)]
        permissions: PermissionArgs,

        /// Remove subjects from every allow and deny list.
        #[arg(long, value_delimiter = ',')]
        rm: Vec<String>,

        /// Remove tags.
        #[arg(long, value_delimiter = ',')]
        rm_tag: Vec<String>,

        /// Source networks the user may connect from (CIDR).
        #[arg(long, value_delimiter = ',')]
        source_network: Vec<String>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Subcommand)]
enum DescribeCmd {
    Operator,
    Account {
        /// Account name (default: selected or only account).
        #[arg(short, long)]
        name: Option<String>,
    },
    User {
        /// User name.
        #[arg(short, long)]
        name: String,

        /// Owning account (default: selected or only account).
        #[arg(short, long)]
        account: Option<String>,
    },
}

#[derive(Subcommand)]
enum ListCmd {
    Accounts,
    Users {
        /// Owning account (default: selected or only account).
        #[arg(short, long)]
        account: Option<String>,
    },
}

/// Flags shared by every mutating command.
#[derive(Args)]
struct CommonArgs {
    /// Valid from: 0, YYYY-MM-DD, RFC 3339, or relative like 1d.
    #[arg(short, long)]
    start: Option<String>,

    /// Valid until: 0, YYYY-MM-DD, RFC 3339, or relative like 2w.
    #[arg(short, long)]
    expiry: Option<String>,

    /// Tags (comma separated or repeated).
    #[arg(long, value_delimiter = ',')]
    tag: Vec<String>,

    /// Prompt for anything not given as a flag.
    #[arg(short, long)]
    interactive: bool,
}

impl CommonArgs {
    fn time(&self) -> TimeParams {
        TimeParams {
            start: self.start.clone(),
            expiry: self.expiry.clone(),
        }
    }
}

#[derive(Args)]
struct PermissionArgs {
    /// Subjects the user may publish to.
    #[arg(long, value_delimiter = ',')]
    allow_pub: Vec<String>,

    /// Subjects the user may subscribe to.
    #[arg(long, value_delimiter = ',')]
    allow_sub: Vec<String>,

    /// Subjects the user may publish and subscribe to.
    #[arg(long, value_delimiter = ',')]
    allow_pubsub: Vec<String>,

    /// Subjects the user may not publish to.
    #[arg(long, value_delimiter = ',')]
    deny_pub: Vec<String>,

    /// Subjects the user may not subscribe to.
    #[arg(long, value_delimiter = ',')]
    deny_sub: Vec<String>,

    /// Subjects the user may neither publish nor subscribe to.
    #[arg(long, value_delimiter = ',')]
    deny_pubsub: Vec<String>,
}

impl From<PermissionArgs> for PermissionLists {
    fn from(args: PermissionArgs) -> Self {
        PermissionLists {
            allow_pub: args.allow_pub,
            allow_sub: args.allow_sub,
            allow_pubsub: args.allow_pubsub,
            deny_pub: args.deny_pub,
            deny_sub: args.deny_sub,
            deny_pubsub: args.deny_pubsub,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let env = Env::open(cli.home.as_deref())?;
    let json = cli.json;

    match cli.cmd {
        Cmd::Add { what } => cmd_add(&env, what, json),
        Cmd::Edit { what } => cmd_edit(&env, what, json),
        Cmd::Describe { what } => cmd_describe(&env, what),
        Cmd::List { what } => cmd_list(&env, what),
        Cmd::Env {
            account,
            clear_account,
        } => cmd_env(env, account, clear_account),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolved home, configuration and stores for one invocation.
struct Env {
    home: PathBuf,
    config: ToolConfig,
    store: FsStore,
    keys: FsKeyStore,
}

impl Env {
    fn open(home: Option<&Path>) -> Result<Self> {
        let home = resolve_home(home)?;
        let config = ToolConfig::load(&home)?;
        let store = FsStore::new(config.store_path(&home));
        let keys = FsKeyStore::new(config.keys_path(&home));
        tracing::debug!(home = %home.display(), "using tool home");
        Ok(Self {
            home,
            config,
            store,
            keys,
        })
    }

    fn ctx<'a>(&'a self, prompter: &'a dyn Prompter, interactive: bool) -> ActionCtx<'a> {
        ActionCtx::new(&self.store, &self.keys, prompter)
            .with_interactive(interactive)
            .with_current_account(self.config.account.clone())
    }

    /// Explicit account, else the selected or only account.
    fn account(&self, explicit: Option<String>) -> Result<String> {
        if let Some(account) = explicit {
            return Ok(account);
        }
        let ctx = self.ctx(&NoPrompt, false);
        match ctx.default_account()? {
            Some(account) => Ok(account),
            None => Err(ActionError::AmbiguousScope {
                kind: EntityKind::Account,
                count: ctx.account_candidates()?.len(),
            }
            .into()),
        }
    }
}

/// Interactive when asked for, or when the name is missing on a terminal.
fn wants_prompts(interactive: bool, name: &Option<String>) -> bool {
    interactive || (name.is_none() && std::io::stdin().is_terminal())
}

/// Run one command through the lifecycle and report the outcome.
fn execute<P: EntityLifecycle>(
    env: &Env,
    params: P,
    interactive: bool,
    usage_path: &[&str],
    json: bool,
) -> Result<ActionReport> {
    let terminal = DialoguerPrompter::new();
    let prompter: &dyn Prompter = if interactive { &terminal } else { &NoPrompt };
    let ctx = env.ctx(prompter, interactive);
    let report = match run_action(&ctx, params) {
        Ok(report) => report,
        Err(err) => {
            if err.shows_usage() {
                print_usage(usage_path);
            }
            return Err(err.into());
        }
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if let Some(path) = &report.generated_key {
        eprintln!(
            "Generated {} key - private key stored \"{}\"",
            report.kind,
            path.display()
        );
    }
    Ok(report)
}

fn print_usage(path: &[&str]) {
    let mut cmd = Cli::command();
    cmd.build();
    if let Some(sub) = path
        .iter()
        .try_fold(&mut cmd, |c, name| c.find_subcommand_mut(name))
    {
        eprintln!("{}", sub.render_usage());
    }
}

fn cmd_add(env: &Env, what: AddCmd, json: bool) -> Result<()> {
    match what {
        AddCmd::Operator {
            name,
            public_key,
            account_server_url,
            common,
        } => {
            let interactive = wants_prompts(common.interactive, &name);
            let mut params = AddOperatorParams::default();
            params.entity.name = name.unwrap_or_default();
            params.entity.key_ref = public_key;
            params.account_server_url = account_server_url;
            params.time = common.time();
            params.tags = common.tag;
            let report = execute(env, params, interactive, &["add", "operator"], json)?;
            eprintln!("Success! - added operator \"{}\"", report.name);
        }
        AddCmd::Account {
            name,
            public_key,
            operator_key,
            common,
        } => {
            let interactive = wants_prompts(common.interactive, &name);
            let mut params = AddAccountParams::default();
            params.entity.name = name.unwrap_or_default();
            params.entity.key_ref = public_key;
            params.operator_key = operator_key;
            params.time = common.time();
            params.tags = common.tag;
            let report = execute(env, params, interactive, &["add", "account"], json)?;
            eprintln!("Success! - added account \"{}\"", report.name);
        }
        AddCmd::User {
            name,
            account,
            public_key,
            account_key,
            permissions,
            source_network,
            common,
        } => {
            let interactive = wants_prompts(common.interactive, &name);
            let mut params = AddUserParams::default();
            params.entity.name = name.unwrap_or_default();
            params.entity.key_ref = public_key;
            params.account = account.unwrap_or_default();
            params.account_key = account_key;
            params.permissions = permissions.into();
            params.src = source_network;
            params.time = common.time();
            params.tags = common.tag;
            let report = execute(env, params, interactive, &["add", "user"], json)?;
            eprintln!(
                "Success! - added user \"{}\" to \"{}\"",
                report.name,
                report.scope.unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn cmd_edit(env: &Env, what: EditCmd, json: bool) -> Result<()> {
    match what {
        EditCmd::User {
            name,
            account,
            account_key,
            permissions,
            rm,
            rm_tag,
            source_network,
            common,
        } => {
            let interactive = wants_prompts(common.interactive, &name);
            let mut params = EditUserParams::default();
            params.name = name.unwrap_or_default();
            params.account = account.unwrap_or_default();
            params.account_key = account_key;
            params.permissions = permissions.into();
            params.remove_permissions = rm;
            params.tags = common.tag.clone();
            params.remove_tags = rm_tag;
            params.src = source_network;
            params.time = common.time();
            let report = execute(env, params, interactive, &["edit", "user"], json)?;
            eprintln!(
                "Success! - edited user \"{}\" in \"{}\"",
                report.name,
                report.scope.unwrap_or_default()
            );
        }
    }
    Ok(())
}

fn cmd_describe(env: &Env, what: DescribeCmd) -> Result<()> {
    let ctx = env.ctx(&NoPrompt, false);
    let doc = match what {
        DescribeCmd::Operator => {
            let name = env
                .store
                .operator_name()?
                .context("no operator defined - add an operator first")?;
            serde_json::to_value(load_claims::<OperatorBody>(&ctx, EntryRef::Operator(&name))?)?
        }
        DescribeCmd::Account { name } => {
            let name = env.account(name)?;
            serde_json::to_value(load_claims::<AccountBody>(&ctx, EntryRef::Account(&name))?)?
        }
        DescribeCmd::User { name, account } => {
            let account = env.account(account)?;
            let entry = EntryRef::User {
                account: &account,
                name: &name,
            };
            serde_json::to_value(load_claims::<UserBody>(&ctx, entry)?)?
        }
    };
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn cmd_list(env: &Env, what: ListCmd) -> Result<()> {
    let names = match what {
        ListCmd::Accounts => env.store.list_accounts()?,
        ListCmd::Users { account } => {
            let account = env.account(account)?;
            if !env.store.has(EntryRef::Account(&account))? {
                bail!("account \"{account}\" not found");
            }
            env.store.list_users(&account)?
        }
    };
    for name in names {
        println!("{name}");
    }
    Ok(())
}

fn cmd_env(mut env: Env, account: Option<String>, clear_account: bool) -> Result<()> {
    if let Some(account) = account {
        if !env.store.has(EntryRef::Account(&account))? {
            bail!("account \"{account}\" not found");
        }
        env.config.account = Some(account);
        env.config.save(&env.home)?;
    } else if clear_account {
        env.config.account = None;
        env.config.save(&env.home)?;
    }
    let report = json!({
        "home": env.home,
        "store": env.store.root(),
        "keys": env.keys.root(),
        "operator": env.store.operator_name()?,
        "account": env.config.account,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
