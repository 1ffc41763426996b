//! Lumen CLI - operator tooling for the keyless wallet
//!
//! Small inspection and derivation commands: build a login URL, derive an
//! address from a JWT and PIN, recompute a login nonce, and inspect a
//! stored session envelope. Nothing here talks to the network.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use lumen_auth::OAuthConfig;
use lumen_core::{derive_address, DecodedJwt, EphemeralIdentity, Pin, Session, UserIdentity};

#[derive(Parser)]
#[command(name = "lumen")]
#[command(about = "Keyless wallet tooling", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the OAuth authorize URL for a login nonce
    LoginUrl {
        /// OAuth configuration file (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Login nonce to embed
        #[arg(short, long)]
        nonce: String,

        /// Build the signup URL instead of the login URL
        #[arg(long)]
        signup: bool,

        /// Pre-fill the email field on signup
        #[arg(long)]
        login_hint: Option<String>,
    },

    /// Derive the wallet address from an ID token and PIN
    Address {
        /// Compact JWT (the OAuth ID token)
        #[arg(short, long)]
        jwt: String,

        /// User PIN
        #[arg(short, long)]
        pin: String,
    },

    /// Recompute the login nonce from a stored session envelope
    Nonce {
        /// Session envelope file (JSON)
        #[arg(short, long)]
        session: PathBuf,
    },

    /// Inspect a stored session envelope
    Session {
        /// Session envelope file (JSON)
        #[arg(short, long)]
        session: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumen=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::LoginUrl {
            config,
            nonce,
            signup,
            login_hint,
        } => {
            let config = match config {
                Some(path) => OAuthConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => OAuthConfig::default(),
            };
            let url = if signup {
                config.signup_url(&nonce, login_hint.as_deref())
            } else {
                config.authorize_url(&nonce)
            };
            println!("{}", url);
        }

        Commands::Address { jwt, pin } => {
            let jwt = DecodedJwt::parse(&jwt)?;
            let pin = Pin::new(pin)?;
            let address = derive_address(&jwt.claims, &pin)?;
            let identity = UserIdentity::from_jwt(&jwt, &pin, jwt.claims.issuer()?.to_string())?;
            println!("address:  {}", address);
            println!("subject:  {}", identity.subject);
            if let Some(email) = identity.email {
                println!("email:    {}", email);
            }
        }

        Commands::Nonce { session } => {
            let session = load_session(&session)?;
            let stored = session.ephemeral()?;
            let identity = EphemeralIdentity::from_stored(stored);
            let computed = identity.login_nonce();
            println!("nonce:     {}", computed);
            if computed != stored.nonce {
                println!("stored:    {} (MISMATCH)", stored.nonce);
            }
        }

        Commands::Session { session } => {
            let session = load_session(&session)?;
            println!("complete:  {}", session.is_complete());
            match &session.ephemeral {
                Some(e) => {
                    println!("ephemeral: present (max epoch {})", e.max_epoch);
                    println!("nonce:     {}", e.nonce);
                }
                None => println!("ephemeral: absent"),
            }
            println!(
                "proof:     {}",
                if session.proof.is_some() { "present" } else { "absent" }
            );
            println!(
                "id token:  {}",
                if session.id_token.is_some() { "present" } else { "absent" }
            );
        }
    }
    Ok(())
}

fn load_session(path: &PathBuf) -> Result<Session> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}
