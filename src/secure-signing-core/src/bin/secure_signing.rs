//! secure-signing CLI - manage labelled P-256 key pairs and sign payloads.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use secure_signing_core::encoding;
use secure_signing_core::{
    verify, BackendChoice, ErrorPayload, FixedPresence, KeyManager, KeyRequest, PermissionTier,
    SecureSigning, SignRequest, SigningConfig, SigningError,
};
use secure_signing_keystore::{detect_capabilities, open_store};
use serde::Serialize;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Label-addressed ECDSA P-256 key store and signing service.
///
/// Keys are created and used by label; private keys never leave the
/// backing store. Payloads, public keys and signatures are base64.
#[derive(Parser)]
#[command(name = "secure-signing")]
#[command(version = VERSION)]
#[command(about = "Label-addressed ECDSA P-256 key store and signing service")]
#[command(long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// JSON configuration file; flags below override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backing store
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    /// Directory of the encrypted file store
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// OS keyring service name
    #[arg(long, global = true)]
    service: Option<String>,

    /// Secret protecting the encrypted file store
    #[arg(long, global = true, env = "SECURE_SIGNING_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Treat every user-presence prompt as confirmed
    #[arg(long, global = true)]
    assume_present: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Auto,
    OsKeyring,
    EncryptedFile,
    Memory,
}

impl From<Backend> for BackendChoice {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Auto => Self::Auto,
            Backend::OsKeyring => Self::OsKeyring,
            Backend::EncryptedFile => Self::EncryptedFile,
            Backend::Memory => Self::Memory,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a key pair exists
    Exists {
        /// Key label
        label: String,
    },

    /// Generate a new key pair (fails if one exists)
    Generate {
        /// Key label
        label: String,

        /// Require user presence for every use of the key
        #[arg(long)]
        auth_required: bool,

        /// Seconds one confirmation stays valid
        #[arg(long, requires = "auth_required")]
        auth_validity: Option<u32>,
    },

    /// Return the existing key pair or create it
    Create {
        /// Key label
        label: String,

        /// Require user presence for every use of the key
        #[arg(long)]
        auth_required: bool,

        /// Seconds one confirmation stays valid
        #[arg(long, requires = "auth_required")]
        auth_validity: Option<u32>,
    },

    /// Print the public key of an existing key pair
    Get {
        /// Key label
        label: String,
    },

    /// Sign a payload
    Sign {
        /// Key label
        label: String,

        /// Base64 payload
        #[arg(long, conflicts_with = "message")]
        data: Option<String>,

        /// UTF-8 payload, encoded before signing
        #[arg(long)]
        message: Option<String>,
    },

    /// Verify a signature against a public key
    Verify {
        /// Base64 public key
        #[arg(long)]
        public_key: String,

        /// Base64 payload
        #[arg(long)]
        data: String,

        /// Base64 DER signature
        #[arg(long)]
        signature: String,
    },

    /// Delete a key pair
    Delete {
        /// Key label
        label: String,
    },

    /// List stored labels
    List,

    /// Show platform capabilities
    Info,
}

fn load_config(cli: &Cli) -> Result<SigningConfig, SigningError> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| SigningError::Os {
                reason: format!("cannot read {}: {e}", path.display()),
            })?;
            SigningConfig::from_json(&json)?
        },
        None => SigningConfig::default(),
    };

    if let Some(backend) = cli.backend {
        config.store.backend = backend.into();
    }
    if let Some(dir) = &cli.dir {
        config.store.directory = Some(dir.clone());
        if cli.backend.is_none() && cli.config.is_none() {
            config.store.backend = BackendChoice::EncryptedFile;
        }
    }
    if let Some(service) = &cli.service {
        config.store.service = service.clone();
    }
    if let Some(secret) = &cli.secret {
        config.store.store_secret = Some(secret.clone());
    }

    Ok(config)
}

fn open_service(cli: &Cli, tier: Option<PermissionTier>) -> Result<SecureSigning, SigningError> {
    let mut config = load_config(cli)?;
    if let Some(tier) = tier {
        config.default_tier = tier;
    }

    let store = open_store(&config.store)
        .map_err(|e| SigningError::from_keystore(secure_signing_core::Operation::Query, e))?;

    let mut keys = KeyManager::new(store);
    if cli.assume_present {
        keys = keys.with_presence(Arc::new(FixedPresence::approving()));
    }

    Ok(SecureSigning::with_key_manager(keys, config))
}

fn tier_for(auth_required: bool, validity: Option<u32>) -> Option<PermissionTier> {
    if !auth_required {
        return None;
    }
    Some(PermissionTier::AuthenticationRequired {
        validity_seconds: validity.unwrap_or(PermissionTier::DEFAULT_AUTH_VALIDITY_SECONDS),
    })
}

fn emit<T: Serialize>(format: Format, value: &T, text: impl FnOnce() -> String) {
    match format {
        Format::Json => match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to render output: {e}"),
        },
        Format::Text => println!("{}", text()),
    }
}

fn report(format: Format, err: &SigningError) {
    let payload = ErrorPayload::from(err);
    match format {
        Format::Json => match serde_json::to_string_pretty(&payload) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("failed to render error: {e}"),
        },
        Format::Text => eprintln!("\x1b[31m[{}]\x1b[0m {}", payload.code, payload.message),
    }
}

async fn run(cli: &Cli) -> Result<(), SigningError> {
    let format = cli.format;

    match &cli.command {
        Commands::Exists { label } => {
            let signing = open_service(cli, None)?;
            let res = signing.does_key_pair_exist(&KeyRequest::new(label)).await?;
            emit(format, &res, || format!("{label}: {}", if res.is_existing { "exists" } else { "absent" }));
        },
        Commands::Generate {
            label,
            auth_required,
            auth_validity,
        } => {
            let signing = open_service(cli, tier_for(*auth_required, *auth_validity))?;
            let res = signing.generate_key_pair(&KeyRequest::new(label)).await?;
            emit(format, &res, || res.public_key.clone());
        },
        Commands::Create {
            label,
            auth_required,
            auth_validity,
        } => {
            let signing = open_service(cli, tier_for(*auth_required, *auth_validity))?;
            let res = signing
                .create_key_pair_if_does_not_exist(&KeyRequest::new(label))
                .await?;
            emit(format, &res, || res.public_key.clone());
        },
        Commands::Get { label } => {
            let signing = open_service(cli, None)?;
            let res = signing.get_key_pair(&KeyRequest::new(label)).await?;
            emit(format, &res, || res.public_key.clone());
        },
        Commands::Sign {
            label,
            data,
            message,
        } => {
            let data = match (data, message) {
                (Some(data), _) => data.clone(),
                (None, Some(message)) => encoding::encode(message.as_bytes()),
                (None, None) => return Err(SigningError::invalid_data("pass --data or --message")),
            };

            let signing = open_service(cli, None)?;
            let res = signing.sign(&SignRequest::new(label, data)).await?;
            emit(format, &res, || res.signature.clone());
        },
        Commands::Verify {
            public_key,
            data,
            signature,
        } => {
            let public_key = encoding::decode_data(Some(public_key))?;
            let message = encoding::decode_data(Some(data))?;
            let signature = encoding::decode_data(Some(signature))?;

            let valid = verify(&public_key, &message, &signature)?;
            emit(format, &serde_json::json!({ "valid": valid }), || {
                if valid { "\x1b[32m[VALID]\x1b[0m".into() } else { "\x1b[31m[INVALID]\x1b[0m".into() }
            });
        },
        Commands::Delete { label } => {
            let signing = open_service(cli, None)?;
            let res = signing.delete_key_pair(&KeyRequest::new(label)).await?;
            emit(format, &res, || format!("{label}: {}", res.delete_status.as_str()));
        },
        Commands::List => {
            let signing = open_service(cli, None)?;
            let labels: Vec<String> = signing
                .list_key_pairs()
                .await?
                .into_iter()
                .map(String::from)
                .collect();
            emit(format, &labels, || labels.join("\n"));
        },
        Commands::Info => show_system_info(cli)?,
    }

    Ok(())
}

fn show_system_info(cli: &Cli) -> Result<(), SigningError> {
    let caps = detect_capabilities();
    let config = load_config(cli)?;

    if cli.format == Format::Json {
        let info = serde_json::json!({
            "version": VERSION,
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "preferredBackend": caps.preferred_backend,
            "hasOsKeyring": caps.has_os_keyring,
            "supportsUserAuth": caps.supports_user_auth,
            "configuredBackend": config.store.backend,
        });
        emit(cli.format, &info, String::new);
        return Ok(());
    }

    println!("\nSYSTEM INFORMATION");
    println!("==================\n");
    println!("secure-signing Version: {}", VERSION);
    println!();
    println!("Platform:");
    println!("  OS: {}", std::env::consts::OS);
    println!("  Arch: {}", std::env::consts::ARCH);
    println!();
    println!("Key Storage:");
    println!("  Preferred backend: {}", caps.preferred_backend);
    println!("  OS keyring: {}", if caps.has_os_keyring { "available" } else { "unavailable" });
    println!("  User presence: {}", if caps.supports_user_auth { "supported" } else { "unsupported" });
    println!("  Configured backend: {:?}", config.store.backend);
    println!();
    println!("Signatures: ECDSA P-256 / SHA-256, ASN.1 DER");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Keep stdout clean for JSON consumers
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else if cli.quiet || cli.format == Format::Json {
        tracing::Level::ERROR
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(cli.format, &e);
            ExitCode::FAILURE
        },
    }
}
