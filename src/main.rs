use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pixvariant::cache::MemoryCache;
use pixvariant::config::Config;
use pixvariant::imaging::{EngineInput, RasterEngine, TransformEngine};
use pixvariant::jit::{JitRequest, JitService};
use pixvariant::optimize::optimize;
use pixvariant::policy::{compile, default_policy, Policy, PolicyContext, PolicySchema};
use pixvariant::signing::{self, SignOptions};
use pixvariant::source::{content_type_for_path, FsSource};
use pixvariant::storage::LocalStorage;

/// Pixvariant - image variants on demand and ahead of time
#[derive(Parser, Debug)]
#[command(name = "pixvariant")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign a path or URL
    Sign {
        path: String,
        /// Signing secret (falls back to jit.security.secret)
        #[arg(long, env = "PIXVARIANT_SECRET")]
        secret: Option<String>,
        /// Lifetime in seconds
        #[arg(long)]
        expires_in: Option<u64>,
    },

    /// Verify a signed path; exits non-zero when invalid
    Verify {
        path: String,
        #[arg(long, env = "PIXVARIANT_SECRET")]
        secret: Option<String>,
    },

    /// Probe an image and print the policy decision for it
    Evaluate {
        image: PathBuf,
        /// Policy schema file (YAML or JSON); overrides the configured policy
        #[arg(long)]
        policy: Option<PathBuf>,
    },

    /// Generate and store every variant the policy asks for, print the manifest
    Optimize {
        image: PathBuf,
        #[arg(long)]
        policy: Option<PathBuf>,
    },

    /// Run one on-demand request against the configured source directory
    ServeFile {
        /// Request path and query, e.g. `/img/cat.jpg?w=400`
        request: String,
        #[arg(long)]
        if_none_match: Option<String>,
        /// Write the response body here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
    .and_then(|config| config.validate().map(|_| config))
    .unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = pixvariant::logging::init_subscriber(&config.logging) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    match run(args.command, config).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(command: Command, config: Config) -> anyhow::Result<i32> {
    match command {
        Command::Sign {
            path,
            secret,
            expires_in,
        } => {
            let secret = resolve_secret(secret, &config)?;
            let options = SignOptions { expires_in };
            println!("{}", signing::sign(&path, &secret, options));
            Ok(0)
        }

        Command::Verify { path, secret } => {
            let secret = resolve_secret(secret, &config)?;
            if signing::verify(&path, &secret) {
                println!("valid");
                Ok(0)
            } else {
                println!("invalid");
                Ok(2)
            }
        }

        Command::Evaluate { image, policy } => {
            let policy = load_policy(policy.as_deref(), &config)?;
            let input = read_input(&image)?;
            let metadata = RasterEngine::default()
                .probe(&input)
                .await
                .context("Failed to probe image")?;
            let ctx = PolicyContext::from_metadata(
                metadata,
                input.bytes.len() as u64,
                input.filename.clone(),
                input.content_type.clone(),
            );
            let decision = policy.decide(&ctx);
            println!("{}", serde_json::to_string_pretty(&decision)?);
            Ok(0)
        }

        Command::Optimize { image, policy } => {
            let policy = load_policy(policy.as_deref(), &config)?;
            let input = read_input(&image)?;
            let storage = LocalStorage::from_config(&config.storage);
            let manifest = optimize(&input, policy.as_ref(), &RasterEngine::default(), &storage)
                .await?;
            println!("{}", manifest.to_json_pretty()?);
            Ok(0)
        }

        Command::ServeFile {
            request,
            if_none_match,
            output,
        } => {
            let service = JitService::new(
                config.jit.clone(),
                Arc::new(RasterEngine::default()),
                Arc::new(FsSource::from_config(&config.source)),
                Arc::new(MemoryCache::new(&config.cache)),
            );
            let mut request = JitRequest::new(request);
            if let Some(etag) = if_none_match {
                request = request.with_if_none_match(etag);
            }

            let response = service.handle(&request).await;
            println!("{}", response.status);
            for (name, value) in &response.headers {
                println!("{}: {}", name, value);
            }
            match output {
                Some(path) => std::fs::write(&path, &response.body)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None if response.status >= 400 => {
                    println!();
                    println!("{}", String::from_utf8_lossy(&response.body));
                }
                None => {}
            }
            Ok(if response.status < 400 { 0 } else { 1 })
        }
    }
}

fn resolve_secret(flag: Option<String>, config: &Config) -> anyhow::Result<String> {
    match flag.or_else(|| config.jit.secret().map(str::to_string)) {
        Some(secret) if !secret.is_empty() => Ok(secret),
        _ => bail!("No signing secret: pass --secret or set jit.security.secret"),
    }
}

fn load_policy(path: Option<&Path>, config: &Config) -> anyhow::Result<Box<dyn Policy>> {
    let schema = match path {
        Some(path) => Some(read_schema(path)?),
        None => config.policy.clone(),
    };
    Ok(match schema {
        Some(schema) => Box::new(compile(schema)),
        None => Box::new(default_policy()),
    })
}

fn read_schema(path: &Path) -> anyhow::Result<PolicySchema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy {}", path.display()))?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let schema = if is_json {
        PolicySchema::from_json(&text)?
    } else {
        PolicySchema::from_yaml(&text)?
    };
    Ok(schema)
}

fn read_input(path: &Path) -> anyhow::Result<EngineInput> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .context("Image path has no file name")?;
    Ok(EngineInput::new(
        filename,
        bytes,
        content_type_for_path(path),
    ))
}
