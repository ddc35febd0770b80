use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use rewrite_proxy::config::{load_config, CodecConfig};
use rewrite_proxy::rewrite::{interceptor, links};
use rewrite_proxy::routing::ResolveMode;
use rewrite_proxy::{resolve, EncodingScheme, Origin, OriginCodec};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Token and link tooling for the rewriting proxy", long_about = None)]
struct Cli {
    /// Read the codec section from this config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the encoding scheme.
    #[arg(short, long, global = true, value_enum)]
    scheme: Option<SchemeArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemeArg {
    XorHex,
    Base64,
}

impl From<SchemeArg> for EncodingScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::XorHex => EncodingScheme::XorHex,
            SchemeArg::Base64 => EncodingScheme::Base64,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Encode an origin (or, with --full, any URL) into a token
    Encode {
        input: String,
        #[arg(long)]
        full: bool,
    },
    /// Decode a token
    Decode {
        token: String,
        #[arg(long)]
        full: bool,
    },
    /// Print the proxy link for an absolute URL
    Link { url: String },
    /// Resolve a proxy path (with optional query) to its upstream target
    Resolve { path: String },
    /// Print the generated interceptor script
    Interceptor,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut codec_config = match &cli.config {
        Some(path) => load_config(path)?.codec,
        None => CodecConfig::default(),
    };
    if let Some(scheme) = cli.scheme {
        codec_config.scheme = scheme.into();
    }
    let codec = codec_config.build();

    match cli.command {
        Commands::Encode { input, full } => {
            let token = if full {
                codec.encode_str(&input)
            } else {
                codec.encode(&Origin::parse(&input)?)
            };
            println!("{token}");
        }
        Commands::Decode { token, full } => {
            if full {
                println!("{}", codec.decode_str(&token)?);
            } else {
                println!("{}", codec.decode(&token)?);
            }
        }
        Commands::Link { url } => match links::proxy_link(&codec, &url) {
            Some(link) => println!("{link}"),
            None => return Err(format!("not an absolute http(s) URL: {url}").into()),
        },
        Commands::Resolve { path } => print_resolution(&codec, &path)?,
        Commands::Interceptor => println!("{}", interceptor::render(&codec)),
    }

    Ok(())
}

fn print_resolution(codec: &OriginCodec, raw: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (path, query) = match raw.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (raw, None),
    };
    let target = resolve(codec, path, query)?;
    let mode = match target.mode {
        ResolveMode::OriginPath => "origin_path",
        ResolveMode::FullUrl => "full_url",
    };
    let out = json!({
        "url": target.url.as_str(),
        "origin": target.origin.to_string(),
        "encoded_origin": target.encoded_origin,
        "rest_path": target.rest_path,
        "mode": mode,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
