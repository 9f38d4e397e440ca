//! Compute the signature for a remote image URL.

use clap::Parser;
use url::Url;

use imageproxy::config::loader::load_signature_key;
use imageproxy::imaging::Options;
use imageproxy::security::signature::sign;

#[derive(Parser)]
#[command(name = "sign-url")]
#[command(about = "Sign a remote image URL for the image proxy", long_about = None)]
struct Cli {
    /// Remote image URL to sign.
    url: Url,

    /// Signing key; prefix with "@" to read from a file.
    #[arg(short, long, env = "IMAGEPROXY_SIGNATURE_KEY")]
    key: String,

    /// Transformation options to include in the printed proxy URL.
    #[arg(short, long, default_value = "")]
    options: String,

    /// Proxy base URL; when given, a complete proxy URL is printed.
    #[arg(short, long)]
    proxy: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let key = load_signature_key(Some(&cli.key))?;
    let signature = sign(&key, &cli.url);

    match cli.proxy {
        Some(proxy) => {
            let mut options = Options::parse(&cli.options);
            options.signature = signature;
            println!("{}/{}/{}", proxy.trim_end_matches('/'), options, cli.url);
        }
        None => println!("{}", signature),
    }

    Ok(())
}
