use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "postbox")]
#[command(about = "Fire HTTP requests and inspect the responses", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fire a request and print the response
    Fire(FireArgs),
    /// List the aliases of a PKCS#12 keystore
    Cert(CertArgs),
}

#[derive(clap::Args, Debug)]
pub struct FireArgs {
    /// Absolute http or https URL
    pub endpoint: String,

    /// HTTP method (defaults to `request.default_method`)
    #[arg(short = 'X', long)]
    pub method: Option<String>,

    /// Content-Type header (defaults to `request.default_content_type`)
    #[arg(short = 't', long = "content-type")]
    pub content_type: Option<String>,

    /// Request body
    #[arg(short = 'd', long = "data")]
    pub payload: Option<String>,

    /// Send the body base64 encoded
    #[arg(long)]
    pub base64: bool,

    /// Basic auth user
    #[arg(short = 'u', long)]
    pub user: Option<String>,

    /// Basic auth password
    #[arg(short = 'p', long, requires = "user")]
    pub password: Option<String>,

    /// Request timeout in seconds, 0 for none (defaults to `request.default_timeout_secs`)
    #[arg(long)]
    pub timeout: Option<u32>,

    /// Proxy host; overrides the configured proxy
    #[arg(long)]
    pub proxy_host: Option<String>,

    #[arg(long, requires = "proxy_host")]
    pub proxy_port: Option<String>,

    #[arg(long, requires = "proxy_host")]
    pub proxy_user: Option<String>,

    #[arg(long, requires = "proxy_user")]
    pub proxy_password: Option<String>,

    /// PKCS#12 keystore holding the client certificate
    #[arg(long, requires = "cert_password")]
    pub cert: Option<PathBuf>,

    #[arg(long, requires = "cert")]
    pub cert_password: Option<String>,

    /// Fire the same request this many times concurrently
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub repeat: u32,

    /// Print one JSON document per response
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct CertArgs {
    /// PKCS#12 keystore file
    pub file: PathBuf,

    /// Keystore password
    #[arg(long)]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fire() {
        let cli = Cli::try_parse_from([
            "postbox",
            "fire",
            "http://example.test/x",
            "-X",
            "POST",
            "-d",
            "<a/>",
            "--base64",
            "-u",
            "alice",
            "-p",
            "pw",
            "--repeat",
            "3",
        ])
        .unwrap();

        let Commands::Fire(args) = cli.command else {
            panic!("expected fire");
        };
        assert_eq!(args.endpoint, "http://example.test/x");
        assert_eq!(args.method.as_deref(), Some("POST"));
        assert_eq!(args.payload.as_deref(), Some("<a/>"));
        assert!(args.base64);
        assert_eq!(args.repeat, 3);
        assert!(args.content_type.is_none());
    }

    #[test]
    fn test_cert_password_required_with_cert() {
        let result = Cli::try_parse_from([
            "postbox",
            "fire",
            "http://example.test/",
            "--cert",
            "client.p12",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_repeat_must_be_positive() {
        let result =
            Cli::try_parse_from(["postbox", "fire", "http://example.test/", "--repeat", "0"]);
        assert!(result.is_err());
    }
}
