//! Thin per-method CLI front end over the library's constructor and
//! `perform()`/`cancel()` surface.

use clap::{Parser, Subcommand};
use reqflow::{Body, BodyEncoding, HttpRequest, Method, RequestConfigBuilder};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reqflow", about = "One-shot HTTP/HTTPS client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Get(RequestArgs),
    Post(RequestArgs),
    Put(RequestArgs),
    Delete(RequestArgs),
    Patch(RequestArgs),
    Head(RequestArgs),
}

#[derive(clap::Args)]
struct RequestArgs {
    url: String,

    #[arg(long = "header", short = 'H', value_name = "NAME:VALUE")]
    headers: Vec<String>,

    #[arg(long, value_name = "MS")]
    timeout: Option<u64>,

    #[arg(long)]
    body: Option<String>,

    #[arg(long, default_value = "utf8")]
    body_encoding: String,

    #[arg(long)]
    no_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let (method, args) = match cli.command {
        Command::Get(a) => (Method::Get, a),
        Command::Post(a) => (Method::Post, a),
        Command::Put(a) => (Method::Put, a),
        Command::Delete(a) => (Method::Delete, a),
        Command::Patch(a) => (Method::Patch, a),
        Command::Head(a) => (Method::Head, a),
    };

    let mut builder = RequestConfigBuilder::new(args.url.as_str()).method(method);

    for header in &args.headers {
        let Some((name, value)) = header.split_once(':') else {
            anyhow::bail!("invalid --header {header:?}, expected NAME:VALUE");
        };
        builder = builder.header(name.trim(), value.trim());
    }

    if let Some(timeout_ms) = args.timeout {
        builder = builder.timeout_ms(timeout_ms);
    }

    if let Some(body) = args.body {
        let encoding = BodyEncoding::parse(&args.body_encoding)?;
        builder = builder.body(Body::Text(body, encoding)).body_encoding(encoding);
    }

    if args.no_json {
        builder = builder.auto_json_response_parse(false);
    }

    let config = builder.build()?;
    let request = HttpRequest::new(config);

    let response = request.perform()?.await?;

    println!("{} {}", response.status_code, response.status_message);
    for (name, value) in response.headers.iter() {
        println!("{name}: {value}");
    }
    match response.body {
        Some(reqflow::ResponseBody::Json(value)) => println!("\n{}", serde_json::to_string_pretty(&value)?),
        Some(reqflow::ResponseBody::Bytes(bytes)) => {
            println!();
            match std::str::from_utf8(&bytes) {
                Ok(text) => println!("{text}"),
                Err(_) => println!("<{} bytes of binary body>", bytes.len()),
            }
        }
        None => {}
    }

    Ok(())
}
