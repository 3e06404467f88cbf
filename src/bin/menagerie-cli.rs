use clap::{Parser, Subcommand, ValueEnum};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "menagerie-cli")]
#[command(about = "Management CLI for the menagerie record service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(short, long, env = "MENAGERIE_CREDENTIAL")]
    key: String,

    /// Header carrying the credential.
    #[arg(long, default_value = "authorization")]
    header: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Person,
    Animal,
}

impl Kind {
    fn segment(self) -> &'static str {
        match self {
            Kind::Person => "person",
            Kind::Animal => "animal",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one record as JSON
    Get { kind: Kind, id: String },
    /// Create a record from a JSON object
    Create { kind: Kind, body: String },
    /// Replace (or create) the record under an id
    Replace { kind: Kind, id: String, body: String },
    /// Change editable fields of an existing record
    Patch { kind: Kind, id: String, body: String },
    /// Delete a record
    Delete { kind: Kind, id: String },
    /// Copy a record under a fresh id
    Clone { kind: Kind, id: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(HeaderName::from_bytes(cli.header.as_bytes())?, HeaderValue::from_str(&cli.key)?);

    let base = cli.url.trim_end_matches('/');
    let request = match cli.command {
        Commands::Get { kind, id } => client.get(format!("{base}/{}/{id}", kind.segment())),
        Commands::Create { kind, body } => client
            .post(format!("{base}/{}/", kind.segment()))
            .json(&parse_body(&body)?),
        Commands::Replace { kind, id, body } => client
            .put(format!("{base}/{}/{id}", kind.segment()))
            .json(&parse_body(&body)?),
        Commands::Patch { kind, id, body } => client
            .patch(format!("{base}/{}/{id}", kind.segment()))
            .json(&parse_body(&body)?),
        Commands::Delete { kind, id } => client.delete(format!("{base}/{}/{id}", kind.segment())),
        Commands::Clone { kind, id } => client.post(format!("{base}/{}/{id}/clone", kind.segment())),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

fn parse_body(raw: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let value: Value = serde_json::from_str(raw)?;
    if !value.is_object() {
        return Err("body must be a JSON object".into());
    }
    Ok(value)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: service returned status {} (request {})", status, request_id);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if text.is_empty() => println!("{}", status),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
