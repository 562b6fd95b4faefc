use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "subconverter-ctl")]
#[command(about = "Administrative client for the subconverter backend", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:25500")]
    url: String,

    /// Access token, sent as the `token` query argument.
    #[arg(short, long, default_value = "")]
    token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the backend banner
    Version,
    /// Re-fetch every ruleset
    Refresh,
    /// Reload the preference file
    Readconf,
    /// Replace the preference file and reload
    Update {
        #[arg(long = "type", value_enum, default_value_t = Encoding::Direct)]
        kind: Encoding,
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Encoding {
    Form,
    Direct,
}

impl Encoding {
    fn as_str(self) -> &'static str {
        match self {
            Encoding::Form => "form",
            Encoding::Direct => "direct",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');
    let token = [("token", cli.token.as_str())];

    let res = match cli.command {
        Commands::Version => client.get(format!("{base}/version")).send().await?,
        Commands::Refresh => {
            client
                .get(format!("{base}/refreshrules"))
                .query(&token)
                .send()
                .await?
        }
        Commands::Readconf => {
            client
                .get(format!("{base}/readconf"))
                .query(&token)
                .send()
                .await?
        }
        Commands::Update { kind, file } => {
            let body = tokio::fs::read(&file).await?;
            client
                .post(format!("{base}/updateconf"))
                .query(&token)
                .query(&[("type", kind.as_str())])
                .body(body)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: backend returned status {}", status);
        eprint!("{}", text);
        std::process::exit(1);
    }
    print!("{}", text);
    Ok(())
}
