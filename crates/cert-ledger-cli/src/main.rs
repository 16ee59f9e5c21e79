use anyhow::{bail, Result};
use cert_ledger_core::{
    constants::DEFAULT_RECENT_BLOCKS,
    ledger::{BlockSummary, HistoryEntry},
    ChainStatus, Receipt, Verification,
};
use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "cert-ledger-cli")]
#[command(about = "CLI client for the certificate ledger node")]
struct Cli {
    /// Node base URL (e.g. http://127.0.0.1:8080)
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    node: String,

    /// Print the raw JSON response instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Issue a certificate
    Issue {
        #[arg(long)]
        cert_id: String,
        #[arg(long)]
        student_name: String,
        #[arg(long)]
        program: String,
        /// Issue date, YYYY-MM-DD
        #[arg(long)]
        issued_on: String,
        /// University or department
        #[arg(long)]
        issuer: String,
    },
    /// Revoke an issued certificate
    Revoke {
        #[arg(long)]
        cert_id: String,
        /// Issuer confirming the revocation
        #[arg(long)]
        issuer: String,
        /// Reason for the revocation
        #[arg(long, default_value = "")]
        remarks: String,
    },
    /// Show the latest state of a certificate and check its block
    Verify {
        #[arg(long)]
        cert_id: String,
    },
    /// Every event recorded for a certificate
    History {
        #[arg(long)]
        cert_id: String,
    },
    /// Chain length and validity
    Status,
    /// List the most recent blocks
    List {
        #[arg(short, long, default_value_t = DEFAULT_RECENT_BLOCKS)]
        n: usize,
    },
}

#[derive(Serialize)]
struct IssueOut<'a> {
    cert_id: &'a str,
    student_name: &'a str,
    program: &'a str,
    issued_on: &'a str,
    issuer: &'a str,
}

#[derive(Serialize)]
struct RevokeOut<'a> {
    issuer: &'a str,
    remarks: &'a str,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Send the request and decode a success body, or turn the node's `{error}` body into an error.
async fn call<T: DeserializeOwned>(req: RequestBuilder, raw: bool) -> Result<Option<T>> {
    let res = req.send().await?;
    let status = res.status();
    let body = res.text().await?;
    debug!(%status, "node responded");
    if !status.is_success() {
        let reason = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        bail!("[X] {reason} ({status})");
    }
    if raw {
        let value: serde_json::Value = serde_json::from_str(&body)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&body)?))
}

fn cert_url(node: &str, cert_id: &str, suffix: &str) -> String {
    format!("{node}/certificates/{}{suffix}", urlencoding::encode(cert_id))
}

fn render_issued(r: &Receipt) -> String {
    format!("[✓] Issued {} in block #{} (hash {}).", r.cert_id, r.index, r.hash)
}

fn render_revoked(r: &Receipt) -> String {
    format!("[✓] Revoked {} in block #{}.", r.cert_id, r.index)
}

fn render_verification(v: &Verification) -> String {
    format!(
        "[INFO] {}: status={} (issuer={}). VALID LINK={}, POW={}.",
        v.cert_id, v.status, v.issuer, v.link_valid, v.pow_valid
    )
}

fn render_status(s: &ChainStatus) -> String {
    format!("Blocks: {} | Valid: {}", s.blocks, s.valid)
}

fn render_block(b: &BlockSummary) -> String {
    let mut out = format!(
        "#{} ts={} prev[:8]={} nonce={}\n   type={}",
        b.index, b.timestamp, b.prev_hash, b.nonce, b.kind
    );
    if let Some(c) = &b.certificate {
        out.push_str(&format!(
            "\n   cert_id={} status={} student={}",
            c.cert_id, c.status, c.student_name
        ));
    }
    out
}

fn render_history(entries: &[HistoryEntry]) -> String {
    entries
        .iter()
        .map(|e| {
            let c = &e.certificate;
            let mut line = format!("#{} {} issuer={}", e.index, c.status, c.issuer);
            if !c.remarks.is_empty() {
                line.push_str(&format!(" remarks={}", c.remarks));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .pretty()
        .init();

    let cli = Cli::parse();
    let node = cli.node.trim_end_matches('/').to_string();
    let raw = cli.json;
    let client = Client::new();

    match cli.cmd {
        Command::Issue {
            cert_id,
            student_name,
            program,
            issued_on,
            issuer,
        } => {
            let body = IssueOut {
                cert_id: &cert_id,
                student_name: &student_name,
                program: &program,
                issued_on: &issued_on,
                issuer: &issuer,
            };
            let req = client.post(format!("{node}/certificates")).json(&body);
            if let Some(r) = call::<Receipt>(req, raw).await? {
                println!("{}", render_issued(&r));
            }
        }
        Command::Revoke {
            cert_id,
            issuer,
            remarks,
        } => {
            let body = RevokeOut {
                issuer: &issuer,
                remarks: &remarks,
            };
            let req = client.post(cert_url(&node, &cert_id, "/revoke")).json(&body);
            if let Some(r) = call::<Receipt>(req, raw).await? {
                println!("{}", render_revoked(&r));
            }
        }
        Command::Verify { cert_id } => {
            let req = client.get(cert_url(&node, &cert_id, ""));
            if let Some(v) = call::<Verification>(req, raw).await? {
                println!("{}", render_verification(&v));
            }
        }
        Command::History { cert_id } => {
            let req = client.get(cert_url(&node, &cert_id, "/history"));
            if let Some(h) = call::<Vec<HistoryEntry>>(req, raw).await? {
                println!("{}", render_history(&h));
            }
        }
        Command::Status => {
            let req = client.get(format!("{node}/chain/status"));
            if let Some(s) = call::<ChainStatus>(req, raw).await? {
                println!("{}", render_status(&s));
            }
        }
        Command::List { n } => {
            let req = client
                .get(format!("{node}/chain/blocks"))
                .query(&[("n", n)]);
            if let Some(rows) = call::<Vec<BlockSummary>>(req, raw).await? {
                for row in &rows {
                    println!("{}", render_block(row));
                }
            }
        }
    }
    Ok(())
}
