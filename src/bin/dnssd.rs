//! Command-line front end: publish a record, query a name, or browse for a
//! service on the local link.
//!
//! ```text
//! dnssd --publish "foo.local. 3600 A 10.10.10.10"
//! dnssd --query foo.local. --num 1
//! dnssd --service _http._tcp.local.
//! ```

use clap::Parser;
use dnssd::sd;

#[derive(Parser, Debug)]
#[command(name = "dnssd")]
#[command(about = "mDNS / DNS-SD publisher and query tool")]
struct Args {
    /// Record name to query.
    #[arg(long)]
    query: Option<String>,

    /// Service name to discover (e.g. _http._tcp.local.).
    #[arg(long)]
    service: Option<String>,

    /// Number of records to wait for. 0 for infinite.
    #[arg(long, default_value = "0")]
    num: usize,

    /// Record to publish (e.g. "foo.local. 3600 A 1.2.3.4").
    #[arg(long)]
    publish: Option<String>,
}

#[tokio::main]
async fn main() -> dnssd::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Some(line) = &args.publish {
        dnssd::publish_from_text(line)?;
    }

    if let Some(name) = &args.query {
        let mut q = dnssd::query(name)?;
        let mut count = 0;
        while let Some(rr) = q.recv().await {
            println!("{rr}");
            count += 1;
            if args.num != 0 && count >= args.num {
                q.done();
                break;
            }
        }
    }

    if let Some(service) = &args.service {
        let mut browse = sd::discover(
            service,
            sd::DiscoverOpts {
                dedup: true,
                ..Default::default()
            },
        )?;
        let mut count = 0;
        while let Some(s) = browse.recv().await {
            println!("{}\t{}:{}", s.name, s.ip, s.port);
            count += 1;
            if args.num != 0 && count >= args.num {
                browse.done();
                break;
            }
        }
    }

    if args.publish.is_some() {
        // Keep answering questions until interrupted.
        std::future::pending::<()>().await;
    }

    Ok(())
}
