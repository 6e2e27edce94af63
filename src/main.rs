//! Cloud Watcher headless console adapter.
//! Drives the dashboard controller from a terminal: summary, scan, advisor.
//!
//! Usage: `cloud-watcher [status | scan | saved | ask <question...>]`

use anyhow::{bail, Result};
use cloud_watcher::{
    chat::ChatRole, telemetry, DashboardState, ImpactLevel, NewsItem, ScanPhase, TriggerOutcome,
};

enum Command {
    Status,
    Scan,
    Saved,
    Ask(String),
}

fn parse_args() -> Result<Command> {
    let mut args = std::env::args().skip(1);
    let cmd = match args.next().as_deref() {
        None | Some("status") => Command::Status,
        Some("scan") => Command::Scan,
        Some("saved") => Command::Saved,
        Some("ask") => Command::Ask(args.collect::<Vec<_>>().join(" ")),
        Some(other) => bail!("unknown command {other:?}; expected status | scan | saved | ask"),
    };
    Ok(cmd)
}

fn print_item(item: &NewsItem, dash: &DashboardState) {
    let marker = if item.is_saved { "*" } else { " " };
    let impact = match item.impact_level {
        ImpactLevel::Critical => "!!!",
        ImpactLevel::Major => "!! ",
        ImpactLevel::Minor => "!  ",
    };
    println!(
        "{marker} {impact} [{:<5}] {:<12} {}  ({})",
        item.provider,
        item.category,
        item.title,
        dash.clock().article_time(item.created_at)
    );
}

fn print_summary(dash: &DashboardState) {
    let view = dash.snapshot();
    println!(
        "last scan {}  |  last article {}  |  {} items, {} critical",
        view.timestamps.last_scan,
        view.timestamps.last_article,
        view.stats.total_news.max(view.news.len() as u64),
        view.stats.critical_news
    );
    let cats: Vec<_> = dash.unique_categories().into_iter().collect();
    if !cats.is_empty() {
        println!("categories: {}", cats.join(", "));
    }
    for item in dash.filtered_news().iter().take(20) {
        print_item(item, dash);
    }
}

async fn follow_scan(dash: &DashboardState) {
    let mut phases = dash.monitor().subscribe();
    let mut last_progress = None;
    while dash.monitor().phase().is_active() {
        let progress = dash.monitor().progress();
        if last_progress != Some(progress) {
            eprintln!("scanning… {progress}%");
            last_progress = Some(progress);
        }
        let tick = tokio::time::sleep(dash.monitor().poll_interval());
        tokio::select! {
            _ = tick => {}
            changed = phases.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    dash.monitor().wait().await;
    match dash.monitor().phase() {
        ScanPhase::Completed if dash.has_new_data() => {
            eprintln!("scan finished: {} new items", dash.monitor().status().new_added)
        }
        ScanPhase::Completed => eprintln!("scan finished: nothing new"),
        ScanPhase::Failed => eprintln!("lost contact with the backend during the scan"),
        _ => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let command = parse_args()?;
    let dash = cloud_watcher::boot().await?;

    match command {
        Command::Status => print_summary(&dash),
        Command::Saved => {
            for item in dash.saved_news() {
                print_item(&item, &dash);
            }
        }
        Command::Scan => {
            match dash.trigger_scan().await {
                TriggerOutcome::Rejected(e) => bail!("could not start scan: {e}"),
                TriggerOutcome::Busy => eprintln!("backend already scanning; following it"),
                _ => {}
            }
            follow_scan(&dash).await;
            print_summary(&dash);
        }
        Command::Ask(question) => {
            dash.send_chat(&question).await;
            for turn in dash.chat().turns() {
                if turn.role == ChatRole::Bot {
                    println!("{}", turn.content);
                }
            }
        }
    }

    dash.shutdown();
    Ok(())
}
