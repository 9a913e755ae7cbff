use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crmkpi::import::{read_records, ImportOutcome};
use crmkpi::metrics::{self, TrendOptions};
use crmkpi::{ActivityLog, CrmKpi, FinanceEntry, PipelineItem, WindowSpec};

#[derive(Parser)]
#[command(name = "crmkpi", about = "Sales CRM reporting and KPI analytics")]
struct Cli {
    /// Database path (default: ~/.crmkpi/crmkpi.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every report command.
#[derive(Args)]
struct ReportArgs {
    /// Only include records for this BDR
    #[arg(long)]
    bdr: Option<String>,
    /// Reference instant as RFC 3339 (default: now)
    #[arg(long)]
    now: Option<String>,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show record counts
    Status,
    /// Load a JSON array of records exported from the CRM
    Import {
        #[arg(value_enum)]
        kind: ImportKind,
        /// Path to the JSON file
        file: String,
        /// Delete existing records of this kind first
        #[arg(long)]
        replace: bool,
    },
    /// Manage configuration (targets live under `targets.*`)
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// KPI counts against targets
    Kpis {
        /// Evaluation window: today, week, mtd, last-week, 30d, ...
        #[arg(long, default_value = "week")]
        window: String,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// BDR rankings and team benchmarks
    Team {
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Conversion funnel from calls to sales
    Funnel {
        /// Window for the activity stages
        #[arg(long, default_value = "month")]
        window: String,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Rolling quarterly and monthly series
    Trends {
        #[arg(long, default_value = "4")]
        quarters: u32,
        #[arg(long, default_value = "12")]
        months: u32,
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Revenue totals
    Finance {
        #[command(flatten)]
        report: ReportArgs,
    },
    /// Every report at once
    Dashboard {
        #[arg(long, default_value = "week")]
        window: String,
        #[command(flatten)]
        report: ReportArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ImportKind {
    Pipeline,
    Activity,
    Finance,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// List all config values
    List,
}

fn parse_now(now: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match now {
        Some(s) => Ok(DateTime::parse_from_rfc3339(s)
            .map_err(|e| anyhow::anyhow!("invalid --now {s:?}: {e}"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => crmkpi::Database::open_at(path).await?,
        None => crmkpi::Database::open().await?,
    };
    let app = CrmKpi::new(db);

    match cli.command {
        Commands::Status => {
            let counts = app.record_counts().await?;
            println!("Store Status");
            println!("  Pipeline items:  {}", counts.pipeline_items);
            println!("  Activity logs:   {}", counts.activity_logs);
            println!("  Finance entries: {}", counts.finance_entries);
        }
        Commands::Import {
            kind,
            file,
            replace,
        } => {
            handle_import(&app, kind, &file, replace).await?;
        }
        Commands::Config { action } => {
            handle_config(&app, action).await?;
        }
        Commands::Kpis { window, report } => {
            let window = WindowSpec::parse(&window)?;
            let now = parse_now(report.now.as_deref())?;
            let snap = app.snapshot(report.bdr.as_deref()).await?;
            let targets = app.targets().await?;
            let kpis = metrics::calculate_kpis(
                &snap.pipeline_items,
                &snap.activity_logs,
                &targets,
                now,
                &window,
            );
            if report.json {
                println!("{}", serde_json::to_string_pretty(&kpis)?);
            } else {
                print_kpis(&kpis);
            }
        }
        Commands::Team { report } => {
            let snap = app.snapshot(report.bdr.as_deref()).await?;
            let team = metrics::calculate_team_performance(
                &snap.pipeline_items,
                &snap.activity_logs,
                &snap.finance_entries,
            );
            if report.json {
                println!("{}", serde_json::to_string_pretty(&team)?);
            } else {
                print_team(&team);
            }
        }
        Commands::Funnel { window, report } => {
            let window = WindowSpec::parse(&window)?;
            let now = parse_now(report.now.as_deref())?;
            let snap = app.snapshot(report.bdr.as_deref()).await?;
            let health = metrics::assess_pipeline_health_in(
                &snap.pipeline_items,
                &snap.activity_logs,
                now,
                &snap.finance_entries,
                &window,
            );
            if report.json {
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                print_pipeline_health(&health);
            }
        }
        Commands::Trends {
            quarters,
            months,
            report,
        } => {
            let options = TrendOptions::new(quarters, months)?;
            let now = parse_now(report.now.as_deref())?;
            let snap = app.snapshot(report.bdr.as_deref()).await?;
            let trends = metrics::calculate_trends_with(
                &snap.pipeline_items,
                &snap.activity_logs,
                now,
                &snap.finance_entries,
                &options,
            );
            if report.json {
                println!("{}", serde_json::to_string_pretty(&trends)?);
            } else {
                print_trends(&trends);
            }
        }
        Commands::Finance { report } => {
            let now = parse_now(report.now.as_deref())?;
            let snap = app.snapshot(report.bdr.as_deref()).await?;
            let summary = metrics::calculate_financial_summary(
                &snap.pipeline_items,
                &snap.activity_logs,
                now,
                &snap.finance_entries,
            );
            if report.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_financial_summary(&summary);
            }
        }
        Commands::Dashboard { window, report } => {
            let window = WindowSpec::parse(&window)?;
            let now = parse_now(report.now.as_deref())?;
            let d = app.dashboard(report.bdr.as_deref(), now, &window).await?;
            if report.json {
                println!("{}", serde_json::to_string_pretty(&d)?);
            } else {
                println!("Dashboard as of {}", d.now.to_rfc3339());
                print_kpis(&d.kpis);
                print_team(&d.team_performance);
                print_pipeline_health(&d.pipeline_health);
                print_trends(&d.trends);
                print_financial_summary(&d.financial_summary);
            }
        }
    }

    Ok(())
}

async fn handle_import(
    app: &CrmKpi,
    kind: ImportKind,
    file: &str,
    replace: bool,
) -> anyhow::Result<()> {
    let (label, inserted, skipped) = match kind {
        ImportKind::Pipeline => {
            let ImportOutcome { records, skipped } = read_records::<PipelineItem>(file)?;
            let n = app.import_pipeline_items(records, replace).await?;
            ("pipeline items", n, skipped)
        }
        ImportKind::Activity => {
            let ImportOutcome { records, skipped } = read_records::<ActivityLog>(file)?;
            let n = app.import_activity_logs(records, replace).await?;
            ("activity logs", n, skipped)
        }
        ImportKind::Finance => {
            let ImportOutcome { records, skipped } = read_records::<FinanceEntry>(file)?;
            let n = app.import_finance_entries(records, replace).await?;
            ("finance entries", n, skipped)
        }
    };
    println!("Imported {inserted} {label}");
    if skipped > 0 {
        eprintln!("  Skipped {skipped} malformed records (run with -v for details)");
    }
    Ok(())
}

async fn handle_config(app: &CrmKpi, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => match app.config_get(&key).await? {
            Some(v) => println!("{key} = {v}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            app.config_set(&key, &value).await?;
            println!("Config updated.");
        }
        ConfigAction::List => {
            let items = app.config_list().await?;
            if items.is_empty() {
                println!("No config values set.");
            }
            for (k, v) in items {
                println!("{k} = {v}");
            }
        }
    }
    Ok(())
}

fn print_kpi(label: &str, k: &metrics::KpiResult) {
    println!(
        "    {label:<20} {:>5} / {:<7} {:>6.1}%  {:?}",
        k.current,
        k.target,
        k.attainment * 100.0,
        k.status
    );
}

fn print_kpis(r: &metrics::KpiReport) {
    println!(
        "  KPIs ({} .. {}):",
        r.window.start.format("%Y-%m-%d"),
        r.window.end.format("%Y-%m-%d")
    );
    print_kpi("Steady call volume", &r.steady_call_volume);
    print_kpi("Agreements sent", &r.agreement_rate);
    print_kpi("Lists out", &r.lists_out);
}

fn print_team(t: &metrics::TeamPerformanceResult) {
    println!("  Team Performance:");
    if t.rankings.is_empty() {
        println!("    No finance entries");
        return;
    }
    for p in &t.rankings {
        println!(
            "    {:>2}. {:<20} {:>4} sales  £{:>12.2}  {:>4} calls",
            p.rank, p.bdr, p.sales_count, p.revenue, p.calls
        );
    }
    println!("    Top performers: {}", t.top_performers.join(", "));
    println!("    Needs support:  {}", t.needs_support.join(", "));
    let b = &t.benchmark_metrics;
    println!("    Conversion:     {:.1}%", b.team_conversion_rate * 100.0);
    println!("    Avg deal size:  £{:.2}", b.average_deal_size);
}

fn print_pipeline_health(h: &metrics::PipelineHealthResult) {
    let f = &h.conversion_funnel;
    println!(
        "  Funnel ({} .. {}):",
        h.window.start.format("%Y-%m-%d"),
        h.window.end.format("%Y-%m-%d")
    );
    println!("    Calls:      {}", f.calls_conducted);
    println!("    Proposals:  {}", f.proposals_sent);
    println!("    Agreements: {}", f.agreements_signed);
    println!("    Lists:      {}", f.lists_sent);
    println!("    Sales:      {}", f.sales_generated);
    println!("    Overall:    {:.1}%", h.overall_conversion_rate * 100.0);
    if !h.open_deals_by_status.is_empty() {
        println!("    Open deals:");
        for (status, n) in &h.open_deals_by_status {
            println!("      {status:<12} {n}");
        }
    }
    if h.unknown_activity_count > 0 {
        println!("    Unrecognised activity: {}", h.unknown_activity_count);
    }
}

fn print_trends(t: &metrics::TrendResult) {
    println!("  Quarterly:");
    for q in &t.quarterly_lists_out {
        println!(
            "    {}  {:>4} lists  {:>4} sales  £{:>12.2}",
            q.quarter, q.lists, q.sales, q.revenue
        );
    }
    println!("  Monthly:");
    for m in &t.monthly {
        println!(
            "    {}  {:>4} calls  {:>4} lists  {:>4} sales  £{:>12.2}",
            m.month, m.calls, m.lists, m.sales, m.revenue
        );
    }
}

fn print_financial_summary(s: &metrics::FinancialSummaryResult) {
    println!("  Revenue:");
    println!("    Total:          £{:.2}", s.total_revenue);
    println!("    This month:     £{:.2}", s.monthly_revenue);
    println!("    Previous month: £{:.2}", s.previous_month_revenue);
    match s.month_over_month_change {
        Some(change) => println!("    Month change:   {:+.1}%", change * 100.0),
        None => println!("    Month change:   n/a"),
    }
    println!("    This quarter:   £{:.2}", s.quarterly_revenue);
    println!("    Year to date:   £{:.2}", s.year_to_date_revenue);
    println!("    Sales:          {}", s.sales_count);
    println!("    Avg deal size:  £{:.2}", s.average_deal_size);
}
