//! Botwatch CLI
//!
//! Command-line front end for the botnet-detection service:
//! - Sign in, register, sign out
//! - Run batch detections and live monitoring
//! - Stream packets into a rolling feed
//! - Summarize the last result, inspect its metrics and logs, export reports

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use botwatch::api::{
    forms, ApiClient, ApiError, BatchRequest, DetectionResult, ModelType, MonitorReport,
    RegisterRequest,
};
use botwatch::config::{generate_default_config, Config};
use botwatch::export::{self, ReportFormat};
use botwatch::metrics::{self, DisplayAdjust, Metrics, RunSummary};
use botwatch::monitor::{MonitorParams, StreamEvent, StreamPoller, TokenStream};
use botwatch::notify::{Notice, Notifier, PreferenceGate, TerminalNotifier};
use botwatch::session::{LocalStore, SessionContext, Theme};

#[derive(Parser)]
#[command(name = "botwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Botnet detection from the command line")]
#[command(long_about = "Botwatch talks to a botnet-detection service.\nRun batch detections, watch live traffic, and export reports of the last result.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Detection API URL (overrides config)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Config file (default: ~/.config/botwatch/config.toml or ./botwatch.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the access token
    Login {
        email: String,
        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account
    Register {
        email: String,
        username: String,
        /// Password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the stored token
    Logout,

    /// Show the signed-in user and preferences
    Whoami,

    /// Show, set or toggle the color theme
    Theme {
        /// dark or light; toggles when omitted
        theme: Option<Theme>,
    },

    /// Run a batch detection
    Detect {
        /// Number of samples (1-50)
        #[arg(short = 'n', long)]
        samples: Option<u32>,
        /// Model (lstm, gcn, ensemble)
        #[arg(short, long)]
        model: Option<ModelType>,
        /// Draw samples without balancing classes
        #[arg(long)]
        unbalanced: bool,
    },

    /// Run a timed live-monitoring session on the server
    Monitor {
        /// Duration in seconds (10-300)
        #[arg(short, long)]
        duration: Option<u32>,
        /// Seconds between samples (0.5-10)
        #[arg(short, long)]
        interval: Option<f64>,
        /// Alert threshold (0.5-1.0)
        #[arg(short, long)]
        threshold: Option<f64>,
    },

    /// Poll single packets into a rolling feed until Ctrl-C
    Stream {
        /// Stop after this many packets
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },

    /// Dataset information and samples
    Samples {
        #[command(subcommand)]
        command: SamplesCommand,
    },

    /// Last detection at a glance
    Summary,

    /// Metrics of the last detection
    Metrics,

    /// Per-sample log of the last detection
    Logs,

    /// Export the last detection result
    Report {
        /// json or csv
        format: ReportFormat,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },

    /// Show or change alert preferences
    Settings {
        /// Ask the server to email alerts during monitoring
        #[arg(long)]
        email_alerts: Option<bool>,
        /// Show notices for detection outcomes
        #[arg(long)]
        notifications: Option<bool>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum SamplesCommand {
    /// Dataset metadata
    Info,
    /// Random raw rows
    Random {
        #[arg(short = 'n', long, default_value = "10")]
        count: u32,
        #[arg(long)]
        unbalanced: bool,
        /// Only rows containing this text
        #[arg(short, long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        if e.downcast_ref::<ApiError>().is_some_and(ApiError::needs_login) {
            eprintln!("Run `botwatch login <email>` to sign in again.");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }

    if let Err(e) = botwatch::init_logging(&config.logging) {
        eprintln!("Warning: {}", e);
    }

    let store = LocalStore::open(&config.session.state_file)
        .with_context(|| format!("Cannot open state file {}", config.session.state_file))?;
    let mut ctx = SessionContext::load(store);
    let client = ApiClient::new(&config.api)?;
    let json = cli.format == "json";

    match cli.command {
        Commands::Login { email, password } => {
            let password = read_password(password)?;
            let login = client.login(&email, &password).await?;
            ctx.sign_in(&email, &login.access_token)?;
            println!("Signed in as {}", email);
        }

        Commands::Register {
            email,
            username,
            password,
        } => {
            let password = read_password(password)?;
            let strength = forms::strength_label(forms::password_strength(&password));
            let request = RegisterRequest {
                email,
                username,
                password,
            };
            let created = client.register(&request).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&created)?);
            } else {
                println!("Account created for {} (password strength: {})", request.email, strength);
                println!("Sign in with: botwatch login {}", request.email);
            }
        }

        Commands::Logout => {
            ctx.sign_out()?;
            println!("Signed out");
        }

        Commands::Whoami => {
            let prefs = ctx.preferences();
            if json {
                let body = serde_json::json!({
                    "email": ctx.user_email(),
                    "authenticated": ctx.is_authenticated(),
                    "theme": ctx.theme(),
                    "email_alerts": prefs.email_alerts,
                    "notifications": prefs.notifications,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                match ctx.user_email() {
                    Some(email) if ctx.is_authenticated() => println!("Signed in as {}", email),
                    _ => println!("Not signed in"),
                }
                println!("Theme: {}", ctx.theme());
                println!("Email alerts: {}", on_off(prefs.email_alerts));
                println!("Notifications: {}", on_off(prefs.notifications));
            }
        }

        Commands::Theme { theme } => {
            let theme = match theme {
                Some(theme) => {
                    ctx.set_theme(theme)?;
                    theme
                }
                None => ctx.toggle_theme()?,
            };
            println!("Theme: {}", theme);
        }

        Commands::Detect {
            samples,
            model,
            unbalanced,
        } => {
            let model = match model {
                Some(model) => model,
                None => config.detection.model.parse()?,
            };
            let mut request = BatchRequest::new(samples.unwrap_or(config.detection.samples), model);
            request.balanced = config.detection.balanced && !unbalanced;

            let result = client.run_batch_detection(ctx.token(), &request).await?;
            ctx.record_detection(&result)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_detection(&result, display_adjust(&config, &result));
            }

            notifier(&ctx).notify(&Notice::detection(&result.summary));
        }

        Commands::Monitor {
            duration,
            interval,
            threshold,
        } => {
            let mut params = MonitorParams::from(&config.monitor);
            if let Some(duration) = duration {
                params.duration = duration;
            }
            if let Some(interval) = interval {
                params.interval = interval;
            }
            if let Some(threshold) = threshold {
                params.alert_threshold = threshold;
            }
            let params = params.effective(ctx.preferences().email_alerts);
            params.validate()?;

            if !json {
                println!(
                    "Monitoring for {}s, one sample every {}s (about {} samples)...",
                    params.duration,
                    params.interval,
                    params.expected_samples()
                );
            }

            let report = client.start_monitoring(ctx.token(), &params).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_monitor_report(&report);
            }

            notifier(&ctx).notify(&Notice::monitoring(&report.summary));
        }

        Commands::Stream { count } => {
            stream(&config, client, &ctx, count, json).await?;
        }

        Commands::Samples { command } => match command {
            SamplesCommand::Info => {
                let info = client.dataset_info(ctx.token()).await?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&info)?);
                } else {
                    println!("Dataset");
                    println!("  Total samples: {}", opt(info.total_samples));
                    println!("  Features: {}", opt(info.num_features));
                    println!("  Normal samples: {}", opt(info.normal_samples));
                    println!("  Botnet samples: {}", opt(info.botnet_samples));
                    if let Some(pct) = info.botnet_percentage {
                        println!("  Botnet share: {:.2}%", pct);
                    }
                    println!("  Labeled: {}", info.has_labels.map(on_off).unwrap_or("-"));
                }
            }
            SamplesCommand::Random {
                count,
                unbalanced,
                search,
            } => {
                let batch = client
                    .random_samples(ctx.token(), count, !unbalanced)
                    .await?;
                let rows = batch.search(search.as_deref().unwrap_or(""));

                if json {
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                } else {
                    println!("{} of {} samples", rows.len(), batch.samples.len());
                    for (i, row) in rows.iter().enumerate() {
                        println!("{:>4}. {}", i + 1, serde_json::Value::Object((*row).clone()));
                    }
                }
            }
        },

        Commands::Summary => {
            let result = last_result(&ctx)?;
            let summary = RunSummary::from_result(&result, display_adjust(&config, &result));

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{:<18} {}", "Packets monitored", summary.packets_monitored);
                println!("{:<18} {}", "Botnets detected", summary.botnets_detected);
                match summary.model_accuracy {
                    Some(pct) => println!("{:<18} {:.1}%", "Model accuracy", pct),
                    None => println!("{:<18} -", "Model accuracy"),
                }
            }
        }

        Commands::Metrics => {
            let result = last_result(&ctx)?;
            let metrics = Metrics::from_result(&result);

            if json {
                println!("{}", serde_json::to_string_pretty(&metrics)?);
            } else {
                print_metrics(&metrics, display_adjust(&config, &result));
            }
        }

        Commands::Logs => {
            let result = last_result(&ctx)?;
            let rows = metrics::detection_log(&result);

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!(
                    "{:>5} | {:<10} | {:>10} | {:>11}",
                    "ID", "Prediction", "Confidence", "Probability"
                );
                println!("{}", "-".repeat(46));
                for row in rows {
                    println!(
                        "{:>5} | {:<10} | {:>9}% | {:>10}%",
                        row.id, row.prediction, row.confidence, row.probability
                    );
                }
            }
        }

        Commands::Report { format, dir } => {
            let result = ctx.last_detection();
            let path = export::write_report(result.as_ref(), format, &dir)?;
            println!("Report written to {:?}", path);
        }

        Commands::Settings {
            email_alerts,
            notifications,
        } => {
            if let Some(enabled) = email_alerts {
                ctx.set_email_alerts(enabled)?;
            }
            if let Some(enabled) = notifications {
                ctx.set_notifications(enabled)?;
            }

            let prefs = ctx.preferences();
            println!("Email alerts: {}", on_off(prefs.email_alerts));
            println!("Notifications: {}", on_off(prefs.notifications));
        }

        Commands::Config { output } => {
            write_config(output.as_ref())?;
        }
    }

    Ok(())
}

async fn stream(
    config: &Config,
    client: ApiClient,
    ctx: &SessionContext,
    count: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let source = TokenStream::new(client, ctx.token().map(str::to_string));
    let poller = StreamPoller::new(Arc::new(source), &config.monitor);
    let notifier = notifier(ctx);
    let mut events = poller.subscribe();

    poller.start();
    if !json {
        println!(
            "Streaming one packet every {}ms (Ctrl-C to stop)",
            poller.period().as_millis()
        );
        println!(
            "{:>5} | {:<20} | {:<10} | {:>11} | {:>10}",
            "#", "Time", "Prediction", "Probability", "Confidence"
        );
        println!("{}", "-".repeat(68));
    }

    let mut received = 0u64;
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(StreamEvent::Packet(entry)) => {
                    received += 1;
                    if json {
                        println!("{}", serde_json::to_string(&entry)?);
                    } else {
                        println!(
                            "{:>5} | {:<20} | {:<10} | {:>10.2}% | {:>9.2}%",
                            entry.sequence,
                            entry
                                .packet
                                .observed_at()
                                .map(|t| t.format("%H:%M:%S").to_string())
                                .unwrap_or_else(|| "-".to_string()),
                            entry.packet.label(),
                            entry.packet.probability * 100.0,
                            entry.packet.confidence * 100.0
                        );
                    }
                    if let Some(notice) = Notice::packet(&entry.packet) {
                        notifier.notify(&notice);
                    }
                    if count.is_some_and(|n| received >= n) {
                        poller.stop();
                        break;
                    }
                }
                Ok(StreamEvent::Stopped { reason }) => {
                    bail!("Streaming stopped: {}", reason);
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Stream output fell behind");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                poller.stop();
                break;
            }
        }
    }

    if !json {
        println!();
        println!("Stopped after {} packet(s)", received);
    }
    Ok(())
}

fn read_password(password: Option<String>) -> anyhow::Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn write_config(output: Option<&PathBuf>) -> anyhow::Result<()> {
    let config = generate_default_config();

    match output {
        Some(path) => {
            // Create parent directory if needed
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &config)?;
            println!("Config written to {:?}", path);
        }
        None => {
            print!("{}", config);
        }
    }
    Ok(())
}

fn last_result(ctx: &SessionContext) -> anyhow::Result<DetectionResult> {
    match ctx.last_detection() {
        Some(result) => Ok(result),
        None => bail!("No recent results found. Run `botwatch detect` first."),
    }
}

fn notifier(ctx: &SessionContext) -> PreferenceGate<TerminalNotifier> {
    PreferenceGate::new(TerminalNotifier::stderr(), &ctx.preferences())
}

fn display_adjust(config: &Config, result: &DetectionResult) -> DisplayAdjust {
    DisplayAdjust::new(
        config.display.calibrated_percentages,
        result.sample_count().unwrap_or(0),
    )
}

fn print_detection(result: &DetectionResult, adjust: DisplayAdjust) {
    let summary = &result.summary;

    println!("Model: {}", summary.model_used.as_deref().unwrap_or("-"));
    println!("Samples: {}", opt(result.sample_count()));
    println!("Botnet detected: {}", opt(summary.botnet_detected));
    println!("Normal traffic: {}", opt(summary.normal_detected));
    if let Some(accuracy) = summary.accuracy {
        println!("Accuracy: {:.1}%", adjust.percent(accuracy));
    }
    if let Some(pct) = summary.botnet_percentage {
        println!("Botnet share: {:.1}%", pct);
    }

    if result.predictions.is_empty() {
        return;
    }

    println!();
    println!(
        "{:>5} | {:<10} | {:>11} | {:>10} | {:<6}",
        "#", "Prediction", "Probability", "Confidence", "Actual"
    );
    println!("{}", "-".repeat(54));

    for (i, p) in result.predictions.iter().enumerate() {
        let actual = match p.actual_label {
            Some(1) => "Botnet",
            Some(_) => "Normal",
            None => "-",
        };
        println!(
            "{:>5} | {:<10} | {:>10.2}% | {:>9.2}% | {:<6}",
            i + 1,
            p.label(),
            p.probability * 100.0,
            p.confidence * 100.0,
            actual
        );
    }
}

fn print_monitor_report(report: &MonitorReport) {
    let summary = &report.summary;

    println!("Samples: {}", summary.total_samples);
    println!("Botnet detected: {}", summary.botnet_detected);
    println!("Normal traffic: {}", summary.normal_traffic);
    println!("Alerts sent: {}", summary.alerts_sent);
    println!("Detection rate: {:.1}%", summary.detection_rate);

    if report.detections.is_empty() {
        return;
    }

    println!();
    println!(
        "{:>5} | {:<20} | {:<10} | {:>11} | {:<5}",
        "ID", "Time", "Prediction", "Probability", "Alert"
    );
    println!("{}", "-".repeat(63));

    for d in &report.detections {
        let label = d
            .prediction_label
            .as_deref()
            .unwrap_or(if d.prediction == 1 { "Botnet" } else { "Normal" });
        println!(
            "{:>5} | {:<20} | {:<10} | {:>10.2}% | {:<5}",
            d.sample_id,
            d.timestamp.as_deref().unwrap_or("-"),
            label,
            d.probability * 100.0,
            if d.alert_sent { "yes" } else { "" }
        );
    }
}

fn print_metrics(metrics: &Metrics, adjust: DisplayAdjust) {
    println!("{:<10} {}", "Accuracy", adjust.format_ratio(metrics.accuracy));
    println!("{:<10} {}", "Precision", adjust.format_ratio(metrics.precision));
    println!("{:<10} {}", "Recall", adjust.format_ratio(metrics.recall));
    println!("{:<10} {}", "F1", adjust.format_ratio(metrics.f1));

    match metrics.matrix {
        Some([[tn, fp], [fn_, tp]]) => {
            println!();
            println!("{:<14} | {:>11} | {:>11}", "", "Pred Normal", "Pred Botnet");
            println!("{}", "-".repeat(42));
            println!("{:<14} | {:>11} | {:>11}", "Actual Normal", tn, fp);
            println!("{:<14} | {:>11} | {:>11}", "Actual Botnet", fn_, tp);
        }
        None => {
            println!();
            println!("No ground-truth labels in the last result; confusion matrix unavailable.");
        }
    }
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}
