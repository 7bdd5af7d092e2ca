use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use sqlx::postgres::PgPoolOptions;
use std::env;
use tracing::{info, Level};
use tracing_subscriber::{
    field::RecordFields,
    fmt::{self, time::ChronoUtc, FormatFields},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use phr_server::{create_app, storage, AppConfig, PhrServer};

/// Personal Health Record HTTP Server
#[derive(Parser, Debug)]
#[command(name = "phr-server")]
#[command(about = "Personal health record API: health logs, medical reports and doctor access")]
struct Args {
    /// Server bind address, overrides HOST
    #[arg(long)]
    host: Option<String>,

    /// Server port, overrides PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// Optional configuration file; environment variables take precedence
    #[arg(short, long, default_value = "phr-server")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Keep all records in process memory instead of Postgres
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(Some(&args.config)).context("failed to load configuration")?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    init_tracing(args.verbose, config.is_development());

    info!("🏥 {}", "Starting Personal Health Record server".bright_cyan());
    info!("📋 Version: {}", env!("CARGO_PKG_VERSION").bright_white());

    let (stores, pool) = match (&config.database_url, args.in_memory) {
        (Some(url), false) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .context("failed to connect to the database")?;
            storage::postgres::MIGRATOR
                .run(&pool)
                .await
                .context("failed to run database migrations")?;
            info!("🗄️  {}", "Database connected and migrated".bright_green());
            (storage::Stores::postgres(pool.clone()), Some(pool))
        }
        _ => {
            tracing::warn!("{}", "Using in-memory stores; records are lost on restart".bright_yellow());
            (storage::Stores::in_memory(), None)
        }
    };

    let bind = format!("{}:{}", config.host, config.port);
    let server = PhrServer::new(config, stores, pool)?;
    if server.seed_admin().await? {
        info!("👤 {}", "Bootstrap admin account created".bright_green());
    }

    let app = create_app(server);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind to {bind}"))?;

    info!("🚀 {}", format!("Server running on http://{bind}").bright_green());
    info!("📋 {}", format!("Health check available at: http://{bind}/health").bright_blue());
    info!("📚 {}", format!("API docs available at: http://{bind}/docs").bright_blue());

    axum::serve(listener, app).await.context("HTTP server error")?;
    Ok(())
}

fn init_tracing(verbose: bool, is_development: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let use_colors = env::var("NO_COLOR").is_err() && atty::is(atty::Stream::Stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("phr_server={level},tower_http=info,sqlx=warn,reqwest=info").into());

    if is_development && use_colors {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .event_format(ColoredFormatter)
                    .fmt_fields(ColoredFieldFormatter),
            )
            .init();

        print_startup_banner();
    } else {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .json(),
            )
            .init();
    }
}

fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                  🏥 PERSONAL HEALTH RECORD                   ║".bright_cyan());
    println!("{}", "║            Health logs · Medical reports · Insights          ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}

// Colored formatter for development
struct ColoredFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ColoredFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();

        write!(writer, "{} ", chrono::Utc::now().format("%H:%M:%S%.3f").to_string().bright_black())?;

        let level_str = match *metadata.level() {
            Level::TRACE => "TRACE".bright_purple(),
            Level::DEBUG => "DEBUG".bright_blue(),
            Level::INFO => " INFO".bright_green(),
            Level::WARN => " WARN".bright_yellow(),
            Level::ERROR => "ERROR".bright_red(),
        };
        write!(writer, "[{level_str}] ")?;

        if let Some(target) = metadata.target().split("::").last() {
            write!(writer, "{:<15} ", target.bright_cyan())?;
        }

        ctx.format_fields(writer.by_ref(), event)?;

        if metadata.level() <= &Level::DEBUG {
            if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
                let file_short = file.rsplit('/').next().unwrap_or(file);
                write!(writer, " {}", format!("({file_short}:{line})").bright_black())?;
            }
        }

        writeln!(writer)
    }
}

struct ColoredFieldFormatter;

impl<'a> tracing_subscriber::fmt::FormatFields<'a> for ColoredFieldFormatter {
    fn format_fields<R: RecordFields>(
        &self,
        writer: tracing_subscriber::fmt::format::Writer<'a>,
        fields: R,
    ) -> std::fmt::Result {
        let mut visitor = ColoredFieldVisitor { writer, result: Ok(()) };
        fields.record(&mut visitor);
        visitor.result
    }
}

struct ColoredFieldVisitor<'a> {
    writer: tracing_subscriber::fmt::format::Writer<'a>,
    result: std::fmt::Result,
}

impl ColoredFieldVisitor<'_> {
    fn write_field(&mut self, name: &str, value: &str) {
        if self.result.is_err() {
            return;
        }
        self.result = if name == "message" {
            write!(self.writer, "{}", value.white().bold())
        } else {
            write!(self.writer, " {}={}", name.bright_yellow(), value.bright_white())
        };
    }
}

impl tracing::field::Visit for ColoredFieldVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.write_field(field.name(), &format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.write_field(field.name(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_colored_formatter_writes_message_and_fields() {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(ColoredFormatter)
            .fmt_fields(ColoredFieldFormatter)
            .with_writer(move || sink.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(report_count = 3, "Summary exported");
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("INFO"));
        assert!(output.contains("Summary exported"));
        assert!(output.contains("report_count"));
        assert!(output.ends_with('\n'));
    }
}
