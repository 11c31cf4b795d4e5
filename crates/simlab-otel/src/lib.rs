use once_cell::sync::OnceCell;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

static JOURNAL_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

/// Target every activity-log append is mirrored under.
pub const ACTIVITY_TARGET: &str = "simlab::activity";

pub fn init() {
    init_with_default("info");
}

/// Installs the console subscriber on stderr. `RUST_LOG` wins over
/// `default_directive`.
pub fn init_with_default(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let fmt_layer = fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(fmt_layer.with_filter(filter));
    match JournalConfig::from_env() {
        Some(journal) => {
            if std::fs::create_dir_all(&journal.dir).is_err() {
                tracing::warn!(directory = %journal.dir, "failed to create activity journal directory");
            }
            let writer = match journal.rotation {
                Rotation::Hourly => tracing_appender::rolling::hourly(&journal.dir, &journal.prefix),
                Rotation::Minutely => {
                    tracing_appender::rolling::minutely(&journal.dir, &journal.prefix)
                }
                Rotation::Daily => tracing_appender::rolling::daily(&journal.dir, &journal.prefix),
            };
            let (nb, guard) = tracing_appender::non_blocking(writer);
            let _ = JOURNAL_GUARD.set(guard);
            let targets = Targets::new().with_target(ACTIVITY_TARGET, tracing::Level::INFO);
            let journal_layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(nb)
                .with_filter(targets);
            let _ = registry.with(journal_layer).try_init();
        }
        None => {
            let _ = registry.try_init();
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Rotation {
    Minutely,
    Hourly,
    Daily,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct JournalConfig {
    dir: String,
    prefix: String,
    rotation: Rotation,
}

impl JournalConfig {
    fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Option<Self> {
        if get("SIMLAB_LOG_ROLL").as_deref() != Some("1") {
            return None;
        }
        let dir = get("SIMLAB_LOG_DIR").unwrap_or_else(|| "logs".to_string());
        let prefix = get("SIMLAB_LOG_PREFIX").unwrap_or_else(|| "activity".to_string());
        let rotation = match get("SIMLAB_LOG_ROTATION")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "hourly" => Rotation::Hourly,
            "minutely" => Rotation::Minutely,
            _ => Rotation::Daily,
        };
        Some(Self {
            dir,
            prefix,
            rotation,
        })
    }
}
