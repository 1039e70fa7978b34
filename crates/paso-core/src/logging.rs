use std::path::PathBuf;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes structured logging: a human-readable layer on stderr plus a
/// daily-rolling, non-ANSI file layer under `~/.paso/logs/`. Honors
/// `RUST_LOG`, falling back to `info`. Safe to call more than once — a
/// second call is a silent no-op.
pub fn init(service_name: &str) -> anyhow::Result<()> {
    let logs_dir = paso_home().join("logs");
    std::fs::create_dir_all(&logs_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "paso.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    // Leak the guard: logging must outlive every call site in this process.
    std::mem::forget(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init();

    tracing::info!(service = service_name, logs_dir = %logs_dir.display(), "logging initialized");
    Ok(())
}

/// `~/.paso`, created with mode 0700 if it does not yet exist.
pub fn paso_home() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let dir = home.join(".paso");
    if !dir.exists() {
        let _ = std::fs::create_dir_all(&dir);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = std::fs::metadata(&dir) {
                let mut perms = meta.permissions();
                perms.set_mode(0o700);
                let _ = std::fs::set_permissions(&dir, perms);
            }
        }
    }
    dir
}

pub fn socket_path() -> PathBuf {
    paso_home().join("daemon.sock")
}

pub fn db_path() -> PathBuf {
    paso_home().join("paso.db")
}
