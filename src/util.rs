use std::fs::File;
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(io::stderr).try_init();
    });
}

const CREATE_TRIES: u32 = 10;
const CREATE_BACKOFF: Duration = Duration::from_millis(50);

/// A CSV still open in a spreadsheet shows up on Windows as a sharing or lock violation
/// (5 = access denied, 32 = sharing, 33 = lock); these clear once the other program lets go.
fn held_by_other_process(e: &io::Error) -> bool {
    matches!(e.raw_os_error(), Some(5 | 32 | 33))
}

/// Create (truncate) an output CSV, retrying with growing waits while another program holds it.
/// Any other error is returned at once.
pub fn create_output(path: &Path) -> io::Result<File> {
    let mut attempt = 1;
    loop {
        match File::create(path) {
            Err(e) if attempt < CREATE_TRIES && held_by_other_process(&e) => {
                tracing::debug!(path=%path.display(), attempt, error=%e, "output busy, retrying");
                sleep(CREATE_BACKOFF * attempt);
                attempt += 1;
            }
            other => return other,
        }
    }
}
