use anyhow::{bail, Result};
use rekap::{ConfigFile, CrawlOptions, DataRecap, FileLog, LogSink, RecapOptions, SocialCrawl};
use std::path::PathBuf;

const CONFIG_FILE: &str = "config.toml";
const CRAWL_LOG: &str = "scraper.log";
const RECAP_LOG: &str = "rekap.log";

fn main() -> Result<()> {
    rekap::init_tracing_once();

    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "crawl".to_string());
    let config_path = PathBuf::from(args.next().unwrap_or_else(|| CONFIG_FILE.to_string()));

    match mode.as_str() {
        "crawl" => crawl(config_path),
        "recap" => recap(config_path),
        other => bail!("unknown mode '{other}': use `crawl` or `recap` [config.toml]"),
    }
}

fn crawl(config_path: PathBuf) -> Result<()> {
    let log = FileLog::open(CRAWL_LOG)?;
    let cfg = match ConfigFile::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log.emit(&format!("Error: {:#}", e));
            return Err(e);
        }
    };
    let creds = match cfg.credentials() {
        Ok(c) => c,
        Err(e) => {
            log.emit(&format!("Error: {:#}", e));
            return Err(e);
        }
    };

    let mut opts = CrawlOptions::default();
    let log = match cfg.crawl.as_ref() {
        Some(section) => {
            opts = opts.with_section(section)?;
            match &section.log_file {
                Some(p) => FileLog::open(p)?,
                None => log,
            }
        }
        None => log,
    };

    let summary = SocialCrawl::with_options(opts).run_instagram(&creds, &log)?;
    println!(
        "Processed {} posts, {} with comments, {} rows -> {}",
        summary.examined,
        summary.posts_with_rows,
        summary.rows_written,
        summary.output.display()
    );
    Ok(())
}

fn recap(config_path: PathBuf) -> Result<()> {
    // Credentials are not needed here; a missing file just means built-in defaults.
    let cfg = if config_path.exists() { ConfigFile::load(&config_path)? } else { ConfigFile::default() };

    let mut opts = RecapOptions::default();
    let mut log_path = PathBuf::from(RECAP_LOG);
    if let Some(section) = cfg.recap.as_ref() {
        opts = opts.with_section(section);
        if let Some(p) = &section.log_file {
            log_path = p.clone();
        }
    }
    let log = FileLog::open(&log_path)?;

    let summary = DataRecap::with_options(opts).run_http(&log)?;
    for f in &summary.failed {
        eprintln!("failed: {} ({})", f.url, f.error);
    }
    println!("Data saved to '{}'", summary.output.display());
    Ok(())
}
