//! Job log lines
//!
//! Every line the job writes carries the same banner so scheduler logs can be
//! grepped for it. Timestamps come from the tracing subscriber.

use tracing::{error, info};

const BANNER: &str = "== Timed Filters ==";

pub fn write_line(line: &str) {
    if line.is_empty() {
        info!("{}", BANNER);
    } else {
        info!("{} {}", BANNER, line);
    }
}

pub fn log(message: &str) {
    info!("{} LOG: {}", BANNER, message);
}

pub fn error(message: &str) {
    error!("{} ERROR: {}", BANNER, message);
}

pub fn fmt_ms(d: std::time::Duration) -> String {
    let ms = d.as_millis();
    if ms == 0 { "<1ms".into() } else { format!("{}ms", ms) }
}
