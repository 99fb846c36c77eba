use std::time::{Duration, Instant};

use colored::Colorize;

use crate::types;

pub fn print_startup_info(version: &str, databases: &[(String, String)], startup_time: &Instant) {
    println!(
        "\n{} {} {} {} {}\n {}",
        "  modelkit  ".on_purple().black(),
        version.purple(),
        "ready in".dimmed(),
        startup_time.elapsed().as_millis().to_string().bold(),
        "ms".dimmed(),
        "⎪".purple()
    );

    if databases.is_empty() {
        println!(" {} {:10} {}", "⎬".purple(), "Database", "none".dimmed());
    }
    for (name, url) in databases {
        println!(
            " {} {:10} {} {}{}{}",
            "⎬".purple(),
            "Database",
            url.yellow(),
            "[".dimmed(),
            name.cyan(),
            "]".dimmed()
        );
    }
    println!(" {}", "⎪".purple());
    println!(
        " {} {:10} {}",
        "⎬".purple(),
        "Time",
        types::DateTime::now().fmt_to_ms().dimmed()
    );
    println!();
}

pub fn print_ping(database: &str, elapsed: Duration) {
    println!(
        " {} {:10} {} {} {}",
        "⎬".purple(),
        database.cyan(),
        "answered in".dimmed(),
        elapsed.as_millis().to_string().bold(),
        "ms".dimmed()
    );
}

pub fn print_affected(database: &str, affected: u64) {
    println!(
        " {} {:10} {} {}",
        "⎬".purple(),
        database.cyan(),
        affected.to_string().bold(),
        "rows affected".dimmed()
    );
}
