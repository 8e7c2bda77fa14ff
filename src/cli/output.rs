use colored::Colorize;

/// Print a success message.
pub fn success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print a warning message.
pub fn warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

/// Print an error message. Multi-line messages keep their indentation.
pub fn error(msg: &str) {
    eprintln!("  {} {}", "✗".red(), msg);
}

/// Print a header line.
pub fn header(msg: &str) {
    println!("\n{}", msg.bold());
}

/// Print one indented list item under the previous message.
pub fn item(msg: &str) {
    println!("    • {}", msg.dimmed());
}

/// Turn colored output on or off for the whole process.
pub fn set_colors(enabled: bool) {
    if !enabled {
        colored::control::set_override(false);
    }
}
